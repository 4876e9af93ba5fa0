use crate::models::chat::*;
use crate::services::conversation::{ChatStreamChunk, ConversationManager};
use crate::utils::error::ApiError;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

fn resolve_session(request: &ChatRequest) -> Result<String, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    Ok(request
        .session_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()))
}

pub async fn chat_handler(
    State(manager): State<Arc<ConversationManager>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session_id = resolve_session(&request)?;

    info!(
        "Chat request: session={}, message_len={}",
        session_id,
        request.message.chars().count()
    );

    let turn = manager.submit(&session_id, &request.message).await;

    Ok(Json(ChatResponse {
        session_id,
        turn: TurnView::from(&turn),
    }))
}

pub async fn chat_stream_handler(
    State(manager): State<Arc<ConversationManager>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session_id = resolve_session(&request)?;

    info!(
        "Chat stream request: session={}, message_len={}",
        session_id,
        request.message.chars().count()
    );

    let session_id_clone = session_id.clone();
    let mut chunks = manager.handle_message(session_id, request.message);

    // Create SSE stream
    let stream = async_stream::stream! {
        // ===== EVENT 1: Session Info =====
        yield Ok(create_sse_event("session", &SessionInfo {
            session_id: session_id_clone.clone(),
            timestamp: chrono::Utc::now(),
        }));

        // ===== EVENT 2..: Reply line, then one event per card =====
        while let Some(chunk) = chunks.next().await {
            match chunk {
                ChatStreamChunk::Reply { text } => {
                    yield Ok(create_sse_event("reply", &ReplyInfo { text }));
                }
                ChatStreamChunk::Card { index, card } => {
                    yield Ok(create_sse_event("card", &CardInfo {
                        index,
                        card: CardView::from(&card),
                    }));
                }
                ChatStreamChunk::Done { turn, processing_time_ms } => {
                    yield Ok(create_sse_event("done", &CompletionInfo {
                        session_id: session_id_clone.clone(),
                        cards_count: turn.cards.len(),
                        processing_time_ms,
                    }));
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// Helper: Create SSE event
fn create_sse_event<T: serde::Serialize>(event_type: &str, data: &T) -> Event {
    Event::default()
        .event(event_type)
        .data(serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string()))
}
