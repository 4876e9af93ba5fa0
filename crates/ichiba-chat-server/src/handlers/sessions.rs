use crate::models::chat::{HistoryResponse, TurnView};
use crate::services::conversation::ConversationManager;
use crate::utils::error::ApiError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

/// Replay the stored turns of a session. Cards come back exactly as stored.
///
/// A replay issued while a submission runs on the same session answers once
/// that submission has stored its reply.
pub async fn history_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (last_topic, turns) = manager
        .history(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {}", session_id)))?;

    Ok(Json(HistoryResponse {
        session_id,
        last_topic,
        turns: turns.iter().map(TurnView::from).collect(),
    }))
}

pub async fn end_session_handler(
    State(manager): State<Arc<ConversationManager>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if manager.end_session(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session {}", session_id)))
    }
}
