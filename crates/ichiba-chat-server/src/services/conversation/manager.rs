// manager.rs
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ChatConfig;
use crate::models::chat::{Card, SessionId, Turn};
use crate::utils::error::ApiError;
use crate::utils::format::{take_chars, truncate_title};

use super::marker::{parse_classification, Classification};
use super::prompts;
use super::store::SessionStore;

/// ===== stream chunk types =====
#[derive(Debug, Clone)]
pub enum ChatStreamChunk {
    /// Reply line, sent before any card
    Reply {
        text: String,
    },
    /// One finished card, in search result order
    Card {
        index: usize,
        card: Card,
    },
    /// The assistant turn exactly as stored
    Done {
        turn: Turn,
        processing_time_ms: u64,
    },
}

/// Trait for the generative-language service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ApiError>;
}

/// Trait for the marketplace search service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProductSearch: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<Vec<SearchItem>, ApiError>;
}

/// Item record from a marketplace search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchItem {
    pub name: String,
    pub price: u64,
    pub caption: String,
    pub image_url: String,   // first medium image, empty if none
    pub affiliate_url: String,
}

pub struct ConversationManager {
    store: SessionStore,
    llm_provider: Arc<dyn LlmProvider>,
    search_provider: Arc<dyn ProductSearch>,
    config: ChatConfig,
}

impl ConversationManager {
    pub fn new(
        store: SessionStore,
        llm_provider: Arc<dyn LlmProvider>,
        search_provider: Arc<dyn ProductSearch>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            llm_provider,
            search_provider,
            config,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Process one submission and return the stored assistant turn.
    pub async fn submit(&self, session_id: &str, message: &str) -> Turn {
        self.process_submission(session_id, message, |_| {}).await
    }

    /// Process one submission on a background task and stream its progress.
    ///
    /// The task runs to completion even if the receiver goes away, so the
    /// history always gets both turns of the submission.
    pub fn handle_message(
        self: Arc<Self>,
        session_id: SessionId,
        message: String,
    ) -> Pin<Box<dyn Stream<Item = ChatStreamChunk> + Send>> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            self.process_submission(&session_id, &message, move |chunk| {
                // Receiver gone means the client disconnected; keep going
                let _ = tx.send(chunk);
            })
            .await;
        });

        Box::pin(async_stream::stream! {
            while let Some(chunk) = rx.recv().await {
                yield chunk;
            }
        })
    }

    /// Replay a session: `(last_topic, turns)`, None if unknown or expired.
    ///
    /// Waits for any running submission on the session, so a replay never
    /// shows a user turn without its reply.
    pub async fn history(&self, session_id: &str) -> Option<(String, Vec<Turn>)> {
        let handle = self.store.get(session_id)?;
        let state = handle.lock().await;
        Some((state.last_topic().to_string(), state.all().to_vec()))
    }

    /// End a session
    pub fn end_session(&self, session_id: &str) -> bool {
        let removed = self.store.remove(session_id);
        if removed {
            info!("Session {} ended", session_id);
        }
        removed
    }

    async fn process_submission<F>(&self, session_id: &str, message: &str, mut on_chunk: F) -> Turn
    where
        F: FnMut(ChatStreamChunk) + Send,
    {
        let start_time = Instant::now();
        let handle = self.store.get_or_create(session_id);
        let mut session = handle.lock().await;

        info!(
            "Chat submission: session={}, message_len={}, history_len={}",
            session_id,
            message.chars().count(),
            session.all().len()
        );

        // User turn goes in before any network call
        session.append(Turn::user(message));

        // === CLASSIFY ===
        let prompt = prompts::classify_prompt(message, session.last_topic());
        debug!("Classify prompt: {}", prompt);

        let classification = match self.llm_provider.generate(&prompt).await {
            Ok(raw) => parse_classification(&raw),
            Err(e) => {
                warn!("Classify call failed, replying with error text: {}", e);
                Classification::Chat(prompts::error_reply(&e))
            }
        };

        // === BRANCH ===
        let turn = match classification {
            Classification::Chat(text) => {
                on_chunk(ChatStreamChunk::Reply { text: text.clone() });
                Turn::assistant(text, Vec::new())
            }
            Classification::Search(keyword) => {
                session.set_last_topic(keyword.clone());

                let items = match self.search_provider.search(&keyword).await {
                    Ok(items) => items,
                    Err(e) => {
                        warn!("Search for {:?} failed, treating as no results: {}", keyword, e);
                        Vec::new()
                    }
                };

                if items.is_empty() {
                    let text = prompts::not_found_reply(&keyword);
                    on_chunk(ChatStreamChunk::Reply { text: text.clone() });
                    Turn::assistant(text, Vec::new())
                } else {
                    let text = prompts::found_reply(&keyword);
                    on_chunk(ChatStreamChunk::Reply { text: text.clone() });

                    let cards = self.build_cards(items, &mut on_chunk).await;
                    Turn::assistant(text, cards)
                }
            }
        };

        session.append(turn.clone());
        // Idle time counts from the end of the submission
        self.store.touch(session_id);

        let processing_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Chat completed: session={}, cards={}, {}ms",
            session_id,
            turn.cards.len(),
            processing_time_ms
        );

        on_chunk(ChatStreamChunk::Done {
            turn: turn.clone(),
            processing_time_ms,
        });

        turn
    }

    /// Generate one comment per item and assemble cards in result order.
    ///
    /// Up to `comment_concurrency` comment calls run at once; `buffered`
    /// yields them in input order regardless of completion order.
    async fn build_cards<F>(&self, items: Vec<SearchItem>, on_chunk: &mut F) -> Vec<Card>
    where
        F: FnMut(ChatStreamChunk) + Send,
    {
        let total = items.len();
        let concurrency = self.config.comment_concurrency.max(1);
        let caption_max = self.config.caption_max_chars;

        let mut comments = stream::iter(items.into_iter().map(|item| {
            let llm = self.llm_provider.clone();
            async move {
                let caption = take_chars(&item.caption, caption_max);
                let prompt = prompts::comment_prompt(&item.name, item.price, &caption);
                let comment = match llm.generate(&prompt).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Comment call failed for {:?}: {}", item.name, e);
                        prompts::error_reply(&e)
                    }
                };
                (item, comment)
            }
        }))
        .buffered(concurrency);

        let mut cards = Vec::with_capacity(total);

        while let Some((item, comment)) = comments.next().await {
            let card = Card {
                title: truncate_title(&item.name, self.config.title_max_chars),
                price: item.price,
                image_url: item.image_url,
                link_url: item.affiliate_url,
                comment,
            };

            debug!("Card {}/{} ready: {}", cards.len() + 1, total, card.title);
            on_chunk(ChatStreamChunk::Card {
                index: cards.len(),
                card: card.clone(),
            });
            cards.push(card);
        }

        cards
    }
}
