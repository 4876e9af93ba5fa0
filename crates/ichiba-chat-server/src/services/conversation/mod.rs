//! Conversation orchestration
//!
//! Provides the per-submission chat flow with:
//! - Keyword-decision classification (search marker parsing)
//! - Marketplace search and per-item comment generation
//! - Per-session append-only history (DashMap + per-session mutex)

pub mod manager;
pub mod marker;
pub mod prompts;
mod store;
pub mod types;

pub use manager::{ChatStreamChunk, ConversationManager, LlmProvider, ProductSearch, SearchItem};
pub use marker::{parse_classification, Classification};
pub use store::{SessionHandle, SessionStore};
pub use types::SessionState;

// Re-export common types for convenience
pub use crate::models::chat::{Card, SessionId, Turn};
