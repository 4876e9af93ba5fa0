use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::utils::format::format_price;

pub type SessionId = String;

// ===== CONVERSATION MODELS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One product card, built once from a search result and never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,   // first 30 chars + "..."
    pub price: u64,
    pub image_url: String,
    pub link_url: String,
    pub comment: String, // AI-generated blurb
}

impl Card {
    pub fn price_label(&self) -> String {
        format_price(self.price)
    }
}

/// One chat message. Cards are only ever attached to assistant turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub cards: Vec<Card>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            cards: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, cards: Vec<Card>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            cards,
            created_at: Utc::now(),
        }
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct CardView {
    pub title: String,
    pub price: u64,
    pub price_label: String,  // ¥12,800
    pub image_url: String,
    pub link_url: String,
    pub comment: String,
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        Self {
            title: card.title.clone(),
            price: card.price,
            price_label: card.price_label(),
            image_url: card.image_url.clone(),
            link_url: card.link_url.clone(),
            comment: card.comment.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TurnView {
    pub role: Role,
    pub text: String,
    pub cards: Vec<CardView>,
    pub created_at: DateTime<Utc>,
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            text: turn.text.clone(),
            cards: turn.cards.iter().map(CardView::from).collect(),
            created_at: turn.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub turn: TurnView,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub last_topic: String,
    pub turns: Vec<TurnView>,
}

// ===== RESPONSE EVENT MODELS (SSE) =====

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReplyInfo {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CardInfo {
    pub index: usize,
    pub card: CardView,
}

#[derive(Debug, Serialize)]
pub struct CompletionInfo {
    pub session_id: String,
    pub cards_count: usize,
    pub processing_time_ms: u64,
}
