use crate::models::chat::Turn;

use super::prompts::NO_TOPIC;

/// Conversation state of one session
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Append-only chat history, oldest first
    history: Vec<Turn>,

    /// Most recently resolved search keyword
    last_topic: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Create new conversation session
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            last_topic: NO_TOPIC.to_string(),
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    pub fn all(&self) -> &[Turn] {
        &self.history
    }

    /// Overwrites the previous topic
    pub fn set_last_topic(&mut self, keyword: impl Into<String>) {
        self.last_topic = keyword.into();
    }

    pub fn last_topic(&self) -> &str {
        &self.last_topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::{Card, Role};

    #[test]
    fn test_new_session_defaults() {
        let state = SessionState::new();
        assert!(state.all().is_empty());
        assert_eq!(state.last_topic(), "なし");
    }

    #[test]
    fn test_append_keeps_order() {
        let mut state = SessionState::new();
        state.append(Turn::user("電気シェーバーが欲しい"));
        state.append(Turn::assistant("「電気シェーバー」は見つかりませんでした💦", vec![]));
        state.append(Turn::user("じゃあ加湿器"));

        let roles: Vec<Role> = state.all().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(state.all()[2].text, "じゃあ加湿器");
    }

    #[test]
    fn test_last_topic_is_overwritten() {
        let mut state = SessionState::new();
        state.set_last_topic("電気シェーバー");
        state.set_last_topic("加湿器");
        assert_eq!(state.last_topic(), "加湿器");
    }

    #[test]
    fn test_stored_cards_are_returned_unchanged() {
        let card = Card {
            title: "シェーバー...".to_string(),
            price: 12800,
            image_url: "https://img/1".to_string(),
            link_url: "https://link/1".to_string(),
            comment: "深剃りできる一台".to_string(),
        };
        let mut state = SessionState::new();
        state.append(Turn::assistant("picks", vec![card.clone()]));

        assert_eq!(state.all()[0].cards, vec![card]);
    }
}
