use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Human,
    Ai,
}

/// One line of table talk, oldest first in a history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
        }
    }
}

/// Prompt appended for the dealer's own turn.
pub const TURN_PROMPT: &str = "Your move, Dealer.";

/// The history a client should keep after the dealer has moved.
pub fn extend_history(history: &[ChatTurn], reply: &str) -> Vec<ChatTurn> {
    let mut out = history.to_vec();
    out.push(ChatTurn::human(TURN_PROMPT));
    out.push(ChatTurn::ai(reply));
    out
}
