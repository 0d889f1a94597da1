//! Rules of the two-seat dice poker table as seen from off-chain code.
//!
//! The contract owns the game. Everything here only interprets the values it
//! exposes: which phase a state code is, whose turn it is, how many dice are
//! face up, how strong a partial hand looks, and which actions are legal.

pub mod amount;
pub mod dice;
pub mod hand;
pub mod phase;
pub mod policy;
pub mod seat;

pub use amount::BetAmount;
pub use dice::Dice;
pub use hand::{
    HandCategory,
    HandStrength,
    Recommendation,
    evaluate,
};
pub use phase::{
    GameState,
    Phase,
};
pub use policy::{
    Action,
    ActionKind,
    DecisionContext,
    Suggestion,
};
pub use seat::Seat;

pub type Result<T, E = RulesError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("unknown game state {0}")]
    UnknownState(u64),
    #[error("invalid die value {0}, expected 0..=6")]
    InvalidDie(u64),
    #[error("a hand holds at most 5 dice, got {0}")]
    TooManyDice(usize),
    #[error("invalid bet amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: &'static str },
    #[error("{action} is not allowed: {reason}")]
    IllegalAction {
        action: &'static str,
        reason: String,
    },
}
