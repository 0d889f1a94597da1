use crate::{
    Error,
    ErrorCategory,
    chat::ChatTurn,
    dispatcher::JoinReceipt,
    gateway::Probe,
    table::TableView,
};
use dice_poker_game::Action;
use ethers::types::{
    Address,
    H256,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;
use tokio::sync::oneshot;

pub trait DealerApi {
    fn next_request(&mut self) -> impl Future<Output = crate::Result<Request>>;
}

pub type Responder<T> = oneshot::Sender<Result<T, Failure>>;

#[derive(Debug)]
pub enum Request {
    Join(Responder<JoinReceipt>),
    Action(ActionRequest),
    Chat(ChatRequest),
    GameOver(GameOverRequest),
    Table(Responder<TableView>),
    Health(Responder<Probe>),
}

#[derive(Debug)]
pub struct ActionRequest {
    pub player: Address,
    pub history: Vec<ChatTurn>,
    pub respond: Responder<TurnReply>,
}

#[derive(Debug)]
pub struct ChatRequest {
    pub player: Address,
    pub message: String,
    pub history: Vec<ChatTurn>,
    pub respond: Responder<ChatReply>,
}

#[derive(Debug)]
pub struct GameOverRequest {
    pub player: Address,
    pub player_won: bool,
    pub final_pot: Option<String>,
    pub respond: Responder<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    Confirmed,
    NoOp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub message: String,
    pub new_history: Vec<ChatTurn>,
    pub action: Option<Action>,
    pub tx_hash: Option<H256>,
    pub outcome: ReplyOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
    /// Empty when the dealer stays quiet.
    pub message: String,
    pub new_history: Vec<ChatTurn>,
}

/// A failed request as the loop reports it back to the HTTP layer.
#[derive(Debug)]
pub struct Failure {
    pub error: Error,
    pub message: String,
    pub action: Option<Action>,
}

impl Failure {
    pub fn new(error: Error, action: Option<Action>) -> Self {
        Self {
            message: error.category().public_message().to_string(),
            error,
            action,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.error.category()
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Self::new(error, None)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.error)
    }
}
