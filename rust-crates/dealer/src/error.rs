use dice_poker_game::RulesError;
use ethers::types::H256;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    time::Duration,
};

/// Coarse class of a failure, reported to API callers next to the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    TurnLegality,
    Validation,
    Transient,
    Revert,
    Timeout,
    Llm,
}

impl ErrorCategory {
    pub fn name(self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::TurnLegality => "turn_legality",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Transient => "transient",
            ErrorCategory::Revert => "revert",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Llm => "llm",
        }
    }

    /// Player-facing wording, independent of the technical error text.
    pub fn public_message(self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "The Dealer is not configured to play right now.",
            ErrorCategory::TurnLegality => "That move is not allowed right now.",
            ErrorCategory::Validation => "The request or the table data did not make sense.",
            ErrorCategory::Transient => "The network stumbled. Try again in a moment.",
            ErrorCategory::Revert => "The table rejected the Dealer's move.",
            ErrorCategory::Timeout => {
                "The Dealer's move is still pending. Check the table before retrying."
            }
            ErrorCategory::Llm => "The Dealer lost its train of thought.",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a failed write may still land on chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    NotSent,
    Unknown,
    Mined,
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionOutcome::NotSent => "not_sent",
            SubmissionOutcome::Unknown => "unknown",
            SubmissionOutcome::Mined => "mined",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{0}")]
    TurnLegality(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error("rpc failure ({outcome}): {message}")]
    Transient {
        message: String,
        outcome: SubmissionOutcome,
    },
    #[error("transaction reverted: {message}")]
    Revert {
        message: String,
        tx_hash: Option<H256>,
    },
    #[error("no confirmation for {tx_hash:#x} within {waited:?}")]
    Timeout { tx_hash: H256, waited: Duration },
    #[error("advisor failed: {0}")]
    Llm(String),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration(_) => ErrorCategory::Configuration,
            Error::TurnLegality(_) | Error::Rules(RulesError::IllegalAction { .. }) => {
                ErrorCategory::TurnLegality
            }
            Error::Validation(_) | Error::Rules(_) => ErrorCategory::Validation,
            Error::Transient { .. } => ErrorCategory::Transient,
            Error::Revert { .. } => ErrorCategory::Revert,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::Llm(_) => ErrorCategory::Llm,
        }
    }

    /// `None` for failures that never got near a write.
    pub fn submission_outcome(&self) -> Option<SubmissionOutcome> {
        match self {
            Error::Transient { outcome, .. } => Some(*outcome),
            Error::Revert {
                tx_hash: Some(_), ..
            } => Some(SubmissionOutcome::Mined),
            Error::Revert { tx_hash: None, .. } => Some(SubmissionOutcome::NotSent),
            Error::Timeout { .. } => Some(SubmissionOutcome::Unknown),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }

    pub fn transient(message: impl fmt::Display) -> Self {
        Error::Transient {
            message: message.to_string(),
            outcome: SubmissionOutcome::NotSent,
        }
    }

    pub fn missing(what: &str) -> Self {
        Error::Configuration(format!("{what} is not set"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn category__illegal_rules_action_is_turn_legality() {
        let err = Error::from(RulesError::IllegalAction {
            action: "roll",
            reason: "betting phase".to_string(),
        });
        assert_eq!(err.category(), ErrorCategory::TurnLegality);
        assert_eq!(
            Error::from(RulesError::UnknownState(99)).category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn submission_outcome__only_for_write_failures() {
        assert_eq!(Error::missing("RPC_URL").submission_outcome(), None);
        assert_eq!(
            Error::Timeout {
                tx_hash: H256::zero(),
                waited: Duration::from_secs(45),
            }
            .submission_outcome(),
            Some(SubmissionOutcome::Unknown)
        );
        assert_eq!(
            Error::Revert {
                message: "execution reverted".to_string(),
                tx_hash: Some(H256::zero()),
            }
            .submission_outcome(),
            Some(SubmissionOutcome::Mined)
        );
    }

    #[test]
    fn category__serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCategory::TurnLegality).unwrap();
        assert_eq!(json, "\"turn_legality\"");
    }
}
