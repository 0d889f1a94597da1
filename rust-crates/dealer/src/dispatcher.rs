//! One dealer turn, start to finish.
//!
//! A turn walks the stages in [`TurnStage`] order and submits at most one
//! transaction. When the table says it is not the dealer's turn nothing is
//! written at all.

use crate::{
    Error,
    Result,
    banter,
    chat::ChatTurn,
    faucet::Faucet,
    gateway::{
        ContractCall,
        ContractGateway,
        DEFAULT_CONFIRMATION_TIMEOUT,
    },
    intel::{
        self,
        OpponentIntel,
    },
    llm::{
        AdviceRequest,
        Advisor,
    },
    table::{
        TableSnapshot,
        read_table,
    },
    tracker::ResponseTracker,
};
use dice_poker_game::{
    Action,
    GameState,
    Seat,
    amount::{
        WEI_PER_UNIT,
        format_units,
    },
    policy::suggest,
};
use ethers::types::{
    Address,
    H256,
};
use serde::Serialize;
use std::{
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};

/// Minimum balance to take a seat, 0.1 native units.
pub const JOIN_MIN_BALANCE: u128 = WEI_PER_UNIT / 10;
/// Below this the dealer asks the faucet for a top-up during play.
pub const LOW_BALANCE_WARNING: u128 = WEI_PER_UNIT;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    AwaitingDecision,
    CheckingBalance,
    RequestingFunds,
    GatheringContext,
    ChoosingAction,
    Submitting,
    Confirmed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Heuristic,
    Advisor,
}

#[derive(Debug)]
pub enum TurnOutcome {
    /// Not the dealer's move; nothing was submitted.
    NoOp { state: GameState, seat: Option<Seat> },
    Confirmed {
        action: Action,
        tx_hash: H256,
        source: DecisionSource,
    },
    Failed {
        stage: TurnStage,
        action: Option<Action>,
        error: Error,
    },
}

#[derive(Debug)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    /// Human-readable line for the chat, never empty.
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinReceipt {
    pub tx_hash: H256,
    pub agent: Address,
    pub seat: Seat,
    pub state: GameState,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct DispatchSettings {
    pub confirmation_timeout: Duration,
    pub currency: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            currency: "FLOW".to_string(),
        }
    }
}

pub struct Dispatcher<G, A> {
    gateway: G,
    advisor: A,
    tracker: Arc<dyn ResponseTracker>,
    faucet: Option<Faucet>,
    settings: DispatchSettings,
}

impl<G, A> Dispatcher<G, A> {
    pub fn new(
        gateway: G,
        advisor: A,
        tracker: Arc<dyn ResponseTracker>,
        faucet: Option<Faucet>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            gateway,
            advisor,
            tracker,
            faucet,
            settings,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn tracker(&self) -> &Arc<dyn ResponseTracker> {
        &self.tracker
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }
}

struct Chosen {
    action: Action,
    source: DecisionSource,
    comment: Option<String>,
    to_call: u128,
    hand_comment: &'static str,
}

impl<G: ContractGateway, A: Advisor> Dispatcher<G, A> {
    /// Plays the dealer's turn if it has one. `player` keys the commentary
    /// throttle.
    pub async fn take_turn(&self, player: &str, history: &[ChatTurn]) -> TurnReport {
        let agent = self.gateway.agent_address();

        let table = match read_table(&self.gateway).await {
            Ok(table) => table,
            Err(error) => return failed(TurnStage::AwaitingDecision, None, error),
        };
        let seat = table.seat_of(agent);
        if !table.state.is_turn_of(seat) {
            tracing::debug!(state = %table.state, ?seat, "not the dealer's turn");
            return TurnReport {
                message: format!("Waiting: {} is not the Dealer's move.", table.state),
                outcome: TurnOutcome::NoOp {
                    state: table.state,
                    seat,
                },
            };
        }

        if let Err(error) = self.check_balance(agent).await {
            return failed(TurnStage::CheckingBalance, None, error);
        }

        let chosen = match self.choose(&table, seat, history).await {
            Ok(chosen) => chosen,
            Err((stage, error)) => return failed(stage, None, error),
        };

        let call = ContractCall::for_action(chosen.action, chosen.to_call);
        tracing::info!(
            action = %chosen.action,
            source = ?chosen.source,
            state = %table.state,
            "dealer decided"
        );
        let tx_hash = match self.gateway.submit(call).await {
            Ok(tx_hash) => tx_hash,
            Err(error) => return failed(TurnStage::Submitting, Some(chosen.action), error),
        };
        if let Err(error) = self
            .gateway
            .await_confirmation(tx_hash, self.settings.confirmation_timeout)
            .await
        {
            return failed(TurnStage::Submitting, Some(chosen.action), error);
        }

        let mut message = banter::action_summary(chosen.action, &self.settings.currency);
        if self.tracker.try_acquire(player, Instant::now()) {
            let flavor = chosen
                .comment
                .unwrap_or_else(|| chosen.hand_comment.to_string());
            message.push(' ');
            message.push_str(&flavor);
        }
        TurnReport {
            message,
            outcome: TurnOutcome::Confirmed {
                action: chosen.action,
                tx_hash,
                source: chosen.source,
            },
        }
    }

    async fn check_balance(&self, agent: Address) -> Result<()> {
        let balance = self.gateway.balance_of(agent).await?;
        if balance >= LOW_BALANCE_WARNING {
            return Ok(());
        }
        tracing::warn!(balance = %format_units(balance), "dealer balance is low");
        if let Some(faucet) = &self.faucet {
            tracing::info!(stage = ?TurnStage::RequestingFunds, "asking the faucet for a top-up");
            // a failed top-up never blocks the move
            if let Err(err) = faucet.request_funds(agent).await {
                tracing::warn!("faucet top-up failed: {err}");
            }
        }
        Ok(())
    }

    async fn choose(
        &self,
        table: &TableSnapshot,
        seat: Option<Seat>,
        history: &[ChatTurn],
    ) -> std::result::Result<Chosen, (TurnStage, Error)> {
        let gathering = |error: Error| (TurnStage::GatheringContext, error);
        let choosing = |error: Error| (TurnStage::ChoosingAction, error);

        let agent = self.gateway.agent_address();
        let round_bet = self
            .gateway
            .read_round_bet(agent)
            .await
            .map_err(gathering)?;
        let ctx = table.decision_context(seat, round_bet);
        let suggestion = suggest(&ctx).map_err(|e| choosing(e.into()))?;
        let opponent_hand = ctx.opponent_hand().map_err(|e| gathering(e.into()))?;
        let intel = self.opponent_intel(table, seat).await;

        let request = AdviceRequest {
            state: table.state,
            hand: suggestion.hand,
            opponent_hand,
            to_call: ctx.to_call,
            currency: self.settings.currency.clone(),
            legal: ctx.legal_actions(),
            suggestion: suggestion.action,
            history: history.to_vec(),
            intel,
        };
        let (action, source, comment) = match self.advisor.advise(&request).await {
            Ok(advice) => match ctx.check(&advice.action) {
                Ok(()) => (advice.action, DecisionSource::Advisor, advice.comment),
                Err(err) => {
                    tracing::warn!(
                        advised = %advice.action,
                        "advisor picked an illegal move, using heuristic: {err}"
                    );
                    (suggestion.action, DecisionSource::Heuristic, None)
                }
            },
            Err(err) => {
                tracing::warn!("advisor unavailable, using heuristic: {err}");
                (suggestion.action, DecisionSource::Heuristic, None)
            }
        };
        ctx.check(&action).map_err(|e| choosing(e.into()))?;

        Ok(Chosen {
            action,
            source,
            comment,
            to_call: ctx.to_call,
            hand_comment: banter::hand_comment(suggestion.hand.category),
        })
    }

    async fn opponent_intel(&self, table: &TableSnapshot, seat: Option<Seat>) -> Option<OpponentIntel> {
        let opponent = table.player(seat?.opponent())?;
        match intel::gather(&self.gateway, opponent).await {
            Ok(intel) => Some(intel),
            Err(err) => {
                tracing::debug!("skipping opponent intel: {err}");
                None
            }
        }
    }

    /// Takes the open seat at a table with one human waiting.
    pub async fn join_table(&self) -> Result<JoinReceipt> {
        let agent = self.gateway.agent_address();
        let state = self.gateway.read_state().await?;
        if state != GameState::JOINING {
            return Err(Error::TurnLegality(format!(
                "game already in progress ({state})"
            )));
        }
        let players = self.gateway.read_players().await?;
        if players.contains(&Some(agent)) {
            return Err(Error::TurnLegality("the Dealer is already seated".to_string()));
        }
        if players.iter().all(Option::is_some) {
            return Err(Error::TurnLegality("the table is full".to_string()));
        }
        if players.iter().all(Option::is_none) {
            return Err(Error::TurnLegality(
                "no player is waiting at the table".to_string(),
            ));
        }

        let balance = self.gateway.balance_of(agent).await?;
        if balance < JOIN_MIN_BALANCE {
            if let Some(faucet) = &self.faucet {
                if let Err(err) = faucet.request_funds(agent).await {
                    tracing::warn!("faucet top-up failed: {err}");
                }
            }
            return Err(Error::Configuration(format!(
                "Dealer balance {} {} is below the {} needed to join",
                format_units(balance),
                self.settings.currency,
                format_units(JOIN_MIN_BALANCE)
            )));
        }

        let tx_hash = self.gateway.submit(ContractCall::JoinGame).await?;
        self.gateway
            .await_confirmation(tx_hash, self.settings.confirmation_timeout)
            .await?;

        let players = self.gateway.read_players().await?;
        let seat = dice_poker_game::seat::seat_of(&players, &agent).ok_or_else(|| {
            Error::Revert {
                message: "join confirmed but the Dealer is not seated".to_string(),
                tx_hash: Some(tx_hash),
            }
        })?;
        let state = self.gateway.read_state().await?;
        tracing::info!(%seat, %state, tx_hash = %format!("{tx_hash:#x}"), "dealer joined the table");
        Ok(JoinReceipt {
            tx_hash,
            agent,
            seat,
            state,
            message: banter::join_line(&mut rand::rng()),
        })
    }
}

fn failed(stage: TurnStage, action: Option<Action>, error: Error) -> TurnReport {
    tracing::warn!(?stage, action = ?action, category = %error.category(), "dealer turn failed: {error}");
    let message = error.category().public_message();
    TurnReport {
        message: message.to_string(),
        outcome: TurnOutcome::Failed {
            stage,
            action,
            error,
        },
    }
}

#[cfg(test)]
mod tests;
