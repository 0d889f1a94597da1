//! Legal-action checks and the fallback betting heuristic.

use crate::{
    Result,
    RulesError,
    amount::{
        BetAmount,
        MAX_BET_UNITS,
    },
    dice::Dice,
    hand::{
        HandStrength,
        Recommendation,
        evaluate,
    },
    phase::GameState,
    seat::Seat,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// Revealed dice at which a weak hand stops being worth chasing.
pub const FOLD_REVEAL_THRESHOLD: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    BetOrRaise,
    Call,
    Roll,
    Fold,
}

impl ActionKind {
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::BetOrRaise => "bet_or_raise",
            ActionKind::Call => "call",
            ActionKind::Roll => "roll",
            ActionKind::Fold => "fold",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bet_or_raise" => Some(ActionKind::BetOrRaise),
            "call" => Some(ActionKind::Call),
            "roll" => Some(ActionKind::Roll),
            "fold" => Some(ActionKind::Fold),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One contract-mutating move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum Action {
    BetOrRaise(BetAmount),
    Call,
    Roll,
    Fold,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::BetOrRaise(_) => ActionKind::BetOrRaise,
            Action::Call => ActionKind::Call,
            Action::Roll => ActionKind::Roll,
            Action::Fold => ActionKind::Fold,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::BetOrRaise(amount) => write!(f, "bet_or_raise({amount})"),
            other => f.write_str(other.kind().name()),
        }
    }
}

/// What the deciding seat knows when it is asked to move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionContext {
    pub state: GameState,
    pub seat: Option<Seat>,
    pub my_dice: Dice,
    pub opponent_dice: Dice,
    /// Wei still owed to match the current bet this round.
    pub to_call: u128,
}

impl DecisionContext {
    pub fn is_my_turn(&self) -> bool {
        self.state.is_turn_of(self.seat)
    }

    pub fn my_hand(&self) -> Result<HandStrength> {
        evaluate(self.my_dice.revealed(self.state))
    }

    pub fn opponent_hand(&self) -> Result<HandStrength> {
        evaluate(self.opponent_dice.revealed(self.state))
    }

    pub fn legal_actions(&self) -> Vec<ActionKind> {
        if !self.is_my_turn() {
            return Vec::new();
        }
        if self.state.is_roll() {
            return vec![ActionKind::Roll];
        }
        let mut legal = vec![ActionKind::BetOrRaise];
        if self.to_call > 0 {
            legal.push(ActionKind::Call);
        }
        legal.push(ActionKind::Fold);
        legal
    }

    pub fn check(&self, action: &Action) -> Result<()> {
        let kind = action.kind();
        if !self.is_my_turn() {
            return Err(illegal(kind, format!("not this seat's turn in {}", self.state)));
        }
        if self.state.is_roll() && kind != ActionKind::Roll {
            return Err(illegal(kind, format!("{} only allows rolling", self.state)));
        }
        if self.state.is_betting() && kind == ActionKind::Roll {
            return Err(illegal(kind, format!("{} is a betting phase", self.state)));
        }
        if kind == ActionKind::Call && self.to_call == 0 {
            return Err(illegal(kind, "nothing to call".to_string()));
        }
        Ok(())
    }
}

fn illegal(kind: ActionKind, reason: String) -> RulesError {
    RulesError::IllegalAction {
        action: kind.name(),
        reason,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub action: Action,
    pub hand: HandStrength,
    pub rationale: &'static str,
}

/// Default move for the current turn. Rolling is never optional.
pub fn suggest(ctx: &DecisionContext) -> Result<Suggestion> {
    let hand = ctx.my_hand()?;
    if !ctx.is_my_turn() {
        return Err(illegal(
            ActionKind::Roll,
            format!("not this seat's turn in {}", ctx.state),
        ));
    }
    if ctx.state.is_roll() {
        return Ok(Suggestion {
            action: Action::Roll,
            hand,
            rationale: "roll phases require a roll",
        });
    }

    let (action, rationale) = match hand.recommendation() {
        Recommendation::AggressiveBet => (
            Action::BetOrRaise(aggressive_amount(hand.score)),
            "strong hand, pressing the bet",
        ),
        Recommendation::ModerateBet => (
            Action::BetOrRaise(moderate_amount(hand.score)),
            "playable hand, keeping the bet moderate",
        ),
        Recommendation::CallOrFold => {
            let revealed = ctx.state.revealed_dice_count();
            let opponent = ctx.opponent_hand()?;
            if revealed >= FOLD_REVEAL_THRESHOLD && opponent.score > hand.score {
                (Action::Fold, "weak hand and the visible dice say it is lost")
            } else if ctx.to_call > 0 {
                (Action::Call, "weak hand, staying in cheaply")
            } else {
                (
                    Action::BetOrRaise(BetAmount::MIN),
                    "weak hand with nothing to call, minimum bet",
                )
            }
        }
    };
    Ok(Suggestion {
        action,
        hand,
        rationale,
    })
}

// 61 -> 75 units, 100 -> 100 units
fn aggressive_amount(score: u8) -> BetAmount {
    let over = u64::from(score.saturating_sub(61));
    BetAmount::clamped_units(75 + over * (MAX_BET_UNITS - 75) / 39)
}

// 40 -> 10 units, 60 -> 30 units
fn moderate_amount(score: u8) -> BetAmount {
    let over = u64::from(score.saturating_sub(40));
    BetAmount::clamped_units(10 + over)
}
