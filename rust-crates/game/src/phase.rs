use crate::{
    Result,
    RulesError,
    seat::Seat,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

pub const STATE_COUNT: u8 = 28;

const PHASE_NAMES: [&str; STATE_COUNT as usize] = [
    "Joining",
    "Player1Bet1",
    "Player2BetOrCall1",
    "Player1RaiseOrCall1",
    "Player2RaiseOrCall1",
    "Player1Roll1",
    "Player2Roll1",
    "Player1Bet2",
    "Player2BetOrCall2",
    "Player1RaiseOrCall2",
    "Player2RaiseOrCall2",
    "Player1Roll2",
    "Player2Roll2",
    "Player1Bet3",
    "Player2BetOrCall3",
    "Player1RaiseOrCall3",
    "Player2RaiseOrCall3",
    "Player1Roll3",
    "Player2Roll3",
    "Player1Bet4",
    "Player2BetOrCall4",
    "Player1RaiseOrCall4",
    "Player2RaiseOrCall4",
    "Player1RollLast",
    "Player2RollLast",
    "DetermineWinner",
    "Tie",
    "GameEnded",
];

const BETTING_STATES: [u8; 16] = [1, 2, 3, 4, 7, 8, 9, 10, 13, 14, 15, 16, 19, 20, 21, 22];

// (first seat, second seat) per round
const ROLL_STATES: [(u8, u8); 4] = [(5, 6), (11, 12), (17, 18), (23, 24)];

/// Coarse classification of a state code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Joining,
    Betting,
    Rolling,
    DetermineWinner,
    Tie,
    Ended,
}

/// A validated contract state code in `0..28`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u8")]
pub struct GameState(u8);

impl GameState {
    pub const JOINING: GameState = GameState(0);
    pub const DETERMINE_WINNER: GameState = GameState(25);
    pub const TIE: GameState = GameState(26);
    pub const GAME_ENDED: GameState = GameState(27);

    /// Rejects codes the resolver does not know. A new code usually means the
    /// contract and the bindings disagree, so it is never mapped to a default.
    pub fn new(code: u64) -> Result<Self> {
        if code < u64::from(STATE_COUNT) {
            Ok(GameState(code as u8))
        } else {
            Err(RulesError::UnknownState(code))
        }
    }

    pub fn all() -> impl Iterator<Item = GameState> {
        (0..STATE_COUNT).map(GameState)
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        PHASE_NAMES[self.0 as usize]
    }

    pub fn revealed_dice_count(self) -> usize {
        match self.0 {
            0..=4 => 0,
            5..=10 => 1,
            11..=16 => 2,
            17..=22 => 3,
            _ => 5,
        }
    }

    pub fn is_betting(self) -> bool {
        BETTING_STATES.contains(&self.0)
    }

    pub fn is_roll(self) -> bool {
        ROLL_STATES
            .iter()
            .any(|(first, second)| self.0 == *first || self.0 == *second)
    }

    pub fn turn_owner(self) -> Option<Seat> {
        if self.is_betting() {
            return if self.0 % 2 == 1 {
                Some(Seat::First)
            } else {
                Some(Seat::Second)
            };
        }
        ROLL_STATES.iter().find_map(|(first, second)| {
            if self.0 == *first {
                Some(Seat::First)
            } else if self.0 == *second {
                Some(Seat::Second)
            } else {
                None
            }
        })
    }

    /// An unknown seat is never anyone's turn.
    pub fn is_turn_of(self, seat: Option<Seat>) -> bool {
        match (seat, self.turn_owner()) {
            (Some(seat), Some(owner)) => seat == owner,
            _ => false,
        }
    }

    /// Betting round `1..=4`, `None` while joining or settling.
    pub fn round(self) -> Option<u8> {
        match self.0 {
            1..=24 => Some((self.0 - 1) / 6 + 1),
            _ => None,
        }
    }

    pub fn phase(self) -> Phase {
        match self.0 {
            0 => Phase::Joining,
            25 => Phase::DetermineWinner,
            26 => Phase::Tie,
            27 => Phase::Ended,
            _ if self.is_roll() => Phase::Rolling,
            _ => Phase::Betting,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self.phase(), Phase::Tie | Phase::Ended)
    }
}

impl TryFrom<u64> for GameState {
    type Error = RulesError;

    fn try_from(code: u64) -> Result<Self> {
        GameState::new(code)
    }
}

impl From<GameState> for u8 {
    fn from(state: GameState) -> Self {
        state.0
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

pub fn phase_name(code: u64) -> Result<&'static str> {
    GameState::new(code).map(GameState::name)
}
