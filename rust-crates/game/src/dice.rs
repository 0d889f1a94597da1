use crate::{
    Result,
    RulesError,
    phase::GameState,
};
use serde::{
    Deserialize,
    Serialize,
};

pub const DICE_PER_PLAYER: usize = 5;
pub const UNREVEALED: u8 = 0;
pub const MAX_FACE: u8 = 6;

/// The five dice of one seat as the contract stores them, 0 meaning not rolled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u8>")]
pub struct Dice([u8; DICE_PER_PLAYER]);

impl Dice {
    pub fn new(values: [u8; DICE_PER_PLAYER]) -> Result<Self> {
        if let Some(bad) = values.iter().find(|v| **v > MAX_FACE) {
            return Err(RulesError::InvalidDie(u64::from(*bad)));
        }
        Ok(Dice(values))
    }

    pub fn from_raw(values: &[u64]) -> Result<Self> {
        if values.len() > DICE_PER_PLAYER {
            return Err(RulesError::TooManyDice(values.len()));
        }
        let mut out = [UNREVEALED; DICE_PER_PLAYER];
        for (slot, value) in out.iter_mut().zip(values) {
            if *value > u64::from(MAX_FACE) {
                return Err(RulesError::InvalidDie(*value));
            }
            *slot = *value as u8;
        }
        Ok(Dice(out))
    }

    pub fn values(&self) -> [u8; DICE_PER_PLAYER] {
        self.0
    }

    /// Dice the opponent is allowed to see in `state`; the rest read as 0.
    pub fn masked(&self, state: GameState) -> Dice {
        let shown = state.revealed_dice_count();
        let mut out = self.0;
        for value in out.iter_mut().skip(shown) {
            *value = UNREVEALED;
        }
        Dice(out)
    }

    pub fn revealed(&self, state: GameState) -> &[u8] {
        &self.0[..state.revealed_dice_count()]
    }

    pub fn sum(&self) -> u32 {
        self.0.iter().map(|v| u32::from(*v)).sum()
    }
}

impl TryFrom<Vec<u64>> for Dice {
    type Error = RulesError;

    fn try_from(values: Vec<u64>) -> Result<Self> {
        Dice::from_raw(&values)
    }
}

impl From<Dice> for Vec<u8> {
    fn from(dice: Dice) -> Self {
        dice.0.to_vec()
    }
}
