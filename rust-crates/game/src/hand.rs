use crate::{
    Result,
    RulesError,
    dice::{
        DICE_PER_PLAYER,
        MAX_FACE,
        UNREVEALED,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// Score given when no die is face up yet.
pub const UNKNOWN_SCORE: u8 = 20;
/// Five sixes.
pub const MAX_SUM: u32 = 30;
/// Five of a kind.
pub const MAX_BONUS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandCategory {
    #[serde(rename = "Unknown")]
    Unknown,
    #[serde(rename = "High Card")]
    HighCard,
    #[serde(rename = "One Pair")]
    OnePair,
    #[serde(rename = "Two Pair")]
    TwoPair,
    #[serde(rename = "Three of a Kind")]
    ThreeOfAKind,
    #[serde(rename = "Full House")]
    FullHouse,
    #[serde(rename = "Four of a Kind")]
    FourOfAKind,
    #[serde(rename = "Five of a Kind")]
    FiveOfAKind,
}

impl HandCategory {
    pub fn label(self) -> &'static str {
        match self {
            HandCategory::Unknown => "Unknown",
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "One Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::FiveOfAKind => "Five of a Kind",
        }
    }

    pub fn bonus(self) -> u32 {
        match self {
            HandCategory::Unknown | HandCategory::HighCard => 0,
            HandCategory::OnePair => 15,
            HandCategory::TwoPair => 30,
            HandCategory::ThreeOfAKind => 45,
            HandCategory::FullHouse => 65,
            HandCategory::FourOfAKind => 75,
            HandCategory::FiveOfAKind => 100,
        }
    }

    // most specific pattern first
    fn from_pattern(max_count: u8, second_count: u8) -> Self {
        match (max_count, second_count) {
            (5, _) => HandCategory::FiveOfAKind,
            (4, _) => HandCategory::FourOfAKind,
            (3, 2) => HandCategory::FullHouse,
            (3, _) => HandCategory::ThreeOfAKind,
            (2, 2) => HandCategory::TwoPair,
            (2, _) => HandCategory::OnePair,
            _ => HandCategory::HighCard,
        }
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    AggressiveBet,
    ModerateBet,
    CallOrFold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandStrength {
    /// Normalized to `0..=100`.
    pub score: u8,
    pub category: HandCategory,
    pub dice_used: usize,
    pub sum: u32,
    pub bonus: u32,
    pub raw_score: u32,
}

impl HandStrength {
    pub fn unknown() -> Self {
        HandStrength {
            score: UNKNOWN_SCORE,
            category: HandCategory::Unknown,
            dice_used: 0,
            sum: 0,
            bonus: 0,
            raw_score: 0,
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        match self.score {
            61.. => Recommendation::AggressiveBet,
            40..=60 => Recommendation::ModerateBet,
            _ => Recommendation::CallOrFold,
        }
    }
}

/// Scores up to five dice. Zeros are unrevealed and ignored.
pub fn evaluate(dice: &[u8]) -> Result<HandStrength> {
    if dice.len() > DICE_PER_PLAYER {
        return Err(RulesError::TooManyDice(dice.len()));
    }
    if let Some(bad) = dice.iter().find(|d| **d > MAX_FACE) {
        return Err(RulesError::InvalidDie(u64::from(*bad)));
    }

    let mut counts = [0u8; MAX_FACE as usize + 1];
    let mut sum = 0u32;
    let mut dice_used = 0usize;
    for face in dice.iter().copied().filter(|d| *d != UNREVEALED) {
        counts[face as usize] += 1;
        sum += u32::from(face);
        dice_used += 1;
    }
    if dice_used == 0 {
        return Ok(HandStrength::unknown());
    }

    let mut frequencies: Vec<u8> = counts.iter().copied().filter(|c| *c > 0).collect();
    frequencies.sort_unstable_by(|a, b| b.cmp(a));
    let max_count = frequencies[0];
    let second_count = frequencies.get(1).copied().unwrap_or(0);

    let category = HandCategory::from_pattern(max_count, second_count);
    let bonus = category.bonus();
    let raw_score = sum + bonus;

    Ok(HandStrength {
        score: normalize(raw_score),
        category,
        dice_used,
        sum,
        bonus,
        raw_score,
    })
}

// round(raw / 130 * 100), halves rounding up, capped at 100
fn normalize(raw_score: u32) -> u8 {
    let max = MAX_SUM + MAX_BONUS;
    let scaled = (raw_score * 200 + max) / (2 * max);
    scaled.min(100) as u8
}
