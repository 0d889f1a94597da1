use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// One of the two player positions at the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "usize", try_from = "usize")]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Seat> {
        match index {
            0 => Some(Seat::First),
            1 => Some(Seat::Second),
            _ => None,
        }
    }

    pub fn opponent(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

impl From<Seat> for usize {
    fn from(seat: Seat) -> Self {
        seat.index()
    }
}

impl TryFrom<usize> for Seat {
    type Error = String;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Seat::from_index(index).ok_or_else(|| format!("no seat with index {index}"))
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::First => write!(f, "Player 1"),
            Seat::Second => write!(f, "Player 2"),
        }
    }
}

/// Finds which seat `who` occupies. Empty seats are `None`.
pub fn seat_of<A: PartialEq>(players: &[Option<A>; 2], who: &A) -> Option<Seat> {
    players
        .iter()
        .position(|p| p.as_ref() == Some(who))
        .and_then(Seat::from_index)
}

pub fn open_seat<A>(players: &[Option<A>; 2]) -> Option<Seat> {
    players
        .iter()
        .position(Option::is_none)
        .and_then(Seat::from_index)
}
