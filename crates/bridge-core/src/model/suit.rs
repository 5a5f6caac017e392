use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::ParseError;

/// Card suits in card-code order (spades occupy codes `0..13`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Suit {
    Spades = 0,
    Hearts = 1,
    Diamonds = 2,
    Clubs = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Suit::Spades),
            1 => Some(Suit::Hearts),
            2 => Some(Suit::Diamonds),
            3 => Some(Suit::Clubs),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn symbol(self) -> char {
        match self {
            Suit::Spades => 'S',
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
        }
    }

    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'S' | 's' => Some(Suit::Spades),
            'H' | 'h' => Some(Suit::Hearts),
            'D' | 'd' => Some(Suit::Diamonds),
            'C' | 'c' => Some(Suit::Clubs),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Suit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(symbol), None) => {
                Suit::from_symbol(symbol).ok_or_else(|| ParseError::Suit(s.to_string()))
            }
            _ => Err(ParseError::Suit(s.to_string())),
        }
    }
}

/// Compact set of suits, used to record which suits a seat has shown out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SuitMask(u8);

impl SuitMask {
    pub const EMPTY: SuitMask = SuitMask(0);

    pub const fn contains(self, suit: Suit) -> bool {
        self.0 & (1u8 << suit as u8) != 0
    }

    pub const fn with(self, suit: Suit) -> Self {
        SuitMask(self.0 | (1u8 << suit as u8))
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Suit> {
        Suit::ALL.into_iter().filter(move |suit| self.contains(*suit))
    }
}

impl FromIterator<Suit> for SuitMask {
    fn from_iter<I: IntoIterator<Item = Suit>>(iter: I) -> Self {
        iter.into_iter().fold(SuitMask::EMPTY, SuitMask::with)
    }
}
