use crate::model::ParseError;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A playing card. The canonical integer form is `suit * 13 + rank_index`
/// where the ace has rank index 0, so a lower code is a higher rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub const fn code(self) -> u8 {
        self.suit as u8 * 13 + self.rank.index()
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        let Some(suit) = Suit::from_index((code / 13) as usize) else {
            return None;
        };
        match Rank::from_index(code % 13) {
            Some(rank) => Some(Card::new(rank, suit)),
            None => None,
        }
    }

    /// Whether `self` beats `other` once both are eligible to win the trick.
    /// A trump beats any non-trump; otherwise only same-suit rank matters.
    pub fn beats(self, other: Card, trump: Option<Suit>) -> bool {
        if self.suit == other.suit {
            return self.code() < other.code();
        }
        trump == Some(self.suit)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.suit, self.rank)
    }
}

impl FromStr for Card {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let (Some(suit), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(ParseError::Card(s.to_string()));
        };
        let suit = Suit::from_symbol(suit).ok_or_else(|| ParseError::Card(s.to_string()))?;
        let rank = Rank::from_symbol(rank).ok_or_else(|| ParseError::Card(s.to_string()))?;
        Ok(Card::new(rank, suit))
    }
}
