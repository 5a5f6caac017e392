use crate::model::player::{PlayerPosition, Side};
use crate::model::suit::Suit;
use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("contract level {0} is outside 1..=7")]
    Level(u8),
    #[error("invalid contract '{0}'")]
    Syntax(String),
}

/// The final contract of an auction. `trump` is `None` for no-trump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contract {
    level: u8,
    trump: Option<Suit>,
    declarer: PlayerPosition,
}

impl Contract {
    pub fn new(
        level: u8,
        trump: Option<Suit>,
        declarer: PlayerPosition,
    ) -> Result<Self, ContractError> {
        if !(1..=7).contains(&level) {
            return Err(ContractError::Level(level));
        }
        Ok(Self {
            level,
            trump,
            declarer,
        })
    }

    /// Parses `<level><strain>[X|XX]`, e.g. `3NT`, `4H`, `2SX`. The strain is
    /// one of `C D H S N NT`; doubling is accepted and ignored.
    pub fn parse(text: &str, declarer: PlayerPosition) -> Result<Self, ContractError> {
        let upper = text.trim().to_ascii_uppercase();
        let syntax = || ContractError::Syntax(text.to_string());

        let mut chars = upper.chars();
        let level = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(syntax)? as u8;
        let strain = chars.as_str().trim_end_matches('X');
        let trump = match strain {
            "NT" | "N" => None,
            other => {
                let mut symbols = other.chars();
                match (symbols.next(), symbols.next()) {
                    (Some(symbol), None) => Some(Suit::from_symbol(symbol).ok_or_else(syntax)?),
                    _ => return Err(syntax()),
                }
            }
        };
        if upper.len() - upper.trim_end_matches('X').len() > 2 {
            return Err(syntax());
        }
        Contract::new(level, trump, declarer)
    }

    pub const fn level(&self) -> u8 {
        self.level
    }

    pub const fn trump(&self) -> Option<Suit> {
        self.trump
    }

    pub const fn declarer(&self) -> PlayerPosition {
        self.declarer
    }

    pub const fn dummy(&self) -> PlayerPosition {
        self.declarer.opposite()
    }

    pub const fn declaring_side(&self) -> Side {
        self.declarer.side()
    }

    /// The seat on lead to the first trick.
    pub const fn opening_leader(&self) -> PlayerPosition {
        self.declarer.next()
    }

    pub const fn tricks_needed(&self) -> u8 {
        6 + self.level
    }

    pub fn is_declaring_seat(&self, seat: PlayerPosition) -> bool {
        seat.side() == self.declaring_side()
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.trump {
            Some(suit) => write!(f, "{}{} by {}", self.level, suit, self.declarer),
            None => write!(f, "{}NT by {}", self.level, self.declarer),
        }
    }
}
