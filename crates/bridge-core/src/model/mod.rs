pub mod card;
pub mod cardset;
pub mod contract;
pub mod deck;
pub mod history;
pub mod player;
pub mod rank;
pub mod suit;
pub mod trick;

use thiserror::Error;

use crate::model::card::Card;

/// Failures parsing the text forms of cards, hands, deals, seats and contracts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid suit '{0}'")]
    Suit(String),
    #[error("invalid card '{0}'")]
    Card(String),
    #[error("invalid hand '{0}': expected four dot-separated suit groups")]
    Hand(String),
    #[error("invalid deal '{0}': expected four space-separated hands")]
    Deal(String),
    #[error("invalid seat '{0}'")]
    Seat(String),
    #[error("card {0} appears more than once")]
    DuplicateCard(Card),
}
