//! Double-dummy evaluation of a position with every hand known.
//!
//! Search cutoffs hand a position to a [`DoubleDummyOracle`] and read back the
//! number of tricks the side to play can still take. Oracle failures are never
//! replaced by a guessed value; they propagate to the caller of the search.

mod exhaustive;
mod full_deal;

pub use exhaustive::ExhaustiveOracle;
pub use full_deal::FullDealOracle;

use crate::model::card::Card;
use crate::model::cardset::{CardSet, format_deal};
use crate::model::player::PlayerPosition;
use crate::model::suit::Suit;
use crate::model::trick::Play;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("position has {cards} cards in one hand, oracle limit is {limit}")]
    PositionTooLarge { cards: usize, limit: usize },
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// A position to solve: remaining holdings of all four seats plus the cards
/// already on the table in the trick in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    pub trump: Option<Suit>,
    /// Seat that led the trick in progress, or the seat to lead when the
    /// trick is empty.
    pub leader: PlayerPosition,
    pub current_trick: Vec<Play>,
    pub remaining: [CardSet; 4],
}

impl OracleRequest {
    pub fn seat_to_play(&self) -> PlayerPosition {
        self.leader.next_k(self.current_trick.len())
    }

    /// The compact `N:<hand> <hand> <hand> <hand>` encoding external
    /// solvers consume.
    pub fn remaining_pbn(&self) -> String {
        format_deal(&self.remaining, PlayerPosition::North)
    }

    /// Checks the position can arise in play: disjoint holdings, a trick
    /// in progress of at most three cards played in turn, and hand sizes
    /// that agree with who has already played to it.
    pub fn validate(&self) -> Result<(), OracleError> {
        let invalid = |reason: String| Err(OracleError::InvalidPosition(reason));

        if self.current_trick.len() > 3 {
            return invalid(format!("{} cards in the current trick", self.current_trick.len()));
        }
        let mut seen = CardSet::EMPTY;
        for hand in self.remaining.iter() {
            if !seen.is_disjoint(*hand) {
                return invalid("holdings overlap".to_string());
            }
            seen = seen.union(*hand);
        }
        for (offset, play) in self.current_trick.iter().enumerate() {
            if play.position != self.leader.next_k(offset) {
                return invalid(format!("{} played out of turn", play.position));
            }
            if !seen.insert(play.card) {
                return invalid(format!("{} is both held and played", play.card));
            }
        }

        let played = self.current_trick.len();
        let leader_len = self.remaining[self.leader.index()].len();
        let tricks_left = if played > 0 { leader_len + 1 } else { leader_len };
        for offset in 0..4 {
            let seat = self.leader.next_k(offset);
            let expected = if offset < played {
                tricks_left - 1
            } else {
                tricks_left
            };
            let actual = self.remaining[seat.index()].len();
            if actual != expected {
                return invalid(format!("{seat} holds {actual} cards, expected {expected}"));
            }
        }
        if tricks_left == 0 {
            return invalid("no cards left to play".to_string());
        }
        Ok(())
    }
}

/// One candidate play with the tricks the side to play takes after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCard {
    pub card: Card,
    pub tricks: u8,
    /// Other cards of the same holding that are equivalent to `card`.
    pub equals: CardSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OracleSolution {
    /// Candidates sorted by tricks, best first.
    pub cards: Vec<ScoredCard>,
}

impl OracleSolution {
    pub fn best(&self) -> Option<&ScoredCard> {
        self.cards.first()
    }
}

/// Every card still held or already on the table; the universe used to
/// group touching cards.
pub(crate) fn in_play(hands: &[CardSet; 4], trick: &[Play]) -> CardSet {
    let held = hands
        .iter()
        .fold(CardSet::EMPTY, |acc, hand| acc.union(*hand));
    trick.iter().fold(held, |mut acc, play| {
        acc.insert(play.card);
        acc
    })
}

pub trait DoubleDummyOracle {
    fn solve(&self, request: &OracleRequest) -> Result<OracleSolution, OracleError>;

    /// Tricks the side to play takes with best play from `request`.
    fn best_tricks(&self, request: &OracleRequest) -> Result<u8, OracleError> {
        self.solve(request)?
            .best()
            .map(|scored| scored.tricks)
            .ok_or_else(|| OracleError::InvalidPosition("oracle returned no cards".into()))
    }
}

impl<T: DoubleDummyOracle + ?Sized> DoubleDummyOracle for &T {
    fn solve(&self, request: &OracleRequest) -> Result<OracleSolution, OracleError> {
        (**self).solve(request)
    }

    fn best_tricks(&self, request: &OracleRequest) -> Result<u8, OracleError> {
        (**self).best_tricks(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cardset::parse_deal;

    fn request(deal: &str, leader: PlayerPosition, trick: &[&str]) -> OracleRequest {
        OracleRequest {
            trump: None,
            leader,
            current_trick: trick
                .iter()
                .enumerate()
                .map(|(offset, text)| Play {
                    position: leader.next_k(offset),
                    card: text.parse().unwrap(),
                })
                .collect(),
            remaining: parse_deal(deal).unwrap(),
        }
    }

    #[test]
    fn pbn_starts_with_north() {
        let req = request("E:A... K... Q... J...", PlayerPosition::North, &[]);
        assert_eq!(req.remaining_pbn(), "N:J... A... K... Q...");
    }

    #[test]
    fn validate_accepts_partial_trick() {
        let req = request("AK... .AK.. ..AK. ...K", PlayerPosition::West, &["CA"]);
        assert_eq!(req.validate(), Ok(()));
        assert_eq!(req.seat_to_play(), PlayerPosition::North);
    }

    #[test]
    fn validate_rejects_uneven_hands() {
        let req = request("AK... .A.. ..AK. ...AK", PlayerPosition::North, &[]);
        assert!(matches!(req.validate(), Err(OracleError::InvalidPosition(_))));
    }

    #[test]
    fn validate_rejects_played_card_still_held() {
        let req = request("AK... .AK.. ..AK. ...K", PlayerPosition::West, &["SA"]);
        assert!(req.validate().is_err());
    }
}
