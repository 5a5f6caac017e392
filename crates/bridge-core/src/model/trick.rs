use crate::model::card::Card;
use crate::model::cardset::CardSet;
use crate::model::player::PlayerPosition;
use crate::model::suit::Suit;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trick {
    leader: PlayerPosition,
    plays: Vec<Play>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Play {
    pub position: PlayerPosition,
    pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrickError {
    TrickComplete,
    OutOfTurn {
        expected: PlayerPosition,
        actual: PlayerPosition,
    },
    AlreadyPlayed(PlayerPosition),
}

impl fmt::Display for TrickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrickError::TrickComplete => write!(f, "trick already complete"),
            TrickError::OutOfTurn { expected, actual } => {
                write!(f, "expected {expected} to play next but got {actual}")
            }
            TrickError::AlreadyPlayed(position) => {
                write!(f, "{position} has already played this trick")
            }
        }
    }
}

impl std::error::Error for TrickError {}

impl Trick {
    pub fn new(leader: PlayerPosition) -> Self {
        Self {
            leader,
            plays: Vec::with_capacity(4),
        }
    }

    pub fn leader(&self) -> PlayerPosition {
        self.leader
    }

    pub fn plays(&self) -> &[Play] {
        &self.plays
    }

    pub fn len(&self) -> usize {
        self.plays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.plays.len() == 4
    }

    pub fn lead_suit(&self) -> Option<Suit> {
        self.plays.first().map(|play| play.card.suit)
    }

    pub fn play(&mut self, position: PlayerPosition, card: Card) -> Result<(), TrickError> {
        if self.is_complete() {
            return Err(TrickError::TrickComplete);
        }

        if self.plays.iter().any(|play| play.position == position) {
            return Err(TrickError::AlreadyPlayed(position));
        }

        let expected = self.expected_position();
        if expected != position {
            return Err(TrickError::OutOfTurn {
                expected,
                actual: position,
            });
        }

        self.plays.push(Play { position, card });
        Ok(())
    }

    /// The play currently holding the trick. Only cards of the led suit or
    /// of `trump` can hold it; among those a trump outranks the led suit.
    pub fn leading_play(&self, trump: Option<Suit>) -> Option<Play> {
        winning_play(&self.plays, trump)
    }

    pub fn winner(&self, trump: Option<Suit>) -> Option<PlayerPosition> {
        if !self.is_complete() {
            return None;
        }
        self.leading_play(trump).map(|play| play.position)
    }

    pub fn expected_position(&self) -> PlayerPosition {
        self.plays
            .last()
            .map(|play| play.position.next())
            .unwrap_or(self.leader)
    }
}

/// The play holding a sequence of plays in trick order.
pub fn winning_play(plays: &[Play], trump: Option<Suit>) -> Option<Play> {
    let mut plays = plays.iter().copied();
    let first = plays.next()?;
    Some(plays.fold(first, |best, play| {
        if play.card.beats(best.card, trump) {
            play
        } else {
            best
        }
    }))
}

/// Cards of `hand` that may be played to a trick led in `lead`: the whole
/// hand when leading or void in the led suit, otherwise the led suit only.
pub fn legal_plays(hand: CardSet, lead: Option<Suit>) -> CardSet {
    match lead {
        Some(suit) if hand.has_suit(suit) => hand.of_suit(suit),
        _ => hand,
    }
}
