use crate::model::cardset::CardSet;
use crate::model::player::{PlayerPosition, PlayerTurn};
use crate::model::trick::Trick;

/// A search node: the four remaining holdings, the North-South trick tally,
/// whose turn it is and the trick in progress.
///
/// States are values. [`TrickEngine::apply`](super::engine::TrickEngine::apply)
/// returns a new state and leaves its input untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    hands: [CardSet; 4],
    tricks_won: f64,
    turn: PlayerTurn,
    partial_trick: Option<Trick>,
}

impl GameState {
    /// A state at a trick boundary with `leader` to play.
    pub fn new(hands: [CardSet; 4], leader: PlayerPosition) -> Self {
        Self {
            hands,
            tricks_won: 0.0,
            turn: PlayerTurn::new(leader),
            partial_trick: None,
        }
    }

    /// A state in the middle of a trick. The seat to play is the one after
    /// the last card of `trick`; an empty trick is the same as [`GameState::new`]
    /// with its leader.
    pub fn with_trick(hands: [CardSet; 4], trick: Trick, tricks_won: f64) -> Self {
        let turn = PlayerTurn::new(trick.expected_position());
        let partial_trick = if trick.is_empty() { None } else { Some(trick) };
        Self {
            hands,
            tricks_won,
            turn,
            partial_trick,
        }
    }

    pub(crate) fn from_parts(
        hands: [CardSet; 4],
        tricks_won: f64,
        turn: PlayerTurn,
        partial_trick: Option<Trick>,
    ) -> Self {
        Self {
            hands,
            tricks_won,
            turn,
            partial_trick,
        }
    }

    pub fn hands(&self) -> &[CardSet; 4] {
        &self.hands
    }

    pub fn hand(&self, seat: PlayerPosition) -> CardSet {
        self.hands[seat.index()]
    }

    /// North-South tricks so far, including fractional deductions.
    pub fn tricks_won(&self) -> f64 {
        self.tricks_won
    }

    pub fn turn(&self) -> PlayerTurn {
        self.turn
    }

    pub fn current_player(&self) -> PlayerPosition {
        self.turn.seat()
    }

    pub fn partial_trick(&self) -> Option<&Trick> {
        self.partial_trick.as_ref()
    }

    /// Seat that led the trick in progress, or the seat to lead.
    pub fn leader(&self) -> PlayerPosition {
        self.partial_trick
            .as_ref()
            .map(Trick::leader)
            .unwrap_or_else(|| self.turn.seat())
    }

    /// The seat that played the latest card of the trick in progress.
    pub fn prev_player(&self) -> Option<PlayerPosition> {
        self.partial_trick
            .as_ref()
            .and_then(|trick| trick.plays().last())
            .map(|play| play.position)
    }

    pub fn cards_remaining(&self) -> usize {
        self.hands.iter().map(|hand| hand.len()).sum()
    }

    /// Tricks still to be completed, counting the one in progress.
    pub fn tricks_remaining(&self) -> usize {
        self.hands.iter().map(|hand| hand.len()).max().unwrap_or(0)
    }
}
