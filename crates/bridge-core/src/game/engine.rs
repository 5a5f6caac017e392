use crate::game::state::GameState;
use crate::model::card::Card;
use crate::model::cardset::CardSet;
use crate::model::contract::Contract;
use crate::model::player::{PlayerPosition, Side};
use crate::model::suit::Suit;
use crate::model::trick::{Trick, TrickError, legal_plays};
use crate::oracle::{DoubleDummyOracle, OracleError, OracleRequest};
use thiserror::Error;

/// Subtracted from the North-South tally for each North-South card ranked
/// ten or higher that ends up in a trick won by East-West.
pub const DEDUCTION: f64 = 0.5;

#[derive(Debug, Error)]
pub enum PlayError {
    #[error("{card} is not a legal play for {seat}")]
    IllegalMove { seat: PlayerPosition, card: Card },
    #[error(transparent)]
    Trick(#[from] TrickError),
}

/// The card-play rules for one contract's trump suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrickEngine {
    trump: Option<Suit>,
}

impl TrickEngine {
    pub fn new(trump: Option<Suit>) -> Self {
        Self { trump }
    }

    pub fn for_contract(contract: &Contract) -> Self {
        Self::new(contract.trump())
    }

    pub fn trump(&self) -> Option<Suit> {
        self.trump
    }

    pub fn is_terminal(&self, state: &GameState) -> bool {
        state.hands().iter().all(|hand| hand.is_empty())
    }

    pub fn legal_actions(&self, state: &GameState) -> CardSet {
        let lead = state.partial_trick().and_then(Trick::lead_suit);
        legal_plays(state.hand(state.current_player()), lead)
    }

    /// Whether the seat to play holds the last card of the trick.
    pub fn last_card_to_play(&self, state: &GameState) -> bool {
        state.partial_trick().is_some_and(|trick| trick.len() == 3)
    }

    pub fn win_trick(&self, trick: &Trick) -> Option<PlayerPosition> {
        trick.winner(self.trump)
    }

    /// Plays `card` for the seat to move and returns the successor state.
    /// A completed trick is scored and cleared, and its winner leads next.
    pub fn apply(&self, state: &GameState, card: Card) -> Result<GameState, PlayError> {
        let seat = state.current_player();
        if !self.legal_actions(state).contains(card) {
            return Err(PlayError::IllegalMove { seat, card });
        }

        let mut hands = *state.hands();
        hands[seat.index()].remove(card);
        let mut trick = state
            .partial_trick()
            .cloned()
            .unwrap_or_else(|| Trick::new(seat));
        trick.play(seat, card)?;

        let Some(winner) = self.win_trick(&trick) else {
            return Ok(GameState::from_parts(
                hands,
                state.tricks_won(),
                state.turn().next(),
                Some(trick),
            ));
        };

        let tricks_won = state.tricks_won() + self.trick_score(&trick, winner);
        Ok(GameState::from_parts(hands, tricks_won, winner.into(), None))
    }

    fn trick_score(&self, trick: &Trick, winner: PlayerPosition) -> f64 {
        if winner.side() == Side::NorthSouth {
            return 1.0;
        }
        let exposed = trick
            .plays()
            .iter()
            .filter(|play| play.position.side() == Side::NorthSouth)
            .filter(|play| play.card.code() % 13 <= 4)
            .count();
        -(exposed as f64) * DEDUCTION
    }

    /// Scores a cutoff: North-South tricks so far plus the oracle's best
    /// result from here, mirrored when East-West are to play.
    pub fn evaluate<O>(&self, state: &GameState, oracle: &O) -> Result<f64, OracleError>
    where
        O: DoubleDummyOracle + ?Sized,
    {
        if self.is_terminal(state) {
            return Ok(state.tricks_won());
        }
        let request = OracleRequest {
            trump: self.trump,
            leader: state.leader(),
            current_trick: state
                .partial_trick()
                .map(|trick| trick.plays().to_vec())
                .unwrap_or_default(),
            remaining: *state.hands(),
        };
        let best = f64::from(oracle.best_tricks(&request)?);
        let remaining = state.tricks_remaining() as f64;
        let future = match state.current_player().side() {
            Side::NorthSouth => best,
            Side::EastWest => remaining - best,
        };
        Ok(state.tricks_won() + future)
    }
}
