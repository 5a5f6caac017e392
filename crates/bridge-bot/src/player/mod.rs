//! Card-play strategies behind one capability trait.
//!
//! Every player owns a [`PlayerView`] of the deal, follows the play through
//! [`CardPlayer::observe_play`] and picks cards for the seats it controls
//! (its own, plus dummy when it is declarer).

mod minimax;
mod naive;
mod oracle;

pub use minimax::MinimaxPlayer;
pub use naive::NaivePlayer;
pub use oracle::OraclePlayer;

use crate::search::SearchError;
use crate::view::PlayerView;
use bridge_core::model::card::Card;
use bridge_core::model::cardset::CardSet;
use bridge_core::model::player::PlayerPosition;
use bridge_core::model::suit::Suit;
use bridge_core::model::trick::TrickError;
use bridge_core::oracle::OracleError;
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("{seat} is not on play, {expected} is")]
    NotOnPlay {
        seat: PlayerPosition,
        expected: PlayerPosition,
    },
    #[error("{viewer} cannot see the cards of {seat}")]
    HiddenHand {
        viewer: PlayerPosition,
        seat: PlayerPosition,
    },
    #[error("{0} has no card to play")]
    NoLegalMoves(PlayerPosition),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Trick(#[from] TrickError),
}

pub trait CardPlayer {
    fn name(&self) -> &'static str;

    fn view(&self) -> &PlayerView;

    fn view_mut(&mut self) -> &mut PlayerView;

    /// Holdings for all four seats: visible hands as they are, hidden hands
    /// filled in with one hypothesis.
    fn assign_cards(&mut self) -> [CardSet; 4];

    /// Picks the next card for `seat`, which must be on play and visible to
    /// this player.
    fn choose_card(&mut self, seat: PlayerPosition) -> Result<Card, PlayerError>;

    fn observe_play(&mut self, seat: PlayerPosition, card: Card) -> Result<(), PlayerError> {
        self.view_mut().record_play(seat, card)?;
        Ok(())
    }

    fn observe_dummy(&mut self, cards: CardSet) {
        self.view_mut().expose_dummy(cards);
    }
}

/// Lowest card code on lead, the lowest-ranked card of the led suit when
/// following, and the lowest card code when void.
pub fn naive_card(hand: CardSet, lead: Option<Suit>) -> Option<Card> {
    match lead {
        None => hand.first(),
        Some(suit) => hand.of_suit(suit).last().or_else(|| hand.first()),
    }
}

/// The cards `seat` may play now, checking it is on play and visible.
pub(crate) fn playable(view: &PlayerView, seat: PlayerPosition) -> Result<CardSet, PlayerError> {
    let expected = view.next_to_play();
    if seat != expected {
        return Err(PlayerError::NotOnPlay { seat, expected });
    }
    let legal = view.legal_cards(seat).ok_or(PlayerError::HiddenHand {
        viewer: view.seat(),
        seat,
    })?;
    if legal.is_empty() {
        return Err(PlayerError::NoLegalMoves(seat));
    }
    Ok(legal)
}

pub(crate) fn lead_suit(view: &PlayerView) -> Option<Suit> {
    view.history()
        .current_trick()
        .and_then(|trick| trick.lead_suit())
}

pub(crate) fn log_play_decision(
    player: &str,
    view: &PlayerView,
    seat: PlayerPosition,
    legal: CardSet,
    chosen: Card,
    reason: &str,
) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    let legal_preview = if legal.len() <= 6 {
        legal
            .iter()
            .map(|card| card.to_string())
            .collect::<Vec<_>>()
            .join(",")
    } else {
        format!("{} cards", legal.len())
    };

    event!(
        target: "bridge_bot::play",
        Level::DEBUG,
        player,
        viewer = %view.seat(),
        seat = %seat,
        contract = %view.contract(),
        legal_count = legal.len(),
        legal = %legal_preview,
        chosen = %chosen,
        trick_cards = view.history().current_trick().map_or(0, |trick| trick.len()),
        reason,
    );
}
