use super::{CardPlayer, PlayerError, lead_suit, log_play_decision, naive_card, playable};
use crate::params::BotParams;
use crate::view::PlayerView;
use bridge_core::model::card::Card;
use bridge_core::model::cardset::CardSet;
use bridge_core::model::player::PlayerPosition;
use bridge_core::oracle::{DoubleDummyOracle, FullDealOracle, OracleRequest};

/// Sees all four hands and plays the oracle's best card. Used as a
/// reference opponent; hands larger than `oracle_max_cards` play naively.
pub struct OraclePlayer<O = FullDealOracle> {
    view: PlayerView,
    deal: [CardSet; 4],
    params: BotParams,
    oracle: O,
}

impl OraclePlayer<FullDealOracle> {
    pub fn new(view: PlayerView, deal: [CardSet; 4], params: BotParams) -> Self {
        Self::with_oracle(view, deal, params, FullDealOracle::new())
    }
}

impl<O: DoubleDummyOracle> OraclePlayer<O> {
    pub fn with_oracle(view: PlayerView, deal: [CardSet; 4], params: BotParams, oracle: O) -> Self {
        Self {
            view,
            deal,
            params,
            oracle,
        }
    }

    fn request(&self) -> OracleRequest {
        let history = self.view.history();
        let (leader, current_trick) = match history.current_trick() {
            Some(trick) => (trick.leader(), trick.plays().to_vec()),
            None => (history.next_to_play(), Vec::new()),
        };
        OracleRequest {
            trump: self.view.contract().trump(),
            leader,
            current_trick,
            remaining: self.deal,
        }
    }
}

impl<O: DoubleDummyOracle> CardPlayer for OraclePlayer<O> {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn view(&self) -> &PlayerView {
        &self.view
    }

    fn view_mut(&mut self) -> &mut PlayerView {
        &mut self.view
    }

    fn assign_cards(&mut self) -> [CardSet; 4] {
        self.deal
    }

    fn choose_card(&mut self, seat: PlayerPosition) -> Result<Card, PlayerError> {
        let legal = playable(&self.view, seat)?;
        if legal.len() == 1 {
            let card = legal.first().ok_or(PlayerError::NoLegalMoves(seat))?;
            log_play_decision(self.name(), &self.view, seat, legal, card, "forced");
            return Ok(card);
        }

        let hand_size = self.deal[seat.index()].len();
        if hand_size > self.params.oracle_max_cards {
            let card =
                naive_card(legal, lead_suit(&self.view)).ok_or(PlayerError::NoLegalMoves(seat))?;
            log_play_decision(self.name(), &self.view, seat, legal, card, "naive_fallback");
            return Ok(card);
        }

        let solution = self.oracle.solve(&self.request())?;
        let card = solution
            .best()
            .map(|scored| scored.card)
            .filter(|card| legal.contains(*card))
            .ok_or(PlayerError::NoLegalMoves(seat))?;
        log_play_decision(self.name(), &self.view, seat, legal, card, "oracle");
        Ok(card)
    }

    fn observe_play(&mut self, seat: PlayerPosition, card: Card) -> Result<(), PlayerError> {
        self.view.record_play(seat, card)?;
        self.deal[seat.index()].remove(card);
        Ok(())
    }
}
