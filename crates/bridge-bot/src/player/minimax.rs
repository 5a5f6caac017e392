use super::{CardPlayer, PlayerError, lead_suit, log_play_decision, naive_card, playable};
use crate::params::{AssignerMode, BotParams};
use crate::search::MinimaxSearch;
use crate::view::PlayerView;
use bridge_core::game::engine::TrickEngine;
use bridge_core::inference::{
    AssignmentSource, BiddingEvidence, HandInferenceModel, HiddenSeat, UniformRandomAssigner,
};
use bridge_core::model::card::Card;
use bridge_core::model::cardset::CardSet;
use bridge_core::model::player::PlayerPosition;
use bridge_core::model::suit::SuitMask;
use bridge_core::oracle::{DoubleDummyOracle, FullDealOracle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

/// Deals the hidden hands once per decision and searches the resulting
/// double-dummy position.
pub struct MinimaxPlayer<O = FullDealOracle> {
    view: PlayerView,
    params: BotParams,
    oracle: O,
    evidence: BiddingEvidence,
    rng: StdRng,
    last_source: Option<AssignmentSource>,
}

impl MinimaxPlayer<FullDealOracle> {
    pub fn new(view: PlayerView, params: BotParams) -> Self {
        Self::with_oracle(view, params, FullDealOracle::new())
    }
}

impl<O: DoubleDummyOracle> MinimaxPlayer<O> {
    pub fn with_oracle(view: PlayerView, params: BotParams, oracle: O) -> Self {
        Self {
            view,
            params,
            oracle,
            evidence: BiddingEvidence::default(),
            rng: StdRng::seed_from_u64(params.seed),
            last_source: None,
        }
    }

    pub fn with_evidence(mut self, evidence: BiddingEvidence) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn params(&self) -> &BotParams {
        &self.params
    }

    /// How the most recent inferred deal was produced, `None` when the last
    /// deal was uniform.
    pub fn last_source(&self) -> Option<AssignmentSource> {
        self.last_source
    }

    fn uses_inference(&self) -> bool {
        match self.params.assigner {
            AssignerMode::Uniform => false,
            AssignerMode::Inference => true,
            AssignerMode::InferenceWhenDefending => !self.view.is_declaring(),
        }
    }

    fn inferred_hands(&mut self) -> BTreeMap<PlayerPosition, CardSet> {
        let required = self.view.unseen_counts();
        let seats: Vec<HiddenSeat> = self
            .view
            .hidden_seats()
            .into_iter()
            .map(|seat| HiddenSeat {
                seat,
                required: required.get(&seat).copied().unwrap_or(0),
                bid_suit: self.view.bid_suit(seat),
                shown_out: self.view.shown_out(seat),
            })
            .collect();
        let model = HandInferenceModel::new(self.view.unseen_cards(), seats, self.evidence.clone());
        let inferred = model.assign(&mut self.rng);
        self.last_source = Some(inferred.source);
        inferred.hands
    }

    fn uniform_hands(&mut self) -> BTreeMap<PlayerPosition, CardSet> {
        let required = self.view.unseen_counts();
        let closed: BTreeMap<PlayerPosition, SuitMask> = required
            .keys()
            .map(|seat| (*seat, self.view.shown_out(*seat)))
            .collect();
        self.last_source = None;
        let unseen = self.view.unseen_cards();
        let rng = &mut self.rng;
        UniformRandomAssigner::assign_respecting_voids(unseen, &required, &closed, rng)
            .unwrap_or_else(|| UniformRandomAssigner::assign(unseen, &required, rng))
    }
}

impl<O: DoubleDummyOracle> CardPlayer for MinimaxPlayer<O> {
    fn name(&self) -> &'static str {
        "minimax"
    }

    fn view(&self) -> &PlayerView {
        &self.view
    }

    fn view_mut(&mut self) -> &mut PlayerView {
        &mut self.view
    }

    fn assign_cards(&mut self) -> [CardSet; 4] {
        let hidden = if self.uses_inference() {
            self.inferred_hands()
        } else {
            self.uniform_hands()
        };
        self.view.complete_deal(&hidden)
    }

    fn choose_card(&mut self, seat: PlayerPosition) -> Result<Card, PlayerError> {
        let legal = playable(&self.view, seat)?;
        if legal.len() == 1 {
            let card = legal.first().ok_or(PlayerError::NoLegalMoves(seat))?;
            log_play_decision(self.name(), &self.view, seat, legal, card, "forced");
            return Ok(card);
        }

        let hand_size = self.view.known_hand(seat).map_or(0, CardSet::len);
        if hand_size > self.params.search_max_cards {
            let card =
                naive_card(legal, lead_suit(&self.view)).ok_or(PlayerError::NoLegalMoves(seat))?;
            log_play_decision(self.name(), &self.view, seat, legal, card, "naive_fallback");
            return Ok(card);
        }

        let deal = self.assign_cards();
        let state = self.view.game_state(deal);
        let engine = TrickEngine::for_contract(self.view.contract());
        let search = MinimaxSearch::new(engine, &self.oracle);
        let outcome = search.search(&state, self.params.search_depth)?;
        log_play_decision(self.name(), &self.view, seat, legal, outcome.card, "minimax");
        Ok(outcome.card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::model::cardset::parse_deal;
    use bridge_core::model::contract::Contract;
    use bridge_core::model::suit::Suit;

    const DEAL: &str = "AJ4.T7.AT652.KJ2 K73.A985432.Q9.7 985..KJ84.AQT654 QT62.KQJ6.73.983";

    fn card(text: &str) -> Card {
        text.parse().unwrap()
    }

    fn params(assigner: AssignerMode) -> BotParams {
        BotParams {
            assigner,
            seed: 11,
            ..BotParams::default()
        }
    }

    #[test]
    fn large_hands_play_the_naive_card() {
        let hands = parse_deal(DEAL).unwrap();
        let contract = Contract::parse("4C", PlayerPosition::East).unwrap();
        let view = PlayerView::new(PlayerPosition::South, contract, hands[2]);
        let limited = BotParams {
            search_max_cards: 5,
            oracle_max_cards: 5,
            ..params(AssignerMode::Uniform)
        };
        let mut player = MinimaxPlayer::new(view, limited);

        assert_eq!(player.choose_card(PlayerPosition::South).unwrap(), card("S9"));
    }

    #[test]
    fn defenders_infer_and_declarer_deals_uniformly() {
        let hands = parse_deal(DEAL).unwrap();
        let contract = Contract::parse("4C", PlayerPosition::East).unwrap();
        let bids = [(PlayerPosition::East, Suit::Clubs), (PlayerPosition::South, Suit::Diamonds)];

        let defender = PlayerView::new(PlayerPosition::South, contract, hands[2]).with_bids(bids);
        let mut defender = MinimaxPlayer::new(defender, params(AssignerMode::InferenceWhenDefending));
        let deal = defender.assign_cards();
        assert!(defender.last_source().is_some());
        assert_eq!(deal[PlayerPosition::South.index()], hands[2]);
        assert!(deal.iter().all(|hand| hand.len() == 13));

        let declarer = PlayerView::new(PlayerPosition::East, contract, hands[1]).with_bids(bids);
        let mut declarer = MinimaxPlayer::new(declarer, params(AssignerMode::InferenceWhenDefending));
        let deal = declarer.assign_cards();
        assert_eq!(declarer.last_source(), None);
        assert_eq!(deal[PlayerPosition::East.index()], hands[1]);
    }
}
