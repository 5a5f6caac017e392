use super::{CardPlayer, PlayerError, lead_suit, log_play_decision, naive_card, playable};
use crate::view::PlayerView;
use bridge_core::inference::UniformRandomAssigner;
use bridge_core::model::card::Card;
use bridge_core::model::cardset::CardSet;
use bridge_core::model::player::PlayerPosition;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Plays by fixed rules without looking ahead; see [`naive_card`].
pub struct NaivePlayer {
    view: PlayerView,
    rng: StdRng,
}

impl NaivePlayer {
    pub fn new(view: PlayerView, seed: u64) -> Self {
        Self {
            view,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CardPlayer for NaivePlayer {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn view(&self) -> &PlayerView {
        &self.view
    }

    fn view_mut(&mut self) -> &mut PlayerView {
        &mut self.view
    }

    fn assign_cards(&mut self) -> [CardSet; 4] {
        let hands = UniformRandomAssigner::assign(
            self.view.unseen_cards(),
            &self.view.unseen_counts(),
            &mut self.rng,
        );
        self.view.complete_deal(&hands)
    }

    fn choose_card(&mut self, seat: PlayerPosition) -> Result<Card, PlayerError> {
        let legal = playable(&self.view, seat)?;
        let card = naive_card(legal, lead_suit(&self.view)).ok_or(PlayerError::NoLegalMoves(seat))?;
        log_play_decision(self.name(), &self.view, seat, legal, card, "naive");
        Ok(card)
    }
}
