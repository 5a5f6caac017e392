use bridge_core::game::state::GameState;
use bridge_core::model::card::Card;
use bridge_core::model::cardset::CardSet;
use bridge_core::model::contract::Contract;
use bridge_core::model::history::PlayHistory;
use bridge_core::model::player::{PlayerPosition, Side};
use bridge_core::model::suit::{Suit, SuitMask};
use bridge_core::model::trick::{Trick, TrickError, legal_plays};
use std::collections::BTreeMap;

/// What one seat knows during the play: its own hand, dummy once it is
/// tabled, the auction's bid suits and every card played so far.
#[derive(Debug, Clone)]
pub struct PlayerView {
    seat: PlayerPosition,
    contract: Contract,
    hand: CardSet,
    dummy: Option<CardSet>,
    history: PlayHistory,
    bids: BTreeMap<PlayerPosition, Suit>,
}

impl PlayerView {
    pub fn new(seat: PlayerPosition, contract: Contract, hand: CardSet) -> Self {
        Self {
            seat,
            contract,
            hand,
            dummy: None,
            history: PlayHistory::new(contract.trump(), contract.opening_leader()),
            bids: BTreeMap::new(),
        }
    }

    /// Suits each seat bid during the auction, at most one per seat.
    pub fn with_bids(mut self, bids: impl IntoIterator<Item = (PlayerPosition, Suit)>) -> Self {
        self.bids = bids.into_iter().collect();
        self
    }

    pub fn seat(&self) -> PlayerPosition {
        self.seat
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn hand(&self) -> CardSet {
        self.hand
    }

    pub fn dummy(&self) -> Option<CardSet> {
        self.dummy
    }

    pub fn history(&self) -> &PlayHistory {
        &self.history
    }

    pub fn bid_suit(&self, seat: PlayerPosition) -> Option<Suit> {
        self.bids.get(&seat).copied()
    }

    pub fn is_declaring(&self) -> bool {
        self.seat.side() == self.contract.declaring_side()
    }

    /// Tables dummy. Cards dummy has already played are left out.
    pub fn expose_dummy(&mut self, cards: CardSet) {
        let played = self.history.played_by(self.contract.dummy());
        self.dummy = Some(cards.difference(played));
    }

    /// The current holding of `seat` if this view can see it.
    pub fn known_hand(&self, seat: PlayerPosition) -> Option<CardSet> {
        if seat == self.seat {
            Some(self.hand)
        } else if seat == self.contract.dummy() {
            self.dummy
        } else {
            None
        }
    }

    /// Seats whose cards this view cannot see, in seat order.
    pub fn hidden_seats(&self) -> Vec<PlayerPosition> {
        PlayerPosition::LOOP
            .iter()
            .copied()
            .filter(|seat| self.known_hand(*seat).is_none())
            .collect()
    }

    /// Cards neither played nor visible to this view.
    pub fn unseen_cards(&self) -> CardSet {
        let known = PlayerPosition::LOOP
            .iter()
            .filter_map(|seat| self.known_hand(*seat))
            .fold(CardSet::EMPTY, |acc, hand| acc.union(hand));
        CardSet::FULL
            .difference(self.history.played_cards())
            .difference(known)
    }

    /// How many cards each hidden seat still holds.
    pub fn unseen_counts(&self) -> BTreeMap<PlayerPosition, usize> {
        self.hidden_seats()
            .into_iter()
            .map(|seat| (seat, 13 - self.history.played_by(seat).len()))
            .collect()
    }

    pub fn shown_out(&self, seat: PlayerPosition) -> SuitMask {
        self.history.shown_out(seat)
    }

    pub fn next_to_play(&self) -> PlayerPosition {
        self.history.next_to_play()
    }

    /// Legal cards for `seat` given the trick in progress, if its hand is
    /// visible.
    pub fn legal_cards(&self, seat: PlayerPosition) -> Option<CardSet> {
        let lead = self.history.current_trick().and_then(|trick| trick.lead_suit());
        self.known_hand(seat).map(|hand| legal_plays(hand, lead))
    }

    /// Records a play and removes it from whichever visible hand held it.
    pub fn record_play(
        &mut self,
        seat: PlayerPosition,
        card: Card,
    ) -> Result<Option<PlayerPosition>, TrickError> {
        let winner = self.history.record(seat, card)?;
        if seat == self.seat {
            self.hand.remove(card);
        }
        if seat == self.contract.dummy() {
            if let Some(dummy) = self.dummy.as_mut() {
                dummy.remove(card);
            }
        }
        Ok(winner)
    }

    /// Completes the deal with `assigned` holdings for the hidden seats.
    pub fn complete_deal(&self, assigned: &BTreeMap<PlayerPosition, CardSet>) -> [CardSet; 4] {
        let mut hands = [CardSet::EMPTY; 4];
        for seat in PlayerPosition::LOOP {
            hands[seat.index()] = self
                .known_hand(seat)
                .or_else(|| assigned.get(&seat).copied())
                .unwrap_or_default();
        }
        hands
    }

    /// North-South tricks taken so far.
    pub fn north_south_tricks(&self) -> usize {
        self.history
            .completed_tricks()
            .iter()
            .filter(|done| done.winner.side() == Side::NorthSouth)
            .count()
    }

    /// A search root for `hands`: the trick in progress, the seat to play and
    /// the North-South tally so far.
    pub fn game_state(&self, hands: [CardSet; 4]) -> GameState {
        let trick = self
            .history
            .current_trick()
            .cloned()
            .unwrap_or_else(|| Trick::new(self.history.next_to_play()));
        GameState::with_trick(hands, trick, self.north_south_tricks() as f64)
    }
}
