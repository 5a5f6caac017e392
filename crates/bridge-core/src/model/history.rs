use crate::model::card::Card;
use crate::model::cardset::CardSet;
use crate::model::player::PlayerPosition;
use crate::model::suit::{Suit, SuitMask};
use crate::model::trick::{Trick, TrickError};

/// A trick that has received all four cards, with the seat that won it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTrick {
    pub trick: Trick,
    pub winner: PlayerPosition,
}

/// Everything played so far in a deal: completed tricks plus the trick in
/// progress. Shown-out suits and per-seat played cards are derived as plays
/// are recorded.
#[derive(Debug, Clone)]
pub struct PlayHistory {
    trump: Option<Suit>,
    completed: Vec<CompletedTrick>,
    current: Trick,
    played: [CardSet; 4],
    shown_out: [SuitMask; 4],
}

impl PlayHistory {
    pub fn new(trump: Option<Suit>, opening_leader: PlayerPosition) -> Self {
        Self {
            trump,
            completed: Vec::with_capacity(13),
            current: Trick::new(opening_leader),
            played: [CardSet::EMPTY; 4],
            shown_out: [SuitMask::EMPTY; 4],
        }
    }

    pub fn trump(&self) -> Option<Suit> {
        self.trump
    }

    pub fn completed_tricks(&self) -> &[CompletedTrick] {
        &self.completed
    }

    /// The trick in progress, `None` between tricks.
    pub fn current_trick(&self) -> Option<&Trick> {
        if self.current.is_empty() {
            None
        } else {
            Some(&self.current)
        }
    }

    pub fn next_to_play(&self) -> PlayerPosition {
        self.current.expected_position()
    }

    pub fn played_by(&self, seat: PlayerPosition) -> CardSet {
        self.played[seat.index()]
    }

    pub fn played_cards(&self) -> CardSet {
        self.played
            .iter()
            .fold(CardSet::EMPTY, |acc, cards| acc.union(*cards))
    }

    pub fn shown_out(&self, seat: PlayerPosition) -> SuitMask {
        self.shown_out[seat.index()]
    }

    pub fn cards_played(&self) -> usize {
        self.completed.len() * 4 + self.current.len()
    }

    pub fn tricks_won_by(&self, seat: PlayerPosition) -> usize {
        self.completed
            .iter()
            .filter(|done| done.winner.side() == seat.side())
            .count()
    }

    /// Records a play. Returns the winner when the play completes a trick;
    /// the winner then leads the next one.
    pub fn record(
        &mut self,
        seat: PlayerPosition,
        card: Card,
    ) -> Result<Option<PlayerPosition>, TrickError> {
        let lead = self.current.lead_suit();
        self.current.play(seat, card)?;
        self.played[seat.index()].insert(card);
        if let Some(lead) = lead.filter(|suit| *suit != card.suit) {
            self.shown_out[seat.index()] = self.shown_out[seat.index()].with(lead);
        }

        if !self.current.is_complete() {
            return Ok(None);
        }
        let Some(winner) = self.current.winner(self.trump) else {
            return Ok(None);
        };
        let trick = std::mem::replace(&mut self.current, Trick::new(winner));
        self.completed.push(CompletedTrick { trick, winner });
        Ok(Some(winner))
    }

    /// Whether `remaining` holdings agree with what has been played: no card
    /// is both played and held, and played plus held cards make up the deck.
    pub fn is_consistent_with(&self, remaining: &[CardSet; 4]) -> bool {
        let mut held = CardSet::EMPTY;
        for hand in remaining {
            if !held.is_disjoint(*hand) {
                return false;
            }
            held = held.union(*hand);
        }
        let played = self.played_cards();
        held.is_disjoint(played)
            && self.cards_played() == 52 - held.len()
            && held.union(played) == CardSet::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cardset::parse_deal;

    fn card(text: &str) -> Card {
        text.parse().unwrap()
    }

    #[test]
    fn records_winner_and_shown_out_suits() {
        let mut history = PlayHistory::new(Some(Suit::Clubs), PlayerPosition::South);
        assert_eq!(history.record(PlayerPosition::South, card("S9")), Ok(None));
        assert_eq!(history.record(PlayerPosition::West, card("SQ")), Ok(None));
        assert_eq!(history.record(PlayerPosition::North, card("SA")), Ok(None));
        assert_eq!(
            history.record(PlayerPosition::East, card("C7")),
            Ok(Some(PlayerPosition::East))
        );

        assert!(history.shown_out(PlayerPosition::East).contains(Suit::Spades));
        assert!(history.shown_out(PlayerPosition::North).is_empty());
        assert_eq!(history.next_to_play(), PlayerPosition::East);
        assert!(history.current_trick().is_none());
        assert_eq!(history.tricks_won_by(PlayerPosition::West), 1);
        assert!(history.played_by(PlayerPosition::North).contains(card("SA")));
    }

    #[test]
    fn out_of_turn_play_is_rejected() {
        let mut history = PlayHistory::new(None, PlayerPosition::North);
        assert!(matches!(
            history.record(PlayerPosition::East, card("H2")),
            Err(TrickError::OutOfTurn { .. })
        ));
        assert_eq!(history.cards_played(), 0);
    }

    #[test]
    fn consistency_tracks_cards_played() {
        let mut hands = parse_deal(
            "AJ4.T7.AT652.KJ2 K73.A985432.Q9.7 985..KJ84.AQT654 QT62.KQJ6.73.983",
        )
        .unwrap();
        let mut history = PlayHistory::new(Some(Suit::Clubs), PlayerPosition::South);
        assert!(history.is_consistent_with(&hands));

        history.record(PlayerPosition::South, card("S9")).unwrap();
        assert!(!history.is_consistent_with(&hands));
        hands[PlayerPosition::South.index()].remove(card("S9"));
        assert!(history.is_consistent_with(&hands));
    }
}
