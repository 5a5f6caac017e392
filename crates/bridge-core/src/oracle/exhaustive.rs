use super::{DoubleDummyOracle, OracleError, OracleRequest, OracleSolution, ScoredCard, in_play};
use crate::model::card::Card;
use crate::model::cardset::CardSet;
use crate::model::player::{PlayerPosition, Side};
use crate::model::suit::Suit;
use crate::model::trick::{Play, legal_plays, winning_play};
use std::collections::HashMap;

/// Full-width minimax solver for small endgames.
///
/// Touching cards (and cards separated only by cards already played) are
/// searched once per group, and values are memoised at trick boundaries
/// keyed by the four holdings and the leader. Positions with more than
/// `max_cards` cards in any hand are refused rather than searched.
#[derive(Debug, Clone, Copy)]
pub struct ExhaustiveOracle {
    max_cards: usize,
}

impl ExhaustiveOracle {
    pub const DEFAULT_MAX_CARDS: usize = 5;

    pub fn new(max_cards: usize) -> Self {
        Self { max_cards }
    }

    pub fn max_cards(&self) -> usize {
        self.max_cards
    }
}

impl Default for ExhaustiveOracle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_CARDS)
    }
}

impl DoubleDummyOracle for ExhaustiveOracle {
    fn solve(&self, request: &OracleRequest) -> Result<OracleSolution, OracleError> {
        request.validate()?;
        let largest = request
            .remaining
            .iter()
            .map(|hand| hand.len())
            .max()
            .unwrap_or(0);
        if largest > self.max_cards {
            return Err(OracleError::PositionTooLarge {
                cards: largest,
                limit: self.max_cards,
            });
        }

        let mover = request.seat_to_play();
        let mut trick = request.current_trick.clone();
        let lead = trick.first().map(|play| play.card.suit);
        let candidates = legal_plays(request.remaining[mover.index()], lead);
        let tricks_left = largest as u8;

        let mut search = Search::new(request.trump);
        let mut cards = Vec::new();
        for group in candidates.equivalence_classes(in_play(&request.remaining, &trick)) {
            let Some(card) = group.first() else {
                continue;
            };
            let north_south =
                search.after_play(request.remaining, &mut trick, request.leader, mover, card);
            let tricks = match mover.side() {
                Side::NorthSouth => north_south,
                Side::EastWest => tricks_left - north_south,
            };
            let mut equals = group;
            equals.remove(card);
            cards.push(ScoredCard {
                card,
                tricks,
                equals,
            });
        }
        cards.sort_by(|a, b| b.tricks.cmp(&a.tricks));

        tracing::trace!(
            target: "bridge_core::oracle",
            nodes = search.nodes,
            memo = search.memo.len(),
            "exhaustive solve complete"
        );
        Ok(OracleSolution { cards })
    }
}

struct Search {
    trump: Option<Suit>,
    memo: HashMap<([u64; 4], PlayerPosition), u8>,
    nodes: usize,
}

impl Search {
    fn new(trump: Option<Suit>) -> Self {
        Self {
            trump,
            memo: HashMap::new(),
            nodes: 0,
        }
    }

    /// North-South tricks from this node to the end, counting the trick in
    /// progress.
    fn value(&mut self, hands: [CardSet; 4], trick: &mut Vec<Play>, leader: PlayerPosition) -> u8 {
        self.nodes += 1;
        let key = (hands.map(CardSet::bits), leader);
        if trick.is_empty() {
            if hands.iter().all(|hand| hand.is_empty()) {
                return 0;
            }
            if let Some(value) = self.memo.get(&key) {
                return *value;
            }
        }

        let mover = leader.next_k(trick.len());
        let lead = trick.first().map(|play| play.card.suit);
        let candidates = legal_plays(hands[mover.index()], lead);
        let maximise = mover.side() == Side::NorthSouth;

        let mut best: Option<u8> = None;
        for group in candidates.equivalence_classes(in_play(&hands, trick)) {
            let Some(card) = group.first() else {
                continue;
            };
            let value = self.after_play(hands, trick, leader, mover, card);
            best = Some(match best {
                None => value,
                Some(current) if maximise => current.max(value),
                Some(current) => current.min(value),
            });
        }

        let value = best.unwrap_or(0);
        if trick.is_empty() {
            self.memo.insert(key, value);
        }
        value
    }

    fn after_play(
        &mut self,
        mut hands: [CardSet; 4],
        trick: &mut Vec<Play>,
        leader: PlayerPosition,
        mover: PlayerPosition,
        card: Card,
    ) -> u8 {
        hands[mover.index()].remove(card);
        trick.push(Play {
            position: mover,
            card,
        });

        let value = if trick.len() == 4 {
            let winner = winning_play(trick, self.trump)
                .map(|play| play.position)
                .unwrap_or(leader);
            let completed = std::mem::take(trick);
            let won = u8::from(winner.side() == Side::NorthSouth);
            let rest = self.value(hands, trick, winner);
            *trick = completed;
            won + rest
        } else {
            self.value(hands, trick, leader)
        };

        trick.pop();
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cardset::parse_deal;

    fn request(deal: &str, trump: Option<Suit>, leader: PlayerPosition) -> OracleRequest {
        OracleRequest {
            trump,
            leader,
            current_trick: Vec::new(),
            remaining: parse_deal(deal).unwrap(),
        }
    }

    #[test]
    fn cashes_top_tricks() {
        let req = request("AK... QJ... T9... 87...", None, PlayerPosition::North);
        let solution = ExhaustiveOracle::default().solve(&req).unwrap();
        let best = solution.best().unwrap();
        assert_eq!(best.tricks, 2);
        assert_eq!(best.card.to_string(), "SA");
        assert_eq!(best.equals.to_string(), "K...");
        assert_eq!(solution.cards.len(), 1);
    }

    #[test]
    fn trump_ruff_takes_the_trick() {
        // East ruffs the spade lead and cashes the diamond.
        let req = request("AK... ..2.2 QJ... T9...", Some(Suit::Clubs), PlayerPosition::North);
        let solution = ExhaustiveOracle::default().solve(&req).unwrap();
        assert_eq!(solution.best().map(|scored| scored.tricks), Some(0));

        let notrump = request("AK... ..2.2 QJ... T9...", None, PlayerPosition::North);
        let solution = ExhaustiveOracle::default().solve(&notrump).unwrap();
        assert_eq!(solution.best().map(|scored| scored.tricks), Some(2));
    }

    #[test]
    fn scores_are_for_the_side_to_play() {
        let req = request("AK... QJ... T9... 87...", None, PlayerPosition::East);
        let solution = ExhaustiveOracle::default().solve(&req).unwrap();
        assert_eq!(solution.best().map(|scored| scored.tricks), Some(0));
    }

    #[test]
    fn partial_trick_is_completed_first() {
        let mut req = request("A... 2... K... ...", None, PlayerPosition::West);
        req.current_trick = vec![Play {
            position: PlayerPosition::West,
            card: "SQ".parse().unwrap(),
        }];
        let solution = ExhaustiveOracle::default().solve(&req).unwrap();
        let best = solution.best().unwrap();
        assert_eq!(best.card.to_string(), "SA");
        assert_eq!(best.tricks, 1);
    }

    #[test]
    fn refuses_large_positions() {
        let req = request("AKQ... JT9... 876... 543...", None, PlayerPosition::North);
        let err = ExhaustiveOracle::new(2).solve(&req).unwrap_err();
        assert_eq!(err, OracleError::PositionTooLarge { cards: 3, limit: 2 });
    }
}
