use bridge_core::game::engine::{PlayError, TrickEngine};
use bridge_core::game::state::GameState;
use bridge_core::model::card::Card;
use bridge_core::model::player::{PlayerPosition, Side};
use bridge_core::oracle::{DoubleDummyOracle, OracleError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{0} has no card to play")]
    NoLegalMoves(PlayerPosition),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Play(#[from] PlayError),
}

/// Result of one search: the card to play now and the value it leads to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub card: Card,
    pub value: f64,
    pub nodes: usize,
}

/// Depth-limited minimax over [`TrickEngine`] states.
///
/// Depth counts completed tricks: it drops by one each time the fourth card
/// of a trick is played, and a node at depth zero is scored by
/// [`TrickEngine::evaluate`]. North-South nodes maximise, East-West nodes
/// minimise, and among equal values the first card in legal order is kept.
pub struct MinimaxSearch<'a, O: ?Sized> {
    engine: TrickEngine,
    oracle: &'a O,
}

impl<'a, O> MinimaxSearch<'a, O>
where
    O: DoubleDummyOracle + ?Sized,
{
    pub fn new(engine: TrickEngine, oracle: &'a O) -> Self {
        Self { engine, oracle }
    }

    pub fn engine(&self) -> TrickEngine {
        self.engine
    }

    pub fn choose_card(&self, state: &GameState, depth: u32) -> Result<Card, SearchError> {
        self.search(state, depth).map(|outcome| outcome.card)
    }

    /// Searches from `state` with the seat to play at the root. A depth of
    /// zero is treated as one so the root always expands.
    pub fn search(&self, state: &GameState, depth: u32) -> Result<SearchOutcome, SearchError> {
        let seat = state.current_player();
        if self.engine.is_terminal(state) {
            return Err(SearchError::NoLegalMoves(seat));
        }

        let mut nodes = 0;
        let (value, card) = self.minimax(state, depth.max(1), &mut nodes)?;
        let card = card.ok_or(SearchError::NoLegalMoves(seat))?;
        tracing::debug!(
            target: "bridge_bot::search",
            seat = %seat,
            depth,
            nodes,
            value,
            card = %card,
            "search finished"
        );
        Ok(SearchOutcome { card, value, nodes })
    }

    fn minimax(
        &self,
        state: &GameState,
        depth: u32,
        nodes: &mut usize,
    ) -> Result<(f64, Option<Card>), SearchError> {
        *nodes += 1;
        if self.engine.is_terminal(state) {
            return Ok((state.tricks_won(), None));
        }
        if depth == 0 {
            return Ok((self.engine.evaluate(state, self.oracle)?, None));
        }

        let seat = state.current_player();
        let maximizing = seat.side() == Side::NorthSouth;
        let child_depth = if self.engine.last_card_to_play(state) {
            depth - 1
        } else {
            depth
        };

        let mut best: Option<(f64, Card)> = None;
        for card in self.engine.legal_actions(state) {
            let next = self.engine.apply(state, card)?;
            let (value, _) = self.minimax(&next, child_depth, nodes)?;
            let improves = match best {
                None => true,
                Some((current, _)) if maximizing => value > current,
                Some((current, _)) => value < current,
            };
            if improves {
                best = Some((value, card));
            }
        }

        let (value, card) = best.ok_or(SearchError::NoLegalMoves(seat))?;
        Ok((value, Some(card)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::model::cardset::parse_deal;
    use bridge_core::model::suit::Suit;
    use bridge_core::model::trick::Trick;
    use bridge_core::oracle::{ExhaustiveOracle, OracleRequest, OracleSolution};

    struct OfflineOracle;

    impl DoubleDummyOracle for OfflineOracle {
        fn solve(&self, _request: &OracleRequest) -> Result<OracleSolution, OracleError> {
            Err(OracleError::Unavailable("offline".into()))
        }
    }

    fn card(text: &str) -> Card {
        text.parse().unwrap()
    }

    /// West led the spade king, North and East followed low, South is last
    /// to play holding `south` plus a small heart for everyone else.
    fn south_last_to_play(south: &str) -> GameState {
        let deal = format!(".3.. .4.. {south}... .2..");
        let hands = parse_deal(&deal).unwrap();
        let mut trick = Trick::new(PlayerPosition::West);
        trick.play(PlayerPosition::West, card("SK")).unwrap();
        trick.play(PlayerPosition::North, card("S3")).unwrap();
        trick.play(PlayerPosition::East, card("S5")).unwrap();
        GameState::with_trick(hands, trick, 0.0)
    }

    #[test]
    fn wins_the_trick_with_the_top_card_when_it_can() {
        let state = south_last_to_play("A2");
        let oracle = ExhaustiveOracle::default();
        let search = MinimaxSearch::new(TrickEngine::new(None), &oracle);

        let outcome = search.search(&state, 1).unwrap();
        assert_eq!(outcome.card, card("SA"));
        assert_eq!(outcome.value, 2.0);
    }

    #[test]
    fn ditches_the_lowest_card_when_the_trick_is_lost() {
        let state = south_last_to_play("Q2");
        let oracle = ExhaustiveOracle::default();
        let search = MinimaxSearch::new(TrickEngine::new(None), &oracle);

        let outcome = search.search(&state, 1).unwrap();
        assert_eq!(outcome.card, card("S2"));
        assert_eq!(outcome.value, 0.0);
    }

    #[test]
    fn deeper_search_reaches_terminal_tally() {
        let state = south_last_to_play("A2");
        let search = MinimaxSearch::new(TrickEngine::new(None), &OfflineOracle);

        let outcome = search.search(&state, 2).unwrap();
        assert_eq!(outcome.card, card("SA"));
        assert_eq!(outcome.value, 2.0);
    }

    #[test]
    fn east_west_minimise() {
        // South led the spade ace in a heart contract; East is void and
        // chooses between ruffing and discarding.
        let hands = parse_deal("...3 .2.A. ...4 ...2").unwrap();
        let mut trick = Trick::new(PlayerPosition::South);
        trick.play(PlayerPosition::South, card("SA")).unwrap();
        trick.play(PlayerPosition::West, card("S4")).unwrap();
        trick.play(PlayerPosition::North, card("S5")).unwrap();
        let state = GameState::with_trick(hands, trick, 0.0);
        let oracle = ExhaustiveOracle::default();
        let search = MinimaxSearch::new(TrickEngine::new(Some(Suit::Hearts)), &oracle);

        assert_eq!(state.current_player(), PlayerPosition::East);
        let outcome = search.search(&state, 1).unwrap();
        assert_eq!(outcome.card, card("H2"));
        assert_eq!(outcome.value, -0.5);
    }

    #[test]
    fn last_trick_needs_no_oracle() {
        let hands = parse_deal("... ... 2... 5...").unwrap();
        let mut trick = Trick::new(PlayerPosition::North);
        trick.play(PlayerPosition::North, card("S3")).unwrap();
        trick.play(PlayerPosition::East, card("S4")).unwrap();
        let state = GameState::with_trick(hands, trick, 3.0);
        let search = MinimaxSearch::new(TrickEngine::new(None), &OfflineOracle);

        let outcome = search.search(&state, 1).unwrap();
        assert_eq!(outcome.card, card("S2"));
        assert_eq!(outcome.value, 3.0);
    }

    #[test]
    fn oracle_failure_propagates() {
        let state = south_last_to_play("A2");
        let search = MinimaxSearch::new(TrickEngine::new(None), &OfflineOracle);

        let err = search.search(&state, 1).unwrap_err();
        assert!(matches!(err, SearchError::Oracle(OracleError::Unavailable(_))));
    }

    #[test]
    fn terminal_root_has_no_move() {
        let state = GameState::new(Default::default(), PlayerPosition::North);
        let oracle = ExhaustiveOracle::default();
        let search = MinimaxSearch::new(TrickEngine::new(None), &oracle);

        let err = search.choose_card(&state, 1).unwrap_err();
        assert!(matches!(err, SearchError::NoLegalMoves(PlayerPosition::North)));
    }

    #[test]
    fn search_leaves_input_untouched() {
        let state = south_last_to_play("A2");
        let before = state.clone();
        let oracle = ExhaustiveOracle::default();
        let search = MinimaxSearch::new(TrickEngine::new(None), &oracle);

        let outcome = search.search(&state, 0).unwrap();
        assert_eq!(state, before);
        assert!(outcome.nodes >= 3);
    }
}
