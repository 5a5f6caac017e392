use super::{DoubleDummyOracle, OracleError, OracleRequest, OracleSolution, ScoredCard, in_play};
use crate::model::cardset::CardSet;
use crate::model::player::{PlayerPosition, Side};
use crate::model::suit::Suit;
use crate::model::trick::{Play, legal_plays, winning_play};
use bridge_solver::{Cards, CutoffCache, Hands, NOTRUMP, PartialTrick, PatternCache, Solver};

const CACHE_BITS: usize = 16;

/// Double-dummy oracle for positions of any size, backed by the
/// `bridge-solver` alpha-beta search.
///
/// The solver reports North-South tricks for a whole position, so each
/// candidate group is scored by playing it and solving what remains.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullDealOracle;

impl FullDealOracle {
    pub fn new() -> Self {
        Self
    }
}

impl DoubleDummyOracle for FullDealOracle {
    fn solve(&self, request: &OracleRequest) -> Result<OracleSolution, OracleError> {
        request.validate()?;

        let mover = request.seat_to_play();
        let lead = request.current_trick.first().map(|play| play.card.suit);
        let candidates = legal_plays(request.remaining[mover.index()], lead);
        let tricks_left = tricks_left(request);
        let trump = solver_trump(request.trump);

        let universe = in_play(&request.remaining, &request.current_trick);
        let mut cards = Vec::new();
        for group in candidates.equivalence_classes(universe) {
            let Some(card) = group.first() else {
                continue;
            };
            let mut hands = request.remaining;
            hands[mover.index()].remove(card);
            let mut trick = request.current_trick.clone();
            trick.push(Play {
                position: mover,
                card,
            });

            let north_south = if trick.len() == 4 {
                let winner = winning_play(&trick, request.trump)
                    .map(|play| play.position)
                    .unwrap_or(request.leader);
                let won = u8::from(winner.side() == Side::NorthSouth);
                won + solve_from_lead(&hands, trump, winner)
            } else {
                solve_mid_trick(&hands, trump, &trick)?
            };

            let tricks = match mover.side() {
                Side::NorthSouth => north_south,
                Side::EastWest => tricks_left.saturating_sub(north_south),
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
            candidates = cards.len(),
            tricks_left,
            "full-deal solve complete"
        );
        Ok(OracleSolution { cards })
    }

    /// One solve of the whole position instead of one per candidate.
    fn best_tricks(&self, request: &OracleRequest) -> Result<u8, OracleError> {
        request.validate()?;
        let trump = solver_trump(request.trump);
        let north_south = if request.current_trick.is_empty() {
            solve_from_lead(&request.remaining, trump, request.leader)
        } else {
            solve_mid_trick(&request.remaining, trump, &request.current_trick)?
        };
        Ok(match request.seat_to_play().side() {
            Side::NorthSouth => north_south,
            Side::EastWest => tricks_left(request).saturating_sub(north_south),
        })
    }
}

/// Tricks still to be won, counting the one in progress.
fn tricks_left(request: &OracleRequest) -> u8 {
    request
        .remaining
        .iter()
        .map(|hand| hand.len())
        .max()
        .unwrap_or(0) as u8
}

fn solver_trump(trump: Option<Suit>) -> usize {
    trump.map_or(NOTRUMP, Suit::index)
}

/// The solver seats West, North, East, South as 0..3.
fn solver_seat(seat: PlayerPosition) -> usize {
    (seat.index() + 1) % 4
}

/// Card codes already share the solver's layout: suits S,H,D,C and the ace
/// at the bottom of each thirteen-card block.
fn solver_hands(hands: &[CardSet; 4]) -> Hands {
    let mut solver = Hands::new();
    for seat in PlayerPosition::LOOP {
        *solver.hand_mut(solver_seat(seat)) = Cards::from_bits(hands[seat.index()].bits());
    }
    solver
}

fn solve_from_lead(hands: &[CardSet; 4], trump: usize, leader: PlayerPosition) -> u8 {
    if hands.iter().all(|hand| hand.is_empty()) {
        return 0;
    }
    let mut cutoff = CutoffCache::new(CACHE_BITS);
    let mut pattern = PatternCache::new(CACHE_BITS);
    Solver::new(solver_hands(hands), trump, solver_seat(leader))
        .solve_with_caches(&mut cutoff, &mut pattern)
}

fn solve_mid_trick(hands: &[CardSet; 4], trump: usize, trick: &[Play]) -> Result<u8, OracleError> {
    let mut partial = PartialTrick::new();
    for play in trick {
        partial.add(usize::from(play.card.code()), solver_seat(play.position));
    }
    let solver = Solver::new_mid_trick(solver_hands(hands), trump, &partial).ok_or_else(|| {
        OracleError::InvalidPosition(format!("{} cards in the trick", trick.len()))
    })?;
    let mut cutoff = CutoffCache::new(CACHE_BITS);
    let mut pattern = PatternCache::new(CACHE_BITS);
    Ok(solver.solve_mid_trick(&mut cutoff, &mut pattern, &partial))
}
