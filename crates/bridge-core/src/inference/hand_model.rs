//! Builds and solves the unseen-hands problem for one decision.
//!
//! For each hidden seat credited with a suit from the auction there are
//! three variables: the number of cards it holds in the suit (`E_H`), how
//! many of those are honours (`E_H_Hon`) and a 0/1 switch that injects the
//! bidding evidence (`E_H_BIDDING`). A seat known to be void in a suit gets
//! its count pinned to zero plus a `_SHOWN` record variable.

use crate::inference::csp::{BinaryFactor, CspError, UnaryFactor, Value, WeightedCsp};
use crate::inference::evidence::BiddingEvidence;
use crate::inference::random::UniformRandomAssigner;
use crate::inference::solver::{Assignment, ConstraintSolver, Solution, SolverOptions};
use crate::model::card::Card;
use crate::model::cardset::CardSet;
use crate::model::player::PlayerPosition;
use crate::model::suit::{Suit, SuitMask};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// What is known about one seat whose cards are not visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiddenSeat {
    pub seat: PlayerPosition,
    /// Cards the seat still holds.
    pub required: usize,
    /// Suit the seat named during the auction, if any.
    pub bid_suit: Option<Suit>,
    pub shown_out: SuitMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSource {
    /// Suit and honour counts came from the solved model.
    Inferred,
    /// The model was unsolvable or its counts could not be dealt; every card
    /// was dealt at random.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct InferredHands {
    pub hands: BTreeMap<PlayerPosition, CardSet>,
    pub source: AssignmentSource,
    pub assignment: Option<Assignment>,
}

#[derive(Debug, Clone)]
pub struct HandInferenceModel {
    pool: CardSet,
    seats: Vec<HiddenSeat>,
    evidence: BiddingEvidence,
    options: SolverOptions,
}

impl HandInferenceModel {
    /// `seats` are taken in order; the first seat to have bid a suit claims
    /// it and later seats bidding the same suit carry no suit evidence.
    pub fn new(
        pool: CardSet,
        seats: impl IntoIterator<Item = HiddenSeat>,
        evidence: BiddingEvidence,
    ) -> Self {
        let mut claimed = SuitMask::EMPTY;
        let seats = seats
            .into_iter()
            .map(|mut hidden| {
                match hidden.bid_suit {
                    Some(suit) if claimed.contains(suit) => hidden.bid_suit = None,
                    Some(suit) => claimed = claimed.with(suit),
                    None => {}
                }
                hidden
            })
            .collect();
        Self {
            pool,
            seats,
            evidence,
            options: SolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pool(&self) -> CardSet {
        self.pool
    }

    pub fn seats(&self) -> &[HiddenSeat] {
        &self.seats
    }

    pub fn claimed_suit(&self, seat: PlayerPosition) -> Option<Suit> {
        self.seats
            .iter()
            .find(|hidden| hidden.seat == seat)
            .and_then(|hidden| hidden.bid_suit)
    }

    pub fn required_counts(&self) -> BTreeMap<PlayerPosition, usize> {
        self.seats
            .iter()
            .map(|hidden| (hidden.seat, hidden.required))
            .collect()
    }

    pub fn count_var(seat: PlayerPosition, suit: Suit) -> String {
        format!("{}_{}", seat.symbol(), suit.symbol())
    }

    pub fn honor_var(seat: PlayerPosition, suit: Suit) -> String {
        format!("{}_Hon", Self::count_var(seat, suit))
    }

    pub fn bidding_var(seat: PlayerPosition, suit: Suit) -> String {
        format!("{}_BIDDING", Self::count_var(seat, suit))
    }

    pub fn shown_var(seat: PlayerPosition, suit: Suit) -> String {
        format!("{}_SHOWN", Self::count_var(seat, suit))
    }

    /// Cards of `suit` in the pool that the hidden seats other than `seat`
    /// cannot hold, either because they are void or because they are full.
    fn forced_to(&self, seat: PlayerPosition, suit: Suit) -> usize {
        let capacity: usize = self
            .seats
            .iter()
            .filter(|other| other.seat != seat && !other.shown_out.contains(suit))
            .map(|other| other.required)
            .sum();
        self.pool.count_suit(suit).saturating_sub(capacity)
    }

    /// Space `hidden` has left for `suit` once the cards of every other suit
    /// that only it can hold are set aside.
    fn room_for(&self, hidden: &HiddenSeat, suit: Suit) -> usize {
        let forced: usize = Suit::ALL
            .into_iter()
            .filter(|other| *other != suit)
            .map(|other| self.forced_to(hidden.seat, other))
            .sum();
        hidden.required.saturating_sub(forced)
    }

    pub fn build_csp(&self) -> Result<WeightedCsp, CspError> {
        let mut csp = WeightedCsp::new();
        let population = self.pool.len() as u32;

        for hidden in &self.seats {
            let Some(suit) = hidden.bid_suit else {
                continue;
            };
            let suit_cards = self.pool.of_suit(suit);
            let in_suit = suit_cards.len();
            let honors = suit_cards.honors().len();

            let count = Self::count_var(hidden.seat, suit);
            let most = hidden.required.min(in_suit) as Value;
            csp.add_variable(count.as_str(), 0..=most)?;
            csp.add_unary_factor(
                &count,
                &UnaryFactor::Hypergeometric {
                    population,
                    marked: in_suit as u32,
                    draws: hidden.required as u32,
                },
            )?;
            let least = self.forced_to(hidden.seat, suit) as Value;
            let room = self.room_for(hidden, suit) as Value;
            if least > 0 || room < most {
                csp.add_unary_factor(
                    &count,
                    &UnaryFactor::Range {
                        min: least,
                        max: room.min(most),
                    },
                )?;
            }

            let honor = Self::honor_var(hidden.seat, suit);
            csp.add_variable(honor.as_str(), 0..=honors as Value)?;
            csp.add_binary_factor(
                &honor,
                &count,
                &BinaryFactor::ConditionalHypergeometric {
                    population: in_suit as u32,
                    marked: honors as u32,
                },
            )?;

            let bidding = Self::bidding_var(hidden.seat, suit);
            csp.add_variable(bidding.as_str(), [0, 1])?;
            csp.add_binary_factor(&bidding, &honor, &self.evidence.honor_factor())?;
            csp.add_binary_factor(&bidding, &count, &self.evidence.length_factor())?;
        }

        for hidden in &self.seats {
            for suit in hidden.shown_out.iter() {
                let count = Self::count_var(hidden.seat, suit);
                if !csp.contains(&count) {
                    csp.add_variable(count.as_str(), [0])?;
                }
                csp.add_unary_factor(&count, &UnaryFactor::Pin(0))?;
                let shown = Self::shown_var(hidden.seat, suit);
                csp.add_variable(shown.as_str(), [0])?;
                csp.add_binary_factor(&shown, &count, &BinaryFactor::ShownOut)?;
            }
        }

        Ok(csp)
    }

    /// Draws one concrete layout of the pool. Solved counts fix how many
    /// cards and honours of each claimed suit the claiming seat gets; the
    /// specific cards and everything else are dealt at random.
    pub fn assign<R: Rng + ?Sized>(&self, rng: &mut R) -> InferredHands {
        let csp = match self.build_csp() {
            Ok(csp) => csp,
            Err(err) => {
                tracing::warn!(
                    target: "bridge_core::inference",
                    error = %err,
                    "hand model construction failed, dealing uniformly"
                );
                return self.fallback(rng);
            }
        };

        let mut solver = ConstraintSolver::new(self.options);
        let solution = solver.solve(&csp);
        let stats = solver.stats();
        tracing::debug!(
            target: "bridge_core::inference",
            variables = csp.len(),
            operations = stats.operations,
            assignments = stats.assignments,
            pruned = stats.pruned,
            solved = solution.is_solved(),
            "hand model solved"
        );

        let Solution::Solved(assignment) = solution else {
            return self.fallback(rng);
        };
        match self.deal_from(&assignment, rng) {
            Some(hands) => InferredHands {
                hands,
                source: AssignmentSource::Inferred,
                assignment: Some(assignment),
            },
            None => {
                tracing::warn!(
                    target: "bridge_core::inference",
                    "solved counts do not fit the pool, dealing uniformly"
                );
                self.fallback(rng)
            }
        }
    }

    /// Uniform deal that still keeps shown-out suits away from their seats
    /// when the pool allows it.
    fn fallback<R: Rng + ?Sized>(&self, rng: &mut R) -> InferredHands {
        let required = self.required_counts();
        let closed: BTreeMap<PlayerPosition, SuitMask> = self
            .seats
            .iter()
            .map(|hidden| (hidden.seat, hidden.shown_out))
            .collect();
        let hands =
            UniformRandomAssigner::assign_respecting_voids(self.pool, &required, &closed, rng)
                .unwrap_or_else(|| UniformRandomAssigner::assign(self.pool, &required, rng));
        InferredHands {
            hands,
            source: AssignmentSource::Fallback,
            assignment: None,
        }
    }

    fn deal_from<R: Rng + ?Sized>(
        &self,
        assignment: &Assignment,
        rng: &mut R,
    ) -> Option<BTreeMap<PlayerPosition, CardSet>> {
        let mut space = self.required_counts();
        let mut closed: BTreeMap<PlayerPosition, SuitMask> = self
            .seats
            .iter()
            .map(|hidden| (hidden.seat, hidden.shown_out))
            .collect();
        let mut hands: BTreeMap<PlayerPosition, CardSet> = self
            .seats
            .iter()
            .map(|hidden| (hidden.seat, CardSet::EMPTY))
            .collect();
        let mut residual = self.pool;

        for hidden in &self.seats {
            let Some(suit) = hidden.bid_suit else {
                continue;
            };
            let count = usize::try_from(assignment.get(&Self::count_var(hidden.seat, suit))?).ok()?;
            let honors =
                usize::try_from(assignment.get(&Self::honor_var(hidden.seat, suit))?).ok()?;

            let suit_cards = self.pool.of_suit(suit);
            let honor_cards = suit_cards.honors();
            let chosen_honors = pick(honor_cards, honors, rng)?;
            let chosen_plain = pick(suit_cards.difference(honor_cards), count.checked_sub(honors)?, rng)?;
            let chosen = chosen_honors.union(chosen_plain);

            let free = space.get_mut(&hidden.seat)?;
            *free = free.checked_sub(chosen.len())?;
            let hand = hands.get_mut(&hidden.seat)?;
            *hand = hand.union(chosen);
            residual = residual.difference(chosen);
            let mask = closed.entry(hidden.seat).or_default();
            *mask = mask.with(suit);
        }

        let rest = UniformRandomAssigner::assign_respecting_voids(residual, &space, &closed, rng)?;
        for (seat, cards) in rest {
            let hand = hands.get_mut(&seat)?;
            *hand = hand.union(cards);
        }
        Some(hands)
    }
}

/// `count` cards chosen uniformly from `from`, `None` if it holds fewer.
fn pick<R: Rng + ?Sized>(from: CardSet, count: usize, rng: &mut R) -> Option<CardSet> {
    if count > from.len() {
        return None;
    }
    let cards: Vec<Card> = from.to_vec();
    Some(cards.choose_multiple(rng, count).copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::stats::{choose, hypergeometric};
    use crate::model::cardset::parse_deal;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const DEAL: &str = "52.J76.KQJ874.T9 AK3.T9854.T.K832 Q976.Q.9632.QJ74 JT84.AK32.A5.A65";

    fn north_east_pool() -> CardSet {
        let deal = parse_deal(DEAL).unwrap();
        deal[PlayerPosition::North.index()].union(deal[PlayerPosition::East.index()])
    }

    fn hidden(seat: PlayerPosition, required: usize, bid_suit: Option<Suit>) -> HiddenSeat {
        HiddenSeat {
            seat,
            required,
            bid_suit,
            shown_out: SuitMask::EMPTY,
        }
    }

    fn claims() -> HandInferenceModel {
        HandInferenceModel::new(
            north_east_pool(),
            [
                hidden(PlayerPosition::East, 13, Some(Suit::Hearts)),
                hidden(PlayerPosition::North, 13, Some(Suit::Diamonds)),
            ],
            BiddingEvidence::default(),
        )
    }

    fn assert_partition(pool: CardSet, hands: &BTreeMap<PlayerPosition, CardSet>) {
        let mut union = CardSet::EMPTY;
        for hand in hands.values() {
            assert!(union.is_disjoint(*hand));
            union = union.union(*hand);
        }
        assert_eq!(union, pool);
    }

    #[test]
    fn pool_suit_and_honor_counts() {
        let pool = north_east_pool();
        let counts: Vec<usize> = Suit::ALL.iter().map(|s| pool.count_suit(*s)).collect();
        assert_eq!(counts, vec![5, 8, 7, 6]);
        let honors: Vec<usize> = Suit::ALL
            .iter()
            .map(|s| pool.of_suit(*s).honors().len())
            .collect();
        assert_eq!(honors, vec![2, 1, 3, 1]);
    }

    #[test]
    fn count_variable_domain_and_prior() {
        let csp = claims().build_csp().unwrap();
        let east_hearts = csp.variable("E_H").unwrap();
        assert_eq!(east_hearts.domain(), (0..=8).collect::<Vec<_>>().as_slice());
        let expected = choose(18, 13) / choose(26, 13);
        assert!((east_hearts.unary_weights()[0] - expected).abs() < 1e-12);
        assert_eq!(csp.variable("N_D").unwrap().domain().len(), 8);
        assert_eq!(csp.variable("E_H_Hon").unwrap().domain(), &[0, 1]);
    }

    #[test]
    fn bidding_evidence_factors() {
        let csp = claims().build_csp().unwrap();
        assert_eq!(csp.binary_weight("E_H_BIDDING", 1, "E_H_Hon", 0), Some(37.0));
        assert_eq!(csp.binary_weight("E_H_BIDDING", 1, "E_H", 1), Some(10.0));
        assert_eq!(csp.binary_weight("E_H_BIDDING", 0, "E_H", 5), Some(0.0));
    }

    #[test]
    fn later_bid_of_claimed_suit_is_ignored() {
        let model = HandInferenceModel::new(
            north_east_pool(),
            [
                hidden(PlayerPosition::East, 13, Some(Suit::Hearts)),
                hidden(PlayerPosition::North, 13, Some(Suit::Hearts)),
            ],
            BiddingEvidence::default(),
        );
        assert_eq!(model.claimed_suit(PlayerPosition::East), Some(Suit::Hearts));
        assert_eq!(model.claimed_suit(PlayerPosition::North), None);
        let csp = model.build_csp().unwrap();
        assert!(csp.contains("E_H"));
        assert!(!csp.contains("N_H"));
    }

    #[test]
    fn inferred_hands_follow_solved_counts() {
        let model = claims();
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = model.assign(&mut rng);
            assert_eq!(result.source, AssignmentSource::Inferred);
            assert_eq!(result.hands[&PlayerPosition::East].len(), 13);
            assert_eq!(result.hands[&PlayerPosition::North].len(), 13);
            assert_partition(model.pool(), &result.hands);

            let assignment = result.assignment.as_ref().unwrap();
            let hearts = assignment.get("E_H").unwrap() as usize;
            let honors = assignment.get("E_H_Hon").unwrap() as usize;
            let east = result.hands[&PlayerPosition::East];
            assert_eq!(east.count_suit(Suit::Hearts), hearts);
            assert_eq!(east.of_suit(Suit::Hearts).honors().len(), honors);
            let diamonds = assignment.get("N_D").unwrap() as usize;
            assert_eq!(
                result.hands[&PlayerPosition::North].count_suit(Suit::Diamonds),
                diamonds
            );
        }
    }

    #[test]
    fn shown_out_suit_is_pinned_and_respected() {
        let mut east = hidden(PlayerPosition::East, 13, None);
        east.shown_out = SuitMask::EMPTY.with(Suit::Spades);
        let model = HandInferenceModel::new(
            north_east_pool(),
            [east, hidden(PlayerPosition::North, 13, Some(Suit::Diamonds))],
            BiddingEvidence::default(),
        );
        let csp = model.build_csp().unwrap();
        assert_eq!(csp.variable("E_S").unwrap().domain(), &[0]);
        assert!(csp.contains("E_S_SHOWN"));

        let mut rng = StdRng::seed_from_u64(5);
        let result = model.assign(&mut rng);
        assert_eq!(result.source, AssignmentSource::Inferred);
        assert!(!result.hands[&PlayerPosition::East].has_suit(Suit::Spades));
        assert_eq!(result.hands[&PlayerPosition::North].count_suit(Suit::Spades), 5);
        assert_partition(model.pool(), &result.hands);
    }

    #[test]
    fn void_partner_forces_the_suit_onto_the_claimant() {
        let mut north = hidden(PlayerPosition::North, 13, None);
        north.shown_out = SuitMask::EMPTY.with(Suit::Hearts);
        let model = HandInferenceModel::new(
            north_east_pool(),
            [hidden(PlayerPosition::East, 13, Some(Suit::Hearts)), north],
            BiddingEvidence::default(),
        );
        let result = model.assign(&mut StdRng::seed_from_u64(2));
        let assignment = result.assignment.unwrap();
        assert_eq!(assignment.get("E_H"), Some(8));
        assert_eq!(result.hands[&PlayerPosition::East].count_suit(Suit::Hearts), 8);
    }

    #[test]
    fn degenerate_evidence_falls_back_to_uniform() {
        let silent = BiddingEvidence {
            honor_counts: BTreeMap::new(),
            length_counts: BTreeMap::new(),
            smoothing: 0.0,
        };
        let model = HandInferenceModel::new(
            north_east_pool(),
            [
                hidden(PlayerPosition::East, 10, Some(Suit::Hearts)),
                hidden(PlayerPosition::North, 16, None),
            ],
            silent,
        );
        let result = model.assign(&mut StdRng::seed_from_u64(11));
        assert_eq!(result.source, AssignmentSource::Fallback);
        assert!(result.assignment.is_none());
        assert_eq!(result.hands[&PlayerPosition::East].len(), 10);
        assert_eq!(result.hands[&PlayerPosition::North].len(), 16);
        assert_partition(model.pool(), &result.hands);
    }

    #[test]
    fn no_evidence_is_a_plain_random_deal() {
        let model = HandInferenceModel::new(
            north_east_pool(),
            [
                hidden(PlayerPosition::East, 13, None),
                hidden(PlayerPosition::North, 13, None),
            ],
            BiddingEvidence::default(),
        );
        assert!(model.build_csp().unwrap().is_empty());
        let result = model.assign(&mut StdRng::seed_from_u64(4));
        assert_eq!(result.source, AssignmentSource::Inferred);
        assert_eq!(result.hands[&PlayerPosition::East].len(), 13);
        assert_partition(model.pool(), &result.hands);
    }

    fn majors_pool() -> CardSet {
        "32.32..".parse().unwrap()
    }

    fn void_north_claiming_east() -> HandInferenceModel {
        let mut north = hidden(PlayerPosition::North, 2, None);
        north.shown_out = SuitMask::EMPTY.with(Suit::Hearts);
        HandInferenceModel::new(
            majors_pool(),
            [hidden(PlayerPosition::East, 2, Some(Suit::Spades)), north],
            BiddingEvidence::default(),
        )
    }

    #[test]
    fn claim_leaves_room_for_suits_forced_in_by_other_voids() {
        let csp = void_north_claiming_east().build_csp().unwrap();
        let weights = csp.variable("E_S").unwrap().unary_weights();
        assert!(weights[0] > 0.0);
        assert!(weights[1..].iter().all(|w| *w == 0.0));
    }

    #[test]
    fn shown_out_pin_and_claim_on_different_seats() {
        let model = void_north_claiming_east();
        for seed in 0..200 {
            let result = model.assign(&mut StdRng::seed_from_u64(seed));
            assert_eq!(result.source, AssignmentSource::Inferred);
            let assignment = result.assignment.as_ref().unwrap();
            assert_eq!(assignment.get("E_S"), Some(0));
            assert_eq!(assignment.get("N_H"), Some(0));

            let north = result.hands[&PlayerPosition::North];
            let east = result.hands[&PlayerPosition::East];
            assert!(!north.has_suit(Suit::Hearts), "seed {seed}: north {north}");
            assert_eq!(north.len(), 2);
            assert_eq!(east.count_suit(Suit::Hearts), 2);
            assert_partition(model.pool(), &result.hands);
        }
    }

    #[test]
    fn undealable_voids_are_labelled_fallback() {
        let mut north = hidden(PlayerPosition::North, 2, None);
        north.shown_out = SuitMask::EMPTY.with(Suit::Hearts);
        let mut east = hidden(PlayerPosition::East, 2, None);
        east.shown_out = SuitMask::EMPTY.with(Suit::Hearts);
        let model =
            HandInferenceModel::new(majors_pool(), [east, north], BiddingEvidence::default());
        for seed in 0..20 {
            let result = model.assign(&mut StdRng::seed_from_u64(seed));
            assert_eq!(result.source, AssignmentSource::Fallback);
            assert!(result.assignment.is_none());
            assert_eq!(result.hands[&PlayerPosition::North].len(), 2);
            assert_eq!(result.hands[&PlayerPosition::East].len(), 2);
            assert_partition(model.pool(), &result.hands);
        }
    }

    #[test]
    fn zero_evidence_suit_lengths_match_uniform_deal() {
        let pool = north_east_pool();
        let model = HandInferenceModel::new(
            pool,
            [
                hidden(PlayerPosition::East, 13, None),
                hidden(PlayerPosition::North, 13, None),
            ],
            BiddingEvidence::default(),
        );
        let required = model.required_counts();
        let spades = pool.count_suit(Suit::Spades);
        let trials = 3000;
        let mut modelled = vec![0usize; spades + 1];
        let mut uniform = vec![0usize; spades + 1];
        for seed in 0..trials {
            let result = model.assign(&mut StdRng::seed_from_u64(seed));
            modelled[result.hands[&PlayerPosition::East].count_suit(Suit::Spades)] += 1;
            let mut rng = StdRng::seed_from_u64(seed);
            let plain = UniformRandomAssigner::assign(pool, &required, &mut rng);
            uniform[plain[&PlayerPosition::East].count_suit(Suit::Spades)] += 1;
        }

        for length in 0..=spades {
            let expected = hypergeometric(26, spades as i64, 13, length as i64);
            let seen = modelled[length] as f64 / trials as f64;
            let baseline = uniform[length] as f64 / trials as f64;
            assert!((seen - expected).abs() < 0.035, "length {length}: {seen} vs {expected}");
            assert!((seen - baseline).abs() < 0.05, "length {length}: {seen} vs {baseline}");
            if expected > 0.0 {
                assert!(modelled[length] > 0, "length {length} never dealt");
            }
        }
    }
}
