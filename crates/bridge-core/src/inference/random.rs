use crate::model::cardset::CardSet;
use crate::model::player::PlayerPosition;
use crate::model::suit::{Suit, SuitMask};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Deals a card pool at random into hands of exact sizes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformRandomAssigner;

impl UniformRandomAssigner {
    /// Shuffles `pool` and deals `required[seat]` cards to each seat in seat
    /// order. The counts must sum to the pool size; a shortfall leaves later
    /// seats short and any excess cards are left undealt.
    pub fn assign<R: Rng + ?Sized>(
        pool: CardSet,
        required: &BTreeMap<PlayerPosition, usize>,
        rng: &mut R,
    ) -> BTreeMap<PlayerPosition, CardSet> {
        let mut cards = pool.to_vec();
        cards.shuffle(rng);
        let mut remaining = cards.into_iter();
        required
            .iter()
            .map(|(seat, count)| (*seat, remaining.by_ref().take(*count).collect()))
            .collect()
    }

    /// Like [`UniformRandomAssigner::assign`], but never gives a seat a card
    /// of a suit in its `closed` mask. Each card goes to a random open seat
    /// weighted by its free space, restricted to seats that leave the rest
    /// of the pool placeable. Returns `None` when no such deal exists.
    pub fn assign_respecting_voids<R: Rng + ?Sized>(
        pool: CardSet,
        required: &BTreeMap<PlayerPosition, usize>,
        closed: &BTreeMap<PlayerPosition, SuitMask>,
        rng: &mut R,
    ) -> Option<BTreeMap<PlayerPosition, CardSet>> {
        let mask_of = |seat: &PlayerPosition| closed.get(seat).copied().unwrap_or_default();
        let mut left = [0usize; 4];
        for suit in Suit::ALL {
            left[suit.index()] = pool.count_suit(suit);
        }
        let mut space = required.clone();
        if !placeable(&left, &space, &mask_of) {
            tracing::debug!(
                target: "bridge_core::inference",
                pool = pool.len(),
                "shown-out suits cannot be honoured"
            );
            return None;
        }

        let mut cards = pool.to_vec();
        cards.shuffle(rng);
        let mut hands: BTreeMap<PlayerPosition, CardSet> =
            required.keys().map(|seat| (*seat, CardSet::EMPTY)).collect();

        for card in cards {
            let suit = card.suit.index();
            left[suit] -= 1;
            let mut eligible: Vec<(PlayerPosition, usize)> = Vec::with_capacity(space.len());
            for (seat, free) in &space {
                if *free == 0 || mask_of(seat).contains(card.suit) {
                    continue;
                }
                let mut trial = space.clone();
                trial.insert(*seat, free - 1);
                if placeable(&left, &trial, &mask_of) {
                    eligible.push((*seat, *free));
                }
            }

            let total: usize = eligible.iter().map(|(_, free)| free).sum();
            if total == 0 {
                return None;
            }
            let mut pick = rng.gen_range(0..total);
            for (seat, free) in eligible {
                if pick < free {
                    hands.entry(seat).or_default().insert(card);
                    if let Some(slot) = space.get_mut(&seat) {
                        *slot -= 1;
                    }
                    break;
                }
                pick -= free;
            }
        }
        Some(hands)
    }
}

/// Hall's condition for dealing `left[suit]` cards into `space`: every set
/// of suits fits into the free space of the seats open to at least one of
/// them.
fn placeable(
    left: &[usize; 4],
    space: &BTreeMap<PlayerPosition, usize>,
    mask_of: &impl Fn(&PlayerPosition) -> SuitMask,
) -> bool {
    (1u8..16).all(|subset| {
        let suits: Vec<Suit> = Suit::ALL
            .into_iter()
            .filter(|suit| subset & (1 << suit.index()) != 0)
            .collect();
        let cards: usize = suits.iter().map(|suit| left[suit.index()]).sum();
        let room: usize = space
            .iter()
            .filter(|(seat, _)| {
                let mask = mask_of(seat);
                suits.iter().any(|suit| !mask.contains(*suit))
            })
            .map(|(_, free)| *free)
            .sum();
        cards <= room
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cardset::parse_deal;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const DEAL: &str = "AJ4.T7.AT652.KJ2 K73.A985432.Q9.7 985..KJ84.AQT654 QT62.KQJ6.73.983";

    fn east_west_pool() -> CardSet {
        let deal = parse_deal(DEAL).unwrap();
        deal[PlayerPosition::East.index()].union(deal[PlayerPosition::West.index()])
    }

    fn counts(pairs: &[(PlayerPosition, usize)]) -> BTreeMap<PlayerPosition, usize> {
        pairs.iter().copied().collect()
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
    fn deals_exact_counts_and_partitions_pool() {
        let pool = east_west_pool();
        let required = counts(&[(PlayerPosition::East, 13), (PlayerPosition::West, 13)]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let hands = UniformRandomAssigner::assign(pool, &required, &mut rng);
            assert_eq!(hands[&PlayerPosition::East].len(), 13);
            assert_eq!(hands[&PlayerPosition::West].len(), 13);
            assert_partition(pool, &hands);
        }
    }

    #[test]
    fn uneven_counts_are_respected() {
        let pool = east_west_pool();
        let required = counts(&[(PlayerPosition::North, 10), (PlayerPosition::East, 16)]);
        let mut rng = StdRng::seed_from_u64(3);
        let hands = UniformRandomAssigner::assign(pool, &required, &mut rng);
        assert_eq!(hands[&PlayerPosition::North].len(), 10);
        assert_eq!(hands[&PlayerPosition::East].len(), 16);
        assert_partition(pool, &hands);
    }

    #[test]
    fn same_seed_same_deal() {
        let pool = east_west_pool();
        let required = counts(&[(PlayerPosition::East, 13), (PlayerPosition::West, 13)]);
        let a = UniformRandomAssigner::assign(pool, &required, &mut StdRng::seed_from_u64(9));
        let b = UniformRandomAssigner::assign(pool, &required, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn voids_are_respected_when_possible() {
        let pool = east_west_pool();
        let required = counts(&[(PlayerPosition::East, 13), (PlayerPosition::West, 13)]);
        let closed = BTreeMap::from([(PlayerPosition::East, SuitMask::EMPTY.with(Suit::Spades))]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let hands =
                UniformRandomAssigner::assign_respecting_voids(pool, &required, &closed, &mut rng)
                    .unwrap();
            assert!(!hands[&PlayerPosition::East].has_suit(Suit::Spades));
            assert_eq!(hands[&PlayerPosition::East].len(), 13);
            assert_eq!(hands[&PlayerPosition::West].len(), 13);
            assert_partition(pool, &hands);
        }
    }

    #[test]
    fn impossible_voids_are_reported() {
        let pool = east_west_pool();
        let required = counts(&[(PlayerPosition::East, 13), (PlayerPosition::West, 13)]);
        let both = SuitMask::EMPTY.with(Suit::Hearts);
        let closed = BTreeMap::from([(PlayerPosition::East, both), (PlayerPosition::West, both)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(
            UniformRandomAssigner::assign_respecting_voids(pool, &required, &closed, &mut rng)
                .is_none()
        );
    }

    #[test]
    fn voids_on_two_seats_squeeze_the_third() {
        // West is out of both majors and East out of spades, so the spades
        // can only go north.
        let pool: CardSet = "32.32.2.2".parse().unwrap();
        let required = counts(&[
            (PlayerPosition::North, 2),
            (PlayerPosition::East, 2),
            (PlayerPosition::West, 2),
        ]);
        let closed = BTreeMap::from([
            (PlayerPosition::North, SuitMask::EMPTY.with(Suit::Hearts)),
            (PlayerPosition::East, SuitMask::EMPTY.with(Suit::Spades)),
            (PlayerPosition::West, SuitMask::EMPTY.with(Suit::Spades).with(Suit::Hearts)),
        ]);
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let hands =
                UniformRandomAssigner::assign_respecting_voids(pool, &required, &closed, &mut rng)
                    .unwrap();
            assert_eq!(hands[&PlayerPosition::North].of_suit(Suit::Spades).len(), 2);
            assert_eq!(hands[&PlayerPosition::East].of_suit(Suit::Hearts).len(), 2);
            assert_eq!(hands[&PlayerPosition::West].len(), 2);
            assert_partition(pool, &hands);
        }
    }

    #[test]
    fn more_cards_than_space_is_reported() {
        let pool = east_west_pool();
        let required = counts(&[(PlayerPosition::East, 13), (PlayerPosition::West, 12)]);
        let open = BTreeMap::new();
        let mut rng = StdRng::seed_from_u64(2);
        assert!(
            UniformRandomAssigner::assign_respecting_voids(pool, &required, &open, &mut rng)
                .is_none()
        );
    }
}
