use crate::model::card::Card;
use crate::model::cardset::CardSet;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL.iter().copied() {
            for rank in Rank::DESCENDING.iter().copied() {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    pub fn shuffled<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::standard();
        deck.cards.shuffle(rng);
        deck
    }

    pub fn shuffled_with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::shuffled(&mut rng)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Splits the deck into four thirteen-card hands indexed by
    /// [`PlayerPosition::index`](crate::model::player::PlayerPosition::index).
    pub fn deal(&self) -> [CardSet; 4] {
        let mut hands = [CardSet::EMPTY; 4];
        for (i, card) in self.cards.iter().enumerate() {
            hands[i % 4].insert(*card);
        }
        hands
    }
}
