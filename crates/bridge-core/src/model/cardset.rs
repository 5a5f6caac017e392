use crate::model::ParseError;
use crate::model::card::Card;
use crate::model::player::PlayerPosition;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use std::str::FromStr;

const SUIT_BITS: u64 = (1 << 13) - 1;
const DECK_BITS: u64 = (1 << 52) - 1;

/// Set of cards keyed by card code. Iterates in ascending code order, which is
/// spades first and, within a suit, highest rank first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CardSet(u64);

impl CardSet {
    pub const EMPTY: CardSet = CardSet(0);
    pub const FULL: CardSet = CardSet(DECK_BITS);

    pub const fn new() -> Self {
        Self::EMPTY
    }

    pub const fn from_bits(bits: u64) -> Self {
        CardSet(bits & DECK_BITS)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn insert(&mut self, card: Card) -> bool {
        let fresh = !self.contains(card);
        self.0 |= 1u64 << card.code();
        fresh
    }

    pub fn remove(&mut self, card: Card) -> bool {
        let present = self.contains(card);
        self.0 &= !(1u64 << card.code());
        present
    }

    pub const fn contains(self, card: Card) -> bool {
        self.0 & (1u64 << card.code()) != 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: CardSet) -> CardSet {
        CardSet(self.0 | other.0)
    }

    pub const fn intersection(self, other: CardSet) -> CardSet {
        CardSet(self.0 & other.0)
    }

    pub const fn difference(self, other: CardSet) -> CardSet {
        CardSet(self.0 & !other.0)
    }

    pub const fn complement(self) -> CardSet {
        CardSet(!self.0 & DECK_BITS)
    }

    pub const fn is_disjoint(self, other: CardSet) -> bool {
        self.0 & other.0 == 0
    }

    pub const fn whole_suit(suit: Suit) -> CardSet {
        CardSet(SUIT_BITS << (suit as u64 * 13))
    }

    pub const fn of_suit(self, suit: Suit) -> CardSet {
        CardSet(self.0 & Self::whole_suit(suit).0)
    }

    pub const fn count_suit(self, suit: Suit) -> usize {
        self.of_suit(suit).len()
    }

    pub const fn has_suit(self, suit: Suit) -> bool {
        !self.of_suit(suit).is_empty()
    }

    /// Aces, kings, queens and jacks of every suit.
    pub fn honors(self) -> CardSet {
        self.iter().filter(|card| card.rank.is_honor()).collect()
    }

    /// The card with the lowest code: the highest rank of the first suit held.
    pub fn first(self) -> Option<Card> {
        if self.0 == 0 {
            return None;
        }
        Card::from_code(self.0.trailing_zeros() as u8)
    }

    /// The card with the highest code: the lowest rank of the last suit held.
    pub fn last(self) -> Option<Card> {
        if self.0 == 0 {
            return None;
        }
        Card::from_code(63 - self.0.leading_zeros() as u8)
    }

    pub fn iter(self) -> CardSetIter {
        CardSetIter(self.0)
    }

    pub fn to_vec(self) -> Vec<Card> {
        self.iter().collect()
    }

    /// Groups the cards of `self` into runs that are equivalent for play:
    /// two cards of one suit are equivalent when every card ranked between
    /// them is either also in `self` or already out of play (not in
    /// `in_play`). Each group is returned with its highest card first.
    pub fn equivalence_classes(self, in_play: CardSet) -> Vec<CardSet> {
        let mut groups = Vec::new();
        let mut current = CardSet::EMPTY;
        let mut previous: Option<Card> = None;
        for card in self.iter() {
            let extends = previous.is_some_and(|prev| {
                prev.suit == card.suit
                    && (prev.code() + 1..card.code())
                        .filter_map(Card::from_code)
                        .all(|between| !in_play.contains(between) || self.contains(between))
            });
            if !extends && !current.is_empty() {
                groups.push(current);
                current = CardSet::EMPTY;
            }
            current.insert(card);
            previous = Some(card);
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }
}

pub struct CardSetIter(u64);

impl Iterator for CardSetIter {
    type Item = Card;

    fn next(&mut self) -> Option<Card> {
        if self.0 == 0 {
            return None;
        }
        let code = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Card::from_code(code)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.0.count_ones() as usize;
        (len, Some(len))
    }
}

impl IntoIterator for CardSet {
    type Item = Card;
    type IntoIter = CardSetIter;

    fn into_iter(self) -> CardSetIter {
        self.iter()
    }
}

impl FromIterator<Card> for CardSet {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut set = CardSet::EMPTY;
        for card in iter {
            set.insert(card);
        }
        set
    }
}

/// Hand notation: four dot-separated suit groups in S.H.D.C order,
/// e.g. `AJ4.T7.AT652.KJ2`. A void suit is an empty group.
impl fmt::Display for CardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, suit) in Suit::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            for card in self.of_suit(*suit) {
                write!(f, "{}", card.rank)?;
            }
        }
        Ok(())
    }
}

impl FromStr for CardSet {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<&str> = s.trim().split('.').collect();
        if groups.len() != 4 {
            return Err(ParseError::Hand(s.to_string()));
        }
        let mut set = CardSet::EMPTY;
        for (suit, group) in Suit::ALL.iter().zip(groups) {
            for symbol in group.chars() {
                let rank = Rank::from_symbol(symbol).ok_or_else(|| ParseError::Hand(s.to_string()))?;
                if !set.insert(Card::new(rank, *suit)) {
                    return Err(ParseError::DuplicateCard(Card::new(rank, *suit)));
                }
            }
        }
        Ok(set)
    }
}

/// Parses four space-separated hands. An optional `<seat>:` prefix names the
/// seat holding the first hand (default north); the rest follow clockwise.
/// The result is indexed by [`PlayerPosition::index`].
pub fn parse_deal(text: &str) -> Result<[CardSet; 4], ParseError> {
    let trimmed = text.trim();
    let (first, body) = match trimmed.split_once(':') {
        Some((seat, body)) => (seat.parse::<PlayerPosition>()?, body),
        None => (PlayerPosition::North, trimmed),
    };
    let hands: Vec<&str> = body.split_whitespace().collect();
    if hands.len() != 4 {
        return Err(ParseError::Deal(text.to_string()));
    }

    let mut deal = [CardSet::EMPTY; 4];
    let mut seen = CardSet::EMPTY;
    for (offset, hand) in hands.iter().enumerate() {
        let cards: CardSet = hand.parse()?;
        if let Some(card) = cards.intersection(seen).first() {
            return Err(ParseError::DuplicateCard(card));
        }
        seen = seen.union(cards);
        deal[first.next_k(offset).index()] = cards;
    }
    Ok(deal)
}

/// Formats holdings as `<first>:<hand> <hand> <hand> <hand>`, clockwise from
/// `first`.
pub fn format_deal(hands: &[CardSet; 4], first: PlayerPosition) -> String {
    let body = (0..4)
        .map(|offset| hands[first.next_k(offset).index()].to_string())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}:{}", first.symbol(), body)
}
