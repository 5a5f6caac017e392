use crate::model::ParseError;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlayerPosition {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl PlayerPosition {
    pub const LOOP: [PlayerPosition; 4] = [
        PlayerPosition::North,
        PlayerPosition::East,
        PlayerPosition::South,
        PlayerPosition::West,
    ];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PlayerPosition::North),
            1 => Some(PlayerPosition::East),
            2 => Some(PlayerPosition::South),
            3 => Some(PlayerPosition::West),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn next(self) -> PlayerPosition {
        self.next_k(1)
    }

    pub const fn previous(self) -> PlayerPosition {
        self.next_k(3)
    }

    pub const fn opposite(self) -> PlayerPosition {
        self.next_k(2)
    }

    pub const fn next_k(self, k: usize) -> PlayerPosition {
        match (self as usize + k) % 4 {
            0 => PlayerPosition::North,
            1 => PlayerPosition::East,
            2 => PlayerPosition::South,
            _ => PlayerPosition::West,
        }
    }

    pub const fn side(self) -> Side {
        match self {
            PlayerPosition::North | PlayerPosition::South => Side::NorthSouth,
            PlayerPosition::East | PlayerPosition::West => Side::EastWest,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            PlayerPosition::North => 'N',
            PlayerPosition::East => 'E',
            PlayerPosition::South => 'S',
            PlayerPosition::West => 'W',
        }
    }

    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'N' | 'n' => Some(PlayerPosition::North),
            'E' | 'e' => Some(PlayerPosition::East),
            'S' | 's' => Some(PlayerPosition::South),
            'W' | 'w' => Some(PlayerPosition::West),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayerPosition::North => "North",
            PlayerPosition::East => "East",
            PlayerPosition::South => "South",
            PlayerPosition::West => "West",
        };
        f.write_str(label)
    }
}

impl FromStr for PlayerPosition {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let seat = match trimmed.to_ascii_lowercase().as_str() {
            "n" | "north" => PlayerPosition::North,
            "e" | "east" => PlayerPosition::East,
            "s" | "south" => PlayerPosition::South,
            "w" | "west" => PlayerPosition::West,
            _ => return Err(ParseError::Seat(trimmed.to_string())),
        };
        Ok(seat)
    }
}

/// A partnership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    NorthSouth,
    EastWest,
}

impl Side {
    pub const fn opponent(self) -> Side {
        match self {
            Side::NorthSouth => Side::EastWest,
            Side::EastWest => Side::NorthSouth,
        }
    }
}

/// Whose turn it is to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerTurn(PlayerPosition);

impl PlayerTurn {
    pub const fn new(seat: PlayerPosition) -> Self {
        Self(seat)
    }

    pub const fn seat(self) -> PlayerPosition {
        self.0
    }

    pub const fn next(self) -> PlayerTurn {
        PlayerTurn(self.0.next())
    }

    pub const fn prev(self) -> PlayerTurn {
        PlayerTurn(self.0.previous())
    }

    pub const fn next_k(self, k: usize) -> PlayerTurn {
        PlayerTurn(self.0.next_k(k))
    }
}

impl From<PlayerPosition> for PlayerTurn {
    fn from(seat: PlayerPosition) -> Self {
        PlayerTurn(seat)
    }
}

#[cfg(test)]
mod tests {
    use super::{PlayerPosition, PlayerTurn, Side};

    #[test]
    fn next_wraps_around() {
        assert_eq!(PlayerPosition::West.next(), PlayerPosition::North);
    }

    #[test]
    fn previous_wraps_around() {
        assert_eq!(PlayerPosition::North.previous(), PlayerPosition::West);
    }

    #[test]
    fn opposite_is_partner() {
        assert_eq!(PlayerPosition::East.opposite(), PlayerPosition::West);
        assert_eq!(PlayerPosition::North.side(), PlayerPosition::South.side());
        assert_eq!(PlayerPosition::East.side(), Side::EastWest);
    }

    #[test]
    fn index_roundtrip() {
        for (i, seat) in PlayerPosition::LOOP.iter().enumerate() {
            assert_eq!(PlayerPosition::from_index(i), Some(*seat));
            assert_eq!(seat.index(), i);
        }
    }

    #[test]
    fn turn_steps_clockwise() {
        let turn = PlayerTurn::new(PlayerPosition::South);
        assert_eq!(turn.next().seat(), PlayerPosition::West);
        assert_eq!(turn.prev().seat(), PlayerPosition::East);
        assert_eq!(turn.next_k(6).seat(), PlayerPosition::North);
    }

    #[test]
    fn parses_letters_and_names() {
        assert_eq!("E".parse::<PlayerPosition>().unwrap(), PlayerPosition::East);
        assert_eq!("south".parse::<PlayerPosition>().unwrap(), PlayerPosition::South);
        assert!("X".parse::<PlayerPosition>().is_err());
    }
}
