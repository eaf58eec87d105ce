//! Compass directions for the 8 neighbors of a tile
//!
//! Screen coordinates: +X is east, +Y is south (down).
//!
//! ```text
//!   NW | N | NE
//!   W  | X | E
//!   SW | S | SE
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// All directions, clockwise from north
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Grid offset of the neighbor in this direction
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Cell one step from `(x, y)` in this direction; `None` past the edge of the grid
    pub fn step_from(self, x: i32, y: i32) -> Option<(i32, i32)> {
        let (dx, dy) = self.offset();
        Some((x.checked_add(dx)?, y.checked_add(dy)?))
    }

    /// Check if this is one of the four diagonal directions
    pub fn is_diagonal(self) -> bool {
        let (dx, dy) = self.offset();
        dx != 0 && dy != 0
    }

    /// Direction pointing back at us from the neighbor
    pub fn opposite(self) -> Direction {
        let index = Self::ALL.iter().position(|d| *d == self).unwrap_or(0);
        Self::ALL[(index + 4) % 8]
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::NorthEast => "northeast",
            Direction::East => "east",
            Direction::SouthEast => "southeast",
            Direction::South => "south",
            Direction::SouthWest => "southwest",
            Direction::West => "west",
            Direction::NorthWest => "northwest",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
