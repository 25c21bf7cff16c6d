//! The two opposing sides of a match.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two teams. Fixed for an entity's whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// Red side (left of the lane)
    Red,
    /// Blue side (right of the lane)
    Blue,
}

impl Team {
    /// Both teams in index order.
    pub const ALL: [Self; 2] = [Self::Red, Self::Blue];

    /// Returns the opposing team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }

    /// Array index for per-team storage (Red = 0, Blue = 1).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Blue => 1,
        }
    }

    /// Returns true if `other` is on the opposing side.
    #[must_use]
    pub const fn is_enemy_of(self, other: Self) -> bool {
        self.index() != other.index()
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => f.write_str("red"),
            Self::Blue => f.write_str("blue"),
        }
    }
}
