//! Identifiers for structures and attack candidates.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::team::Team;

/// Index of a tower in the match roster.
///
/// Red towers occupy `0..towers_per_team`, Blue towers follow. This is the
/// value carried on the wire as the entity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerIndex(u8);

impl TowerIndex {
    /// Creates a tower index from a raw value.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Returns the raw index value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Returns the index as a `usize` for array access.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Addresses a static combat structure: a tower or a team base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructureId {
    /// A lane tower
    Tower(TowerIndex),
    /// A team's base
    Base(Team),
}

impl StructureId {
    /// Shorthand for `StructureId::Tower(TowerIndex::new(index))`.
    #[must_use]
    pub const fn tower(index: u8) -> Self {
        Self::Tower(TowerIndex::new(index))
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tower(index) => write!(f, "tower {}", index.raw()),
            Self::Base(team) => write!(f, "{team} base"),
        }
    }
}

/// Kind of mobile entity a structure can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateKind {
    /// A connected player
    Player,
    /// A lane minion
    Minion,
}

/// A specific attack candidate: its kind and the provider slot it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateRef {
    /// Player or minion
    pub kind: CandidateKind,
    /// Slot in the owning provider
    pub slot: u16,
}

impl CandidateRef {
    /// Reference to a player slot.
    #[must_use]
    pub const fn player(slot: u16) -> Self {
        Self {
            kind: CandidateKind::Player,
            slot,
        }
    }

    /// Reference to a minion slot.
    #[must_use]
    pub const fn minion(slot: u16) -> Self {
        Self {
            kind: CandidateKind::Minion,
            slot,
        }
    }
}
