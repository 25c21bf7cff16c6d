//! # Towerline Common
//!
//! Common types shared by the Towerline combat core and its drivers:
//! - Teams
//! - Structure and candidate identifiers
//! - World points and range math
//! - Wire version information
//! - Common error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod team;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::team::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_opponent() {
        assert_eq!(Team::Red.opponent(), Team::Blue);
        assert_eq!(Team::Blue.opponent(), Team::Red);
        assert!(Team::Red.is_enemy_of(Team::Blue));
        assert!(!Team::Blue.is_enemy_of(Team::Blue));
        assert_eq!(Team::Blue.index(), 1);
    }

    #[test]
    fn test_range_is_inclusive() {
        let origin = WorldPoint::new(0.0, 0.0);
        assert!(within_range(origin, WorldPoint::new(3.0, 4.0), 5.0));
        assert!(!within_range(origin, WorldPoint::new(3.0, 4.1), 5.0));
        assert_eq!(range_sq(-2.0), 0.0);
    }

    #[test]
    fn test_structure_id_display() {
        assert_eq!(StructureId::tower(3).to_string(), "tower 3");
        assert_eq!(StructureId::Base(Team::Red).to_string(), "red base");
    }

    #[test]
    fn test_version_bytes() {
        let v = SchemaVersion::new(1, 2, 3);
        assert_eq!(SchemaVersion::from_le_bytes(v.to_le_bytes()), v);

        let v2 = SchemaVersion::new(1, 3, 0);
        let v3 = SchemaVersion::new(2, 0, 0);
        assert!(v2.is_compatible_with(&v));
        assert!(!v.is_compatible_with(&v3));
    }
}
