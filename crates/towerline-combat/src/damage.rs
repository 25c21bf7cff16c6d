//! Authoritative health mutation and the immunity chain.
//!
//! Every health change goes through here. The server decrements health by
//! the damage it decided on; a client overwrites health with the snapshot the
//! server sent. Either way, the transition into `destroyed` swaps the skin
//! and lifts immunity on the protected structure, once.

use serde::{Deserialize, Serialize};
use towerline_common::StructureId;
use tracing::info;

use crate::entity::{Appearance, CombatEntity};
use crate::roster::CombatRoster;

/// How a damage application is sourced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageMode {
    /// The server determined a hit and subtracts `damage`.
    ServerAuthoritative {
        /// Damage to subtract
        damage: f32,
    },
    /// A client applies the server's resulting health verbatim.
    ClientSnapshot {
        /// Damage the server applied (informational)
        damage: f32,
        /// Resulting health on the server
        health: f32,
    },
}

impl DamageMode {
    /// Damage value carried by either mode.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        match self {
            Self::ServerAuthoritative { damage } | Self::ClientSnapshot { damage, .. } => *damage,
        }
    }
}

/// Why a damage application did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// Target is immune
    Immune,
    /// Target already destroyed
    AlreadyDestroyed,
    /// No such structure
    UnknownStructure,
    /// Damage or snapshot value is NaN, infinite or negative
    InvalidDamage,
    /// Mode not accepted by this process's authority
    NotAuthoritative,
}

/// Health change applied to a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strike {
    /// Health before the hit
    pub previous_health: f32,
    /// Health after the hit
    pub health: f32,
    /// Whether this hit destroyed the entity
    pub destroyed: bool,
}

/// Applies a hit to one entity, without touching any other entity.
///
/// Health is clamped to `[0, max_health]`. Reaching zero marks the entity
/// destroyed and switches it to the destroyed skin.
pub fn strike(entity: &mut CombatEntity, mode: DamageMode) -> Result<Strike, IgnoreReason> {
    if entity.immune {
        return Err(IgnoreReason::Immune);
    }
    if entity.destroyed {
        return Err(IgnoreReason::AlreadyDestroyed);
    }

    let previous_health = entity.health;
    match mode {
        DamageMode::ServerAuthoritative { damage } => {
            if !damage.is_finite() || damage < 0.0 {
                return Err(IgnoreReason::InvalidDamage);
            }
            if entity.health > 0.0 {
                entity.health = (entity.health - damage).max(0.0);
            }
        },
        DamageMode::ClientSnapshot { health, .. } => {
            if !health.is_finite() {
                return Err(IgnoreReason::InvalidDamage);
            }
            entity.health = health.clamp(0.0, entity.max_health);
        },
    }

    let destroyed = entity.health <= 0.0;
    if destroyed {
        entity.health = 0.0;
        entity.destroyed = true;
        entity.appearance = Appearance::Destroyed;
    }

    Ok(Strike {
        previous_health,
        health: entity.health,
        destroyed,
    })
}

/// Result of a roster-level damage application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageReport {
    /// Structure that was hit
    pub target: StructureId,
    /// Damage value of the request
    pub damage: f32,
    /// Health after the hit
    pub health: f32,
    /// Whether this hit destroyed the structure
    pub destroyed: bool,
    /// Structure whose immunity was lifted by this destruction
    pub immunity_lifted: Option<StructureId>,
}

/// Result of [`resolve_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Nothing changed
    Ignored(IgnoreReason),
    /// Health changed (possibly destroying the target)
    Applied(DamageReport),
}

impl DamageOutcome {
    /// The report, if anything was applied.
    #[must_use]
    pub const fn report(&self) -> Option<&DamageReport> {
        match self {
            Self::Applied(report) => Some(report),
            Self::Ignored(_) => None,
        }
    }
}

/// Applies damage to a roster structure and runs the immunity cascade.
///
/// Health update and cascade happen within this call; no caller can observe
/// one without the other.
pub fn resolve_damage(roster: &mut CombatRoster, target: StructureId, mode: DamageMode) -> DamageOutcome {
    let Some(entity) = roster.get_mut(target) else {
        return DamageOutcome::Ignored(IgnoreReason::UnknownStructure);
    };

    let hit = match strike(entity, mode) {
        Ok(hit) => hit,
        Err(reason) => return DamageOutcome::Ignored(reason),
    };
    let protects = entity.protects;

    let mut immunity_lifted = None;
    if hit.destroyed {
        info!("{target} destroyed");
        if let Some(protected) = protects {
            immunity_lifted = lift_immunity(roster, protected);
        }
    }

    DamageOutcome::Applied(DamageReport {
        target,
        damage: mode.damage(),
        health: hit.health,
        destroyed: hit.destroyed,
        immunity_lifted,
    })
}

fn lift_immunity(roster: &mut CombatRoster, protected: StructureId) -> Option<StructureId> {
    let entity = roster.get_mut(protected)?;
    if !entity.immune {
        return None;
    }
    entity.immune = false;
    info!("{protected} is no longer immune");
    Some(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CombatantStats, MatchConfig};
    use crate::entity::EntityKind;
    use proptest::prelude::*;
    use towerline_common::{Team, WorldPoint};

    fn roster() -> CombatRoster {
        CombatRoster::new(&MatchConfig::default())
    }

    fn server(damage: f32) -> DamageMode {
        DamageMode::ServerAuthoritative { damage }
    }

    fn health(roster: &CombatRoster, id: StructureId) -> f32 {
        roster.get(id).expect("structure").health()
    }

    #[test]
    fn test_server_damage_decrements() {
        let mut roster = roster();
        let front = StructureId::tower(1);

        let outcome = resolve_damage(&mut roster, front, server(40.0));
        let report = outcome.report().expect("applied");
        assert_eq!(report.health, 460.0);
        assert!(!report.destroyed);
        assert_eq!(report.immunity_lifted, None);
        assert_eq!(health(&roster, front), 460.0);
    }

    #[test]
    fn test_overkill_clamps_to_zero_and_destroys() {
        let mut tower = CombatEntity::new(
            EntityKind::Tower,
            Team::Red,
            WorldPoint::ZERO,
            &CombatantStats::tower().with_health(30.0),
        );

        let hit = strike(&mut tower, server(40.0)).expect("applied");
        assert_eq!(hit.previous_health, 30.0);
        assert_eq!(hit.health, 0.0);
        assert!(hit.destroyed);
        assert!(tower.is_destroyed());
        assert_eq!(tower.health(), 0.0);
        assert_eq!(tower.appearance(), Appearance::Destroyed);
    }

    #[test]
    fn test_snapshot_overrides_local_value() {
        let mut tower = CombatEntity::new(
            EntityKind::Tower,
            Team::Blue,
            WorldPoint::ZERO,
            &CombatantStats::tower(),
        );
        tower.health = 40.0;

        let hit = strike(&mut tower, DamageMode::ClientSnapshot { damage: 15.0, health: 25.0 }).expect("applied");
        assert_eq!(hit.health, 25.0);
        assert_eq!(tower.health(), 25.0);
    }

    #[test]
    fn test_snapshot_of_zero_destroys() {
        let mut roster = roster();
        let front = StructureId::tower(3);
        let outcome = resolve_damage(&mut roster, front, DamageMode::ClientSnapshot { damage: 10.0, health: 0.0 });

        let report = outcome.report().expect("applied");
        assert!(report.destroyed);
        assert_eq!(report.immunity_lifted, Some(StructureId::tower(2)));
    }

    #[test]
    fn test_immune_and_invalid_are_ignored() {
        let mut roster = roster();
        let rear = StructureId::tower(0);
        assert_eq!(
            resolve_damage(&mut roster, rear, server(1000.0)),
            DamageOutcome::Ignored(IgnoreReason::Immune)
        );
        assert_eq!(
            resolve_damage(&mut roster, StructureId::tower(9), server(1.0)),
            DamageOutcome::Ignored(IgnoreReason::UnknownStructure)
        );
        assert_eq!(
            resolve_damage(&mut roster, StructureId::tower(1), server(f32::NAN)),
            DamageOutcome::Ignored(IgnoreReason::InvalidDamage)
        );
        assert_eq!(
            resolve_damage(&mut roster, StructureId::tower(1), server(-5.0)),
            DamageOutcome::Ignored(IgnoreReason::InvalidDamage)
        );
        assert_eq!(health(&roster, StructureId::tower(1)), 500.0);
    }

    #[test]
    fn test_immunity_chain_front_rear_base() {
        let mut roster = roster();
        let front = StructureId::tower(1);
        let rear = StructureId::tower(0);
        let base = StructureId::Base(Team::Red);

        let outcome = resolve_damage(&mut roster, front, server(500.0));
        assert_eq!(outcome.report().and_then(|r| r.immunity_lifted), Some(rear));
        assert!(!roster.get(rear).expect("rear").is_immune());
        assert!(roster.get(base).expect("base").is_immune());

        let outcome = resolve_damage(&mut roster, rear, server(500.0));
        assert_eq!(outcome.report().and_then(|r| r.immunity_lifted), Some(base));
        assert!(!roster.get(base).expect("base").is_immune());

        // Blue side untouched.
        assert!(roster.get(StructureId::tower(2)).expect("blue rear").is_immune());
        assert!(roster.get(StructureId::Base(Team::Blue)).expect("blue base").is_immune());
    }

    #[test]
    fn test_destroyed_never_recascades() {
        let mut roster = roster();
        let front = StructureId::tower(1);
        let rear = StructureId::tower(0);

        resolve_damage(&mut roster, front, server(600.0));
        // Rear loses immunity, then takes a hit.
        resolve_damage(&mut roster, rear, server(10.0));

        for mode in [server(50.0), DamageMode::ClientSnapshot { damage: 0.0, health: 300.0 }] {
            assert_eq!(
                resolve_damage(&mut roster, front, mode),
                DamageOutcome::Ignored(IgnoreReason::AlreadyDestroyed)
            );
        }
        assert_eq!(health(&roster, front), 0.0);
        assert_eq!(health(&roster, rear), 490.0);
    }

    proptest! {
        #[test]
        fn prop_immune_health_never_changes(
            damages in prop::collection::vec(-1.0e4f32..1.0e4, 1..32),
        ) {
            let mut roster = roster();
            let rear = StructureId::tower(0);
            for damage in damages {
                resolve_damage(&mut roster, rear, server(damage));
                resolve_damage(&mut roster, rear, DamageMode::ClientSnapshot { damage, health: damage });
            }
            prop_assert_eq!(health(&roster, rear), 500.0);
            prop_assert!(roster.get(rear).expect("rear").is_immune());
        }

        #[test]
        fn prop_destroyed_is_final(
            damages in prop::collection::vec(0.0f32..1.0e4, 1..32),
        ) {
            let mut roster = roster();
            let front = StructureId::tower(1);
            resolve_damage(&mut roster, front, server(1.0e6));

            for damage in damages {
                let server_outcome = resolve_damage(&mut roster, front, server(damage));
                prop_assert_eq!(server_outcome, DamageOutcome::Ignored(IgnoreReason::AlreadyDestroyed));
                let snapshot = DamageMode::ClientSnapshot { damage, health: damage };
                let client_outcome = resolve_damage(&mut roster, front, snapshot);
                prop_assert_eq!(client_outcome, DamageOutcome::Ignored(IgnoreReason::AlreadyDestroyed));
            }
            prop_assert_eq!(health(&roster, front), 0.0);
        }

        #[test]
        fn prop_health_stays_in_bounds(
            damages in prop::collection::vec(0.0f32..200.0, 1..64),
        ) {
            let mut roster = roster();
            let front = StructureId::tower(3);
            let mut destructions = 0;
            for damage in damages {
                if let DamageOutcome::Applied(report) = resolve_damage(&mut roster, front, server(damage)) {
                    prop_assert!(report.health >= 0.0 && report.health <= 500.0);
                    if report.destroyed {
                        destructions += 1;
                    }
                }
            }
            prop_assert!(destructions <= 1);
            let tower = roster.get(front).expect("tower");
            prop_assert_eq!(tower.health() == 0.0, tower.is_destroyed());
        }
    }
}
