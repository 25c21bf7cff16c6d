//! Cooldown-gated attack initiation.
//!
//! Runs only on the authoritative server. A ready attacker with no target
//! stays ready and retries on the next tick, so it fires the moment an enemy
//! walks into range.

use serde::{Deserialize, Serialize};
use towerline_common::{range_sq, CandidateRef, StructureId, WorldPoint};
use tracing::debug;

use crate::config::AttackKind;
use crate::entity::CombatEntity;
use crate::targeting::{find_nearest_enemy, TargetPool};

/// Which side of the connection this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authority {
    /// Decides targets and damage
    Server,
    /// Renders server-decided state
    Client,
}

impl Authority {
    /// Whether this process makes authoritative decisions.
    #[must_use]
    pub const fn is_server(self) -> bool {
        matches!(self, Self::Server)
    }
}

/// Who initiated an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackSource {
    /// A tower or base
    Structure(StructureId),
    /// A minion, by its slot
    Minion(u16),
}

/// Request handed to the attack subsystem, which owns projectiles/effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackRequest {
    /// Attack variant
    pub kind: AttackKind,
    /// Point the attack is aimed at
    pub target: WorldPoint,
    /// Candidate that was resolved as the target
    pub victim: CandidateRef,
    /// Initiating entity
    pub source: AttackSource,
}

/// Receiver of attack-spawn requests.
pub trait AttackSpawner {
    /// Spawns an attack. Fire-and-forget from the scheduler's view.
    fn spawn_attack(&mut self, request: AttackRequest);
}

impl AttackSpawner for Vec<AttackRequest> {
    fn spawn_attack(&mut self, request: AttackRequest) {
        self.push(request);
    }
}

/// Observable scheduler state for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulerState {
    /// Destroyed, unarmed, or not on the server
    Inert,
    /// Cooling down
    Idle,
    /// May attack as soon as a target is found
    Ready,
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerOutcome {
    /// Nothing evaluated
    Inert,
    /// Still cooling down
    CoolingDown {
        /// Seconds left
        remaining: f32,
    },
    /// Ready but nothing in range; stays ready
    NoTarget,
    /// An attack was spawned and the cooldown restarted
    Attacked(AttackRequest),
}

/// Per-entity attack state machine driver.
#[derive(Debug, Clone, Copy)]
pub struct AttackScheduler {
    authority: Authority,
}

impl AttackScheduler {
    /// Creates a scheduler for the given role.
    #[must_use]
    pub const fn new(authority: Authority) -> Self {
        Self { authority }
    }

    /// Role this scheduler runs as.
    #[must_use]
    pub const fn authority(&self) -> Authority {
        self.authority
    }

    /// Current state of `entity` as seen by this scheduler.
    #[must_use]
    pub fn state(&self, entity: &CombatEntity) -> SchedulerState {
        if !self.authority.is_server() || entity.is_destroyed() || entity.attack_kind().is_none() {
            SchedulerState::Inert
        } else if entity.cooldown() > 0.0 {
            SchedulerState::Idle
        } else {
            SchedulerState::Ready
        }
    }

    /// Counts `entity`'s cooldown down by `dt` and returns its attack kind if
    /// it may attack now. Otherwise returns why not (`Inert` or
    /// `CoolingDown`). The caller restarts the cooldown with
    /// [`CombatEntity::reset_cooldown`] once it has actually attacked.
    pub fn charge(&self, entity: &mut CombatEntity, dt: f32) -> Result<AttackKind, SchedulerOutcome> {
        if self.state(entity) == SchedulerState::Inert {
            return Err(SchedulerOutcome::Inert);
        }
        let Some(kind) = entity.attack_kind() else {
            return Err(SchedulerOutcome::Inert);
        };

        entity.tick_cooldown(dt);
        if entity.cooldown() > 0.0 {
            return Err(SchedulerOutcome::CoolingDown {
                remaining: entity.cooldown(),
            });
        }
        Ok(kind)
    }

    /// Advances one entity by `dt` seconds.
    ///
    /// At most one attack is spawned per call. The cooldown is restarted only
    /// when an attack is actually spawned.
    pub fn tick(
        &self,
        entity: &mut CombatEntity,
        source: AttackSource,
        dt: f32,
        pool: &TargetPool<'_>,
        spawner: &mut dyn AttackSpawner,
    ) -> SchedulerOutcome {
        let kind = match self.charge(entity, dt) {
            Ok(kind) => kind,
            Err(waiting) => return waiting,
        };

        let Some(lock) = find_nearest_enemy(
            entity.position(),
            entity.team(),
            range_sq(entity.attack_range()),
            pool,
        ) else {
            return SchedulerOutcome::NoTarget;
        };

        let request = AttackRequest {
            kind,
            target: lock.point,
            victim: lock.candidate,
            source,
        };
        debug!(
            "{:?} targeting {:?} at ({:.1}, {:.1})",
            source, lock.candidate, lock.point.x, lock.point.y
        );
        spawner.spawn_attack(request);
        entity.reset_cooldown();

        SchedulerOutcome::Attacked(request)
    }
}
