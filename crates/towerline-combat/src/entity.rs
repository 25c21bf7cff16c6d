//! Per-instance combat state for towers, bases and minions.

use serde::{Deserialize, Serialize};
use towerline_common::{StructureId, Team, WorldPoint};

use crate::config::{AttackKind, CombatantStats};

/// Concrete combat entity variants. Same shape, different constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Static lane tower
    Tower,
    /// Mobile lane minion
    Minion,
    /// Team base
    Base,
}

/// Which skin the renderer should use for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Appearance {
    /// Intact, drawn in team colors
    Team(Team),
    /// Rubble
    Destroyed,
}

/// Mutable combat record.
///
/// Health only changes through [`crate::damage`]; the record outlives its
/// destruction for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEntity {
    pub(crate) kind: EntityKind,
    pub(crate) position: WorldPoint,
    pub(crate) team: Team,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) cooldown: f32,
    pub(crate) attack_range: f32,
    pub(crate) attack_cooldown: f32,
    pub(crate) attack_kind: Option<AttackKind>,
    pub(crate) immune: bool,
    pub(crate) destroyed: bool,
    pub(crate) protects: Option<StructureId>,
    pub(crate) appearance: Appearance,
}

impl CombatEntity {
    /// Creates an entity at full health, ready to attack, not immune.
    #[must_use]
    pub fn new(kind: EntityKind, team: Team, position: WorldPoint, stats: &CombatantStats) -> Self {
        Self {
            kind,
            position,
            team,
            health: stats.max_health,
            max_health: stats.max_health,
            cooldown: 0.0,
            attack_range: stats.attack_range,
            attack_cooldown: stats.attack_cooldown,
            attack_kind: stats.attack_kind,
            immune: false,
            destroyed: false,
            protects: None,
            appearance: Appearance::Team(team),
        }
    }

    /// Sets the starting immunity flag.
    #[must_use]
    pub fn with_immunity(mut self, immune: bool) -> Self {
        self.immune = immune;
        self
    }

    /// Names the structure whose immunity this entity's destruction lifts.
    #[must_use]
    pub fn protecting(mut self, protected: StructureId) -> Self {
        self.protects = Some(protected);
        self
    }

    /// Entity variant.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> WorldPoint {
        self.position
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Current health in `[0, max_health]`.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Seconds until the next attack is allowed.
    #[must_use]
    pub const fn cooldown(&self) -> f32 {
        self.cooldown
    }

    /// Cooldown applied after each attack.
    #[must_use]
    pub const fn attack_cooldown(&self) -> f32 {
        self.attack_cooldown
    }

    /// Attack range in world units.
    #[must_use]
    pub const fn attack_range(&self) -> f32 {
        self.attack_range
    }

    /// Attack spawned on initiation, if this entity attacks at all.
    #[must_use]
    pub const fn attack_kind(&self) -> Option<AttackKind> {
        self.attack_kind
    }

    /// Whether damage is currently ignored.
    #[must_use]
    pub const fn is_immune(&self) -> bool {
        self.immune
    }

    /// Whether the entity has been destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Structure whose immunity this entity's destruction lifts.
    #[must_use]
    pub const fn protects(&self) -> Option<StructureId> {
        self.protects
    }

    /// Current skin selection.
    #[must_use]
    pub const fn appearance(&self) -> Appearance {
        self.appearance
    }

    /// Returns health as a percentage (0.0 to 1.0).
    #[must_use]
    pub fn health_percent(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }

    /// Whether other entities may still pick this one as a target.
    #[must_use]
    pub const fn is_targetable(&self) -> bool {
        !self.destroyed
    }

    /// Moves a minion. Towers and bases never move; returns false for them.
    pub fn relocate(&mut self, position: WorldPoint) -> bool {
        if self.kind != EntityKind::Minion {
            return false;
        }
        self.position = position;
        true
    }

    /// Counts the attack cooldown down, never below zero.
    pub fn tick_cooldown(&mut self, dt: f32) {
        if self.cooldown > 0.0 && dt.is_finite() && dt > 0.0 {
            self.cooldown = (self.cooldown - dt).max(0.0);
        }
    }

    /// Restarts the attack cooldown after a successful attack.
    pub fn reset_cooldown(&mut self) {
        self.cooldown = self.attack_cooldown;
    }
}
