//! Match configuration.
//!
//! Per-kind combat stats, lane layout and sync settings. Loaded from TOML;
//! a missing file yields defaults, a malformed or out-of-range file is an
//! initialization failure.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading or writing the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// File contents are not valid TOML for this schema
    #[error("failed to parse match config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Configuration could not be serialized
    #[error("failed to serialize match config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A value is outside its allowed range
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field path
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Upper bound on towers per team (tower indices are carried as `u8`).
pub const MAX_TOWERS_PER_TEAM: usize = 16;

/// Attack variants handed to the attack subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackKind {
    /// Tower projectile
    TowerShot,
    /// Minion melee strike
    MinionStrike,
}

/// Combat numbers for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatantStats {
    /// Maximum (and starting) health
    pub max_health: f32,
    /// Attack range in world units
    pub attack_range: f32,
    /// Seconds between attacks
    pub attack_cooldown: f32,
    /// Damage dealt per attack by the attack subsystem
    pub attack_damage: f32,
    /// Attack spawned on initiation; `None` means the entity never attacks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_kind: Option<AttackKind>,
}

impl Default for CombatantStats {
    fn default() -> Self {
        Self::tower()
    }
}

impl CombatantStats {
    /// Default tower stats.
    #[must_use]
    pub fn tower() -> Self {
        Self {
            max_health: 500.0,
            attack_range: 250.0,
            attack_cooldown: 1.5,
            attack_damage: 40.0,
            attack_kind: Some(AttackKind::TowerShot),
        }
    }

    /// Default base stats. Bases do not attack.
    #[must_use]
    pub fn base() -> Self {
        Self {
            max_health: 1000.0,
            attack_range: 0.0,
            attack_cooldown: 0.0,
            attack_damage: 0.0,
            attack_kind: None,
        }
    }

    /// Default minion stats.
    #[must_use]
    pub fn minion() -> Self {
        Self {
            max_health: 100.0,
            attack_range: 60.0,
            attack_cooldown: 1.0,
            attack_damage: 12.0,
            attack_kind: Some(AttackKind::MinionStrike),
        }
    }

    /// Sets the maximum health.
    #[must_use]
    pub fn with_health(mut self, health: f32) -> Self {
        self.max_health = health;
        self
    }

    /// Sets the attack range.
    #[must_use]
    pub fn with_range(mut self, range: f32) -> Self {
        self.attack_range = range;
        self
    }

    /// Sets the attack cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: f32) -> Self {
        self.attack_cooldown = cooldown;
        self
    }

    fn validate(&self, prefix: &'static str) -> ConfigResult<()> {
        if !self.max_health.is_finite() || self.max_health <= 0.0 {
            return Err(invalid(prefix, format!("max_health must be positive, got {}", self.max_health)));
        }
        if !self.attack_range.is_finite() || self.attack_range < 0.0 {
            return Err(invalid(prefix, format!("attack_range must be >= 0, got {}", self.attack_range)));
        }
        if !self.attack_cooldown.is_finite() || self.attack_cooldown < 0.0 {
            return Err(invalid(
                prefix,
                format!("attack_cooldown must be >= 0, got {}", self.attack_cooldown),
            ));
        }
        if !self.attack_damage.is_finite() || self.attack_damage < 0.0 {
            return Err(invalid(prefix, format!("attack_damage must be >= 0, got {}", self.attack_damage)));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// Placement of the lane's structures.
///
/// Towers are indexed rear to front per team: Red `0..n`, Blue `n..2n`.
/// The front tower of each team is the lane's protector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneLayout {
    /// Towers per team
    pub towers_per_team: usize,
    /// X of the Red front tower
    pub red_front_x: f32,
    /// X of the Blue front tower
    pub blue_front_x: f32,
    /// Horizontal distance between consecutive towers of a team
    pub spacing_x: f32,
    /// Y shared by every structure
    pub buildings_y: f32,
    /// X of the Red base
    pub red_base_x: f32,
    /// X of the Blue base
    pub blue_base_x: f32,
}

impl Default for LaneLayout {
    fn default() -> Self {
        Self {
            towers_per_team: 2,
            red_front_x: 900.0,
            blue_front_x: 1500.0,
            spacing_x: 400.0,
            buildings_y: 540.0,
            red_base_x: 100.0,
            blue_base_x: 2300.0,
        }
    }
}

/// Network synchronization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Capacity of in-process loopback and event queues
    pub channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Full match configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Tower stats
    pub tower: CombatantStats,
    /// Base stats
    pub base: CombatantStats,
    /// Minion stats
    pub minion: CombatantStats,
    /// Structure placement
    pub layout: LaneLayout,
    /// Sync settings
    pub sync: SyncConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tower: CombatantStats::tower(),
            base: CombatantStats::base(),
            minion: CombatantStats::minion(),
            layout: LaneLayout::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl MatchConfig {
    /// Load configuration from a specific path.
    /// Returns the default config if the file doesn't exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Match config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        info!("Loaded match config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        info!("Saved match config to {}", path.display());
        Ok(())
    }

    /// Checks every value is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        self.tower.validate("tower")?;
        self.base.validate("base")?;
        self.minion.validate("minion")?;

        let towers = self.layout.towers_per_team;
        if towers == 0 || towers > MAX_TOWERS_PER_TEAM {
            return Err(invalid(
                "layout.towers_per_team",
                format!("must be in 1..={MAX_TOWERS_PER_TEAM}, got {towers}"),
            ));
        }
        let coords = [
            self.layout.red_front_x,
            self.layout.blue_front_x,
            self.layout.spacing_x,
            self.layout.buildings_y,
            self.layout.red_base_x,
            self.layout.blue_base_x,
        ];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(invalid("layout", "coordinates must be finite".to_string()));
        }
        if self.sync.channel_capacity == 0 {
            return Err(invalid("sync.channel_capacity", "must be non-zero".to_string()));
        }
        Ok(())
    }
}
