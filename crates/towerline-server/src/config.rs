//! Driver configuration.
//!
//! One TOML file carries the match rules (`[match]`) and the headless
//! driver settings (`[driver]`). A missing file means defaults; a file that
//! exists but does not parse or validate aborts startup.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use towerline_combat::MatchConfig;
use tracing::info;

/// Settings for the scripted headless match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Number of fixed steps to simulate before stopping
    pub ticks: u32,
    /// Fixed steps per second
    pub tick_rate: u32,
    /// Seed for spawn jitter
    pub seed: u64,
    /// Seconds between minion waves
    pub wave_interval: f32,
    /// Minions per team per wave
    pub wave_size: u32,
    /// Minion walking speed in units per second
    pub minion_speed: f32,
    /// Maximum vertical spawn offset from the lane line
    pub spawn_jitter: f32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            ticks: 18_000, // 5 minutes at 60 Hz
            tick_rate: 60,
            seed: 7,
            wave_interval: 10.0,
            wave_size: 3,
            minion_speed: 80.0,
            spawn_jitter: 12.0,
        }
    }
}

impl DriverConfig {
    /// Seconds per fixed step.
    #[must_use]
    pub fn step(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

/// Full server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Match rules shared with clients
    #[serde(rename = "match")]
    pub combat: MatchConfig,
    /// Headless driver settings
    pub driver: DriverConfig,
}

impl ServerConfig {
    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Checks both sections.
    pub fn validate(&self) -> Result<()> {
        self.combat.validate()?;

        let driver = &self.driver;
        if driver.tick_rate == 0 {
            bail!("driver.tick_rate must be non-zero");
        }
        if !(driver.wave_interval.is_finite() && driver.wave_interval > 0.0) {
            bail!("driver.wave_interval must be > 0, got {}", driver.wave_interval);
        }
        if !(driver.minion_speed.is_finite() && driver.minion_speed >= 0.0) {
            bail!("driver.minion_speed must be >= 0, got {}", driver.minion_speed);
        }
        if !(driver.spawn_jitter.is_finite() && driver.spawn_jitter >= 0.0) {
            bail!("driver.spawn_jitter must be >= 0, got {}", driver.spawn_jitter);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ServerConfig::load_from(dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("server.toml");

        let mut config = ServerConfig::default();
        config.driver.seed = 99;
        config.combat.layout.towers_per_team = 3;
        config.save_to(&path).expect("save");

        let text = fs::read_to_string(&path).expect("read");
        assert!(text.contains("[match"));
        assert!(text.contains("[driver]"));

        let loaded = ServerConfig::load_from(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("server.toml");
        fs::write(&path, "[driver]\nticks = 120\n").expect("write");

        let config = ServerConfig::load_from(&path).expect("load");
        assert_eq!(config.driver.ticks, 120);
        assert_eq!(config.driver.tick_rate, 60);
        assert_eq!(config.combat, MatchConfig::default());
    }

    #[test]
    fn test_invalid_values_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("server.toml");

        fs::write(&path, "[driver]\ntick_rate = 0\n").expect("write");
        assert!(ServerConfig::load_from(&path).is_err());

        fs::write(&path, "[match.tower]\nmax_health = -5.0\n").expect("write");
        assert!(ServerConfig::load_from(&path).is_err());

        fs::write(&path, "not = [valid").expect("write");
        assert!(ServerConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_step() {
        let driver = DriverConfig::default();
        assert!((driver.step() - 1.0 / 60.0).abs() < f32::EPSILON);
    }
}
