//! # Towerline Server
//!
//! Headless match driver. Runs an authoritative combat core against
//! scripted minion waves, mirrors it into a client core over the loopback
//! channel, and reports whether both ended with the same structure health.
//!
//! Usage: `towerline-server [config.toml]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod sim;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ServerConfig;

/// Configuration file used when no path is given.
const CONFIG_FILE: &str = "towerline.toml";

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("towerline=info".parse()?))
        .init();

    info!("Towerline server starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());
    let config = ServerConfig::load_from(&path)?;

    let report = sim::run(config)?;
    info!(
        "Match over after {} ticks: winner {}, {} minions spawned, {} killed, {} notices",
        report.ticks,
        report.winner.map_or_else(|| "none".to_string(), |t| t.to_string()),
        report.minions_spawned,
        report.minions_killed,
        report.notices_sent
    );

    for structure in &report.structures {
        if !structure.converged() {
            warn!(
                "{} diverged: server {:.1}, client {:.1}",
                structure.id, structure.server_health, structure.client_health
            );
        }
    }
    if report.converged() {
        info!("Client converged with server on all {} structures", report.structures.len());
    } else {
        anyhow::bail!("client state diverged from server");
    }

    info!("Towerline server shutdown complete");
    Ok(())
}
