//! # Towerline Combat
//!
//! Server-authoritative combat core for a two-team lane game.
//!
//! This crate decides which structures attack which targets and keeps
//! structure health consistent between one server and its clients:
//! - Combat entities (towers, bases, minions) and the lane roster
//! - Nearest-enemy target resolution
//! - Cooldown-gated attack scheduling (server only)
//! - Damage resolution with the immunity chain
//! - Damage notices and hit claims on the wire
//! - Combat event bus
//! - Match configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod damage;
pub mod entity;
pub mod events;
pub mod manager;
pub mod roster;
pub mod scheduler;
pub mod sync;
pub mod targeting;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::damage::*;
    pub use crate::entity::*;
    pub use crate::events::*;
    pub use crate::manager::*;
    pub use crate::roster::*;
    pub use crate::scheduler::*;
    pub use crate::sync::*;
    pub use crate::targeting::*;
}

pub use prelude::*;
