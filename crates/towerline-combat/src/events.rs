//! Combat event bus for HUD, audio and effect collaborators.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use towerline_common::{CandidateRef, StructureId, WorldPoint};

use crate::scheduler::{AttackRequest, AttackSource};
use crate::sync::RejectReason;
use tracing::warn;

/// Something combat-relevant that happened this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// An attack was handed to the attack subsystem
    AttackSpawned {
        /// Attacker
        source: AttackSource,
        /// Resolved victim
        victim: CandidateRef,
        /// Aim point
        target: WorldPoint,
    },
    /// A structure lost health
    StructureDamaged {
        /// Structure hit
        target: StructureId,
        /// Damage value
        damage: f32,
        /// Health after the hit
        health: f32,
    },
    /// A structure was destroyed
    StructureDestroyed {
        /// Structure destroyed
        target: StructureId,
    },
    /// A structure became vulnerable
    ImmunityLifted {
        /// Structure that lost immunity
        target: StructureId,
        /// Structure whose destruction lifted it
        by: StructureId,
    },
    /// The server refused a client hit claim
    ClaimRejected {
        /// Structure named in the claim
        source: StructureId,
        /// Why it was refused
        reason: RejectReason,
    },
}

impl CombatEvent {
    /// Event for a spawned attack.
    #[must_use]
    pub fn attack(request: &AttackRequest) -> Self {
        Self::AttackSpawned {
            source: request.source,
            victim: request.victim,
            target: request.target,
        }
    }
}

/// Bounded queue of [`CombatEvent`]s, drained once per frame by whoever
/// presents them. A full queue drops new events.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<CombatEvent>,
    receiver: Receiver<CombatEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Queues an event without blocking.
    pub fn publish(&self, event: CombatEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(event)) => warn!("Event bus full ({}), dropping {event:?}", self.capacity),
            // The bus owns its receiver, so this cannot happen while `self` lives.
            Err(TrySendError::Disconnected(_)) => {},
        }
    }

    /// Takes everything queued so far.
    pub fn drain(&self) -> Vec<CombatEvent> {
        self.receiver.try_iter().collect()
    }

    /// Events waiting to be drained.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
