//! Server/client damage synchronization contract.
//!
//! The server sends one [`DamageNotice`] per applied authoritative hit.
//! Notices carry a per-structure sequence number; clients drop anything not
//! newer than what they already applied, so an unordered transport can never
//! roll health back. Clients never originate damage: a [`HitClaim`] is only
//! ever reviewed, never applied.

use ahash::AHashMap;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use towerline_common::{range_sq, within_range, CandidateRef, MagicBytes, SchemaVersion, StructureId, TowerlineError};
use tracing::warn;

use crate::roster::CombatRoster;
use crate::targeting::{find_nearest_enemy, TargetPool};

/// Sync error types.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Packet is too short or has the wrong magic bytes
    #[error("invalid sync packet format")]
    InvalidFormat,
    /// Packet was written by an incompatible protocol version
    #[error("incompatible sync protocol: expected {expected}, found {found}")]
    VersionMismatch {
        /// Our version
        expected: SchemaVersion,
        /// Packet version
        found: SchemaVersion,
    },
    /// Body could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

impl From<SyncError> for TowerlineError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::VersionMismatch { expected, found } => Self::VersionMismatch {
                expected: expected.to_string(),
                actual: found.to_string(),
            },
            other => Self::Protocol(other.to_string()),
        }
    }
}

const HEADER_LEN: usize = 10;

/// Server → client: an authoritative hit was applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageNotice {
    /// Per-structure sequence, strictly increasing from 1
    pub sequence: u64,
    /// Structure hit
    pub target: StructureId,
    /// Damage the server applied
    pub damage: f32,
    /// Server health after the hit
    pub health: f32,
}

/// Client → server: "this structure hit me". Never trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitClaim {
    /// Candidate claiming the hit
    pub claimant: CandidateRef,
    /// Structure claimed to have attacked
    pub source: StructureId,
    /// Claimed damage
    pub claimed_damage: f32,
}

/// Everything that crosses the wire for the combat core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WireMessage {
    /// Server-applied damage
    DamageApplied(DamageNotice),
    /// Client hit claim
    HitClaim(HitClaim),
}

impl WireMessage {
    /// Encodes as magic bytes, protocol version, then a bincode body.
    pub fn encode(&self) -> SyncResult<Vec<u8>> {
        let body = bincode::serialize(self).map_err(|e| SyncError::Serialization(e.to_string()))?;

        let mut buffer = Vec::with_capacity(HEADER_LEN + body.len());
        buffer.extend_from_slice(&MagicBytes::SYNC.0);
        buffer.extend_from_slice(&SchemaVersion::SYNC_PROTOCOL.to_le_bytes());
        buffer.extend(body);
        Ok(buffer)
    }

    /// Decodes a packet produced by [`Self::encode`].
    pub fn decode(bytes: &[u8]) -> SyncResult<Self> {
        if bytes.len() < HEADER_LEN || bytes[0..4] != MagicBytes::SYNC.0 {
            return Err(SyncError::InvalidFormat);
        }

        let mut version = [0u8; 6];
        version.copy_from_slice(&bytes[4..HEADER_LEN]);
        let found = SchemaVersion::from_le_bytes(version);
        if !SchemaVersion::SYNC_PROTOCOL.is_compatible_with(&found) {
            return Err(SyncError::VersionMismatch {
                expected: SchemaVersion::SYNC_PROTOCOL,
                found,
            });
        }

        bincode::deserialize(&bytes[HEADER_LEN..]).map_err(|e| SyncError::Serialization(e.to_string()))
    }
}

/// Outgoing half of a transport. Fire-and-forget.
pub trait SyncChannel {
    /// Queues a message for delivery.
    fn send(&mut self, message: WireMessage);
}

impl SyncChannel for Vec<WireMessage> {
    fn send(&mut self, message: WireMessage) {
        self.push(message);
    }
}

/// Creates an in-process transport carrying encoded packets.
#[must_use]
pub fn loopback(capacity: usize) -> (LoopbackSender, LoopbackReceiver) {
    let (sender, receiver) = bounded(capacity);
    (LoopbackSender { sender }, LoopbackReceiver { receiver })
}

/// Sending end of a [`loopback`] transport.
#[derive(Debug, Clone)]
pub struct LoopbackSender {
    sender: Sender<Vec<u8>>,
}

impl SyncChannel for LoopbackSender {
    fn send(&mut self, message: WireMessage) {
        let packet = match message.encode() {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropping unencodable sync message: {e}");
                return;
            },
        };
        match self.sender.try_send(packet) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => warn!("Sync queue full, dropping {message:?}"),
            Err(TrySendError::Disconnected(_)) => warn!("Sync peer gone, dropping {message:?}"),
        }
    }
}

/// Receiving end of a [`loopback`] transport.
#[derive(Debug, Clone)]
pub struct LoopbackReceiver {
    receiver: Receiver<Vec<u8>>,
}

impl LoopbackReceiver {
    /// Decodes every pending packet. Malformed packets are logged and skipped.
    pub fn drain(&self) -> Vec<WireMessage> {
        self.receiver
            .try_iter()
            .filter_map(|packet| match WireMessage::decode(&packet) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Discarding sync packet: {e}");
                    None
                },
            })
            .collect()
    }

    /// Number of packets waiting.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

/// Server-side sequence allocator.
#[derive(Debug, Default, Clone)]
pub struct ServerSync {
    sequences: AHashMap<StructureId, u64>,
}

impl ServerSync {
    /// Creates an allocator with every sequence at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the notice for an applied hit, taking the next sequence.
    pub fn notice(&mut self, target: StructureId, damage: f32, health: f32) -> DamageNotice {
        let sequence = self.sequences.entry(target).or_insert(0);
        *sequence += 1;
        DamageNotice {
            sequence: *sequence,
            target,
            damage,
            health,
        }
    }
}

/// Client-side ordering state.
///
/// A notice is committed only once it has actually been applied. Notices for
/// a structure the client still sees as immune are held until its protector
/// falls, then replayed.
#[derive(Debug, Default, Clone)]
pub struct ClientSync {
    last_applied: AHashMap<StructureId, u64>,
    held: AHashMap<StructureId, DamageNotice>,
}

impl ClientSync {
    /// Creates a filter that has applied nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `notice` is newer than the last one applied for its structure.
    #[must_use]
    pub fn is_newer(&self, notice: &DamageNotice) -> bool {
        notice.sequence > self.last_applied(notice.target)
    }

    /// Marks `notice` as applied. Older sequences never move the mark back.
    pub fn commit(&mut self, notice: &DamageNotice) {
        let last = self.last_applied.entry(notice.target).or_insert(0);
        *last = (*last).max(notice.sequence);
        if self
            .held
            .get(&notice.target)
            .is_some_and(|held| held.sequence <= notice.sequence)
        {
            self.held.remove(&notice.target);
        }
    }

    /// Parks a notice that could not be applied yet. Only the newest one per
    /// structure is kept.
    pub fn hold(&mut self, notice: DamageNotice) {
        let slot = self.held.entry(notice.target).or_insert(notice);
        if notice.sequence > slot.sequence {
            *slot = notice;
        }
    }

    /// Removes and returns the notice held for `target`.
    pub fn take_held(&mut self, target: StructureId) -> Option<DamageNotice> {
        self.held.remove(&target)
    }

    /// Number of structures with a held notice.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Last sequence applied for a structure (0 if none).
    #[must_use]
    pub fn last_applied(&self, target: StructureId) -> u64 {
        self.last_applied.get(&target).copied().unwrap_or(0)
    }
}

/// Why a hit claim is implausible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Named structure does not exist
    UnknownSource,
    /// Named structure is destroyed
    SourceDestroyed,
    /// Named structure never attacks
    Unarmed,
    /// Claimant slot is inactive
    UnknownClaimant,
    /// Claimant is on the structure's team
    SameTeam,
    /// Claimant is outside the structure's attack range
    OutOfRange,
    /// Claimed damage is NaN, infinite or negative
    InvalidDamage,
    /// Server targeting would pick a different candidate
    NotTargeted,
}

/// Server verdict on a hit claim. Neither verdict changes any health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimVerdict {
    /// Consistent with server-side targeting; usable as a hint only
    Plausible,
    /// Inconsistent with server state
    Rejected(RejectReason),
}

/// Re-validates a client hit claim against server-side state.
#[must_use]
pub fn review_claim(roster: &CombatRoster, claim: &HitClaim, pool: &TargetPool<'_>) -> ClaimVerdict {
    let verdict = |reason| ClaimVerdict::Rejected(reason);

    let Some(source) = roster.get(claim.source) else {
        return verdict(RejectReason::UnknownSource);
    };
    if source.is_destroyed() {
        return verdict(RejectReason::SourceDestroyed);
    }
    if source.attack_kind().is_none() {
        return verdict(RejectReason::Unarmed);
    }
    if !claim.claimed_damage.is_finite() || claim.claimed_damage < 0.0 {
        return verdict(RejectReason::InvalidDamage);
    }
    let Some((team, position)) = pool.locate(claim.claimant) else {
        return verdict(RejectReason::UnknownClaimant);
    };
    if !source.team().is_enemy_of(team) {
        return verdict(RejectReason::SameTeam);
    }
    if !within_range(source.position(), position, source.attack_range()) {
        return verdict(RejectReason::OutOfRange);
    }
    let chosen = find_nearest_enemy(source.position(), source.team(), range_sq(source.attack_range()), pool);
    if chosen.map(|lock| lock.candidate) != Some(claim.claimant) {
        return verdict(RejectReason::NotTargeted);
    }
    ClaimVerdict::Plausible
}
