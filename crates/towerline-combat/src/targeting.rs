//! Spatial target resolution.
//!
//! Finds the nearest opposing player or minion inside an attacker's range.
//! Candidates are read through [`CandidateSource`] so the resolver never
//! touches player or minion storage directly.

use serde::{Deserialize, Serialize};
use towerline_common::{distance_sq, CandidateKind, CandidateRef, Team, WorldPoint};

/// Read-only view over a pool of potential targets (players or minions).
pub trait CandidateSource {
    /// Kind of candidate held by this source.
    fn kind(&self) -> CandidateKind;
    /// Number of slots to scan. Inactive slots are allowed.
    fn slot_count(&self) -> usize;
    /// Team of the candidate in `slot`, or `None` if the slot is inactive.
    fn team(&self, slot: usize) -> Option<Team>;
    /// Position of the candidate in `slot`, or `None` if it has none.
    fn position(&self, slot: usize) -> Option<WorldPoint>;
}

/// The players and minions a resolver scans, in enumeration order.
#[derive(Clone, Copy)]
pub struct TargetPool<'a> {
    /// Player positions
    pub players: &'a dyn CandidateSource,
    /// Minion positions
    pub minions: &'a dyn CandidateSource,
}

impl<'a> TargetPool<'a> {
    /// Bundles the two candidate sources.
    #[must_use]
    pub fn new(players: &'a dyn CandidateSource, minions: &'a dyn CandidateSource) -> Self {
        Self { players, minions }
    }

    /// Looks up a candidate's team and position.
    #[must_use]
    pub fn locate(&self, candidate: CandidateRef) -> Option<(Team, WorldPoint)> {
        let source = match candidate.kind {
            CandidateKind::Player => self.players,
            CandidateKind::Minion => self.minions,
        };
        let slot = candidate.slot as usize;
        Some((source.team(slot)?, source.position(slot)?))
    }
}

impl std::fmt::Debug for TargetPool<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetPool")
            .field("players", &self.players.slot_count())
            .field("minions", &self.minions.slot_count())
            .finish()
    }
}

/// A resolved target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetLock {
    /// Which candidate was selected
    pub candidate: CandidateRef,
    /// Where it stood at resolution time
    pub point: WorldPoint,
    /// Squared distance from the attacker
    pub distance_sq: f32,
}

/// Finds the nearest enemy of `team` within `max_range_sq` of `origin`.
///
/// Players are scanned before minions. The running minimum starts at the
/// squared range, so the same comparison filters by range and selects the
/// nearest. Candidates exactly at range are eligible; on equal distance the
/// first one enumerated is kept.
#[must_use]
pub fn find_nearest_enemy(
    origin: WorldPoint,
    team: Team,
    max_range_sq: f32,
    pool: &TargetPool<'_>,
) -> Option<TargetLock> {
    let mut best: Option<TargetLock> = None;
    let mut best_sq = max_range_sq;

    for source in [pool.players, pool.minions] {
        let kind = source.kind();
        for slot in 0..source.slot_count() {
            let Some(candidate_team) = source.team(slot) else {
                continue;
            };
            if !team.is_enemy_of(candidate_team) {
                continue;
            }
            let Some(point) = source.position(slot) else {
                continue;
            };

            let dist_sq = distance_sq(origin, point);
            let closer = if best.is_some() {
                dist_sq < best_sq
            } else {
                dist_sq <= best_sq
            };
            if closer {
                best_sq = dist_sq;
                best = Some(TargetLock {
                    candidate: CandidateRef {
                        kind,
                        slot: slot as u16,
                    },
                    point,
                    distance_sq: dist_sq,
                });
            }
        }
    }

    best
}

/// Simple slot-array candidate source.
///
/// Backs player lists in drivers and tests; slots are never reused once
/// deactivated so candidate refs stay stable.
#[derive(Debug, Clone)]
pub struct CandidateList {
    kind: CandidateKind,
    slots: Vec<Option<(Team, WorldPoint)>>,
}

impl CandidateList {
    /// Creates an empty list of the given kind.
    #[must_use]
    pub fn new(kind: CandidateKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
        }
    }

    /// Creates an empty player list.
    #[must_use]
    pub fn players() -> Self {
        Self::new(CandidateKind::Player)
    }

    /// Creates an empty minion list.
    #[must_use]
    pub fn minions() -> Self {
        Self::new(CandidateKind::Minion)
    }

    /// Adds an active candidate and returns its slot.
    pub fn push(&mut self, team: Team, position: WorldPoint) -> u16 {
        self.slots.push(Some((team, position)));
        (self.slots.len() - 1) as u16
    }

    /// Adds an inactive slot.
    pub fn push_inactive(&mut self) -> u16 {
        self.slots.push(None);
        (self.slots.len() - 1) as u16
    }

    /// Marks a slot inactive.
    pub fn deactivate(&mut self, slot: u16) {
        if let Some(entry) = self.slots.get_mut(slot as usize) {
            *entry = None;
        }
    }

    /// Moves an active candidate. Returns false for inactive or unknown slots.
    pub fn set_position(&mut self, slot: u16, position: WorldPoint) -> bool {
        match self.slots.get_mut(slot as usize) {
            Some(Some((_, point))) => {
                *point = position;
                true
            },
            _ => false,
        }
    }
}

impl CandidateSource for CandidateList {
    fn kind(&self) -> CandidateKind {
        self.kind
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn team(&self, slot: usize) -> Option<Team> {
        self.slots.get(slot).copied().flatten().map(|(team, _)| team)
    }

    fn position(&self, slot: usize) -> Option<WorldPoint> {
        self.slots.get(slot).copied().flatten().map(|(_, point)| point)
    }
}
