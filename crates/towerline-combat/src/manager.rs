//! Session-owned combat context.
//!
//! [`CombatCore`] owns the roster, the sync bookkeeping and the structure
//! skins for one match. The frame driver calls [`CombatCore::update`],
//! [`CombatCore::render`] and [`CombatCore::cleanup`]; collaborators are
//! passed in per call instead of being reached through global state.

use thiserror::Error;
use towerline_common::{StructureId, Team, TowerlineError, WorldPoint};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, MatchConfig};
use crate::damage::{resolve_damage, DamageMode, DamageOutcome, IgnoreReason};
use crate::entity::{Appearance, EntityKind};
use crate::events::{CombatEvent, EventBus};
use crate::roster::CombatRoster;
use crate::scheduler::{AttackScheduler, AttackSource, AttackSpawner, Authority, SchedulerOutcome};
use crate::sync::{review_claim, ClaimVerdict, ClientSync, DamageNotice, HitClaim, ServerSync, SyncChannel, WireMessage};
use crate::targeting::{CandidateSource, TargetPool};

/// Combat core error types.
#[derive(Debug, Error)]
pub enum CombatError {
    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// A structure skin could not be loaded
    #[error("failed to load {kind:?} skin: {reason}")]
    SkinLoad {
        /// Skin that failed
        kind: SkinKind,
        /// Loader message
        reason: String,
    },
}

/// Result type for combat core operations.
pub type CombatResult<T> = Result<T, CombatError>;

impl From<CombatError> for TowerlineError {
    fn from(err: CombatError) -> Self {
        match err {
            CombatError::Config(e) => Self::Config(e.to_string()),
            e @ CombatError::SkinLoad { .. } => Self::Init(e.to_string()),
        }
    }
}

/// Opaque handle to a loaded skin, owned by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkinHandle(pub u32);

/// The three structure skins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkinKind {
    /// Red team structures
    Red,
    /// Blue team structures
    Blue,
    /// Destroyed structures
    Destroyed,
}

/// Loads and releases skins on behalf of the core.
pub trait SkinLoader {
    /// Loads a skin.
    fn load(&mut self, kind: SkinKind) -> Result<SkinHandle, String>;
    /// Releases a previously loaded skin.
    fn release(&mut self, handle: SkinHandle);
}

#[derive(Debug, Clone, Copy)]
struct StructureSkins {
    red: SkinHandle,
    blue: SkinHandle,
    destroyed: SkinHandle,
}

impl StructureSkins {
    fn load(loader: &mut dyn SkinLoader) -> CombatResult<Self> {
        let mut loaded = Vec::with_capacity(3);
        for kind in [SkinKind::Red, SkinKind::Blue, SkinKind::Destroyed] {
            match loader.load(kind) {
                Ok(handle) => loaded.push(handle),
                Err(reason) => {
                    for handle in loaded {
                        loader.release(handle);
                    }
                    return Err(CombatError::SkinLoad { kind, reason });
                },
            }
        }
        Ok(Self {
            red: loaded[0],
            blue: loaded[1],
            destroyed: loaded[2],
        })
    }

    fn for_appearance(&self, appearance: Appearance) -> SkinHandle {
        match appearance {
            Appearance::Team(Team::Red) => self.red,
            Appearance::Team(Team::Blue) => self.blue,
            Appearance::Destroyed => self.destroyed,
        }
    }

    fn release(self, loader: &mut dyn SkinLoader) {
        loader.release(self.red);
        loader.release(self.blue);
        loader.release(self.destroyed);
    }
}

/// Everything a structure needs to be drawn. No combat logic.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureView {
    /// Structure id
    pub id: StructureId,
    /// Tower or base
    pub kind: EntityKind,
    /// World position
    pub position: WorldPoint,
    /// Owning team
    pub team: Team,
    /// Current health
    pub health: f32,
    /// Maximum health
    pub max_health: f32,
    /// Destroyed flag
    pub destroyed: bool,
    /// Skin to draw
    pub skin: SkinHandle,
    /// Health label, e.g. `"460/500"`
    pub label: String,
}

/// External drawing routine.
pub trait StructureRenderer {
    /// Draws one structure.
    fn draw_structure(&mut self, view: &StructureView);
}

/// Collaborators for one tick.
pub struct TickContext<'a> {
    /// Player positions
    pub players: &'a dyn CandidateSource,
    /// Minion positions
    pub minions: &'a dyn CandidateSource,
    /// Attack subsystem
    pub attacks: &'a mut dyn AttackSpawner,
}

/// What happened to an incoming wire message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngressOutcome {
    /// A damage notice was applied
    Applied(DamageOutcome),
    /// A notice older than one already applied was dropped
    Stale {
        /// Dropped sequence
        sequence: u64,
    },
    /// A notice for a structure still immune on this client was parked
    /// until its protector's notice is applied
    Held {
        /// Parked sequence
        sequence: u64,
    },
    /// A hit claim was reviewed (never applied)
    Reviewed(ClaimVerdict),
    /// Message not meant for this authority
    Discarded,
}

/// The combat core for one session.
#[derive(Debug)]
pub struct CombatCore {
    config: MatchConfig,
    scheduler: AttackScheduler,
    roster: CombatRoster,
    server_sync: ServerSync,
    client_sync: ClientSync,
    events: EventBus,
    skins: Option<StructureSkins>,
}

impl CombatCore {
    /// Validates the configuration, loads skins and builds the roster.
    ///
    /// On failure nothing stays loaded.
    pub fn init(config: MatchConfig, authority: Authority, loader: &mut dyn SkinLoader) -> CombatResult<Self> {
        config.validate()?;
        let skins = StructureSkins::load(loader)?;
        let roster = CombatRoster::new(&config);
        let events = EventBus::new(config.sync.channel_capacity);

        info!(
            "Combat core initialized as {:?} with {} structures",
            authority,
            roster.len()
        );

        Ok(Self {
            config,
            scheduler: AttackScheduler::new(authority),
            roster,
            server_sync: ServerSync::new(),
            client_sync: ClientSync::new(),
            events,
            skins: Some(skins),
        })
    }

    /// Role of this core.
    #[must_use]
    pub const fn authority(&self) -> Authority {
        self.scheduler.authority()
    }

    /// Match configuration.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Structure state.
    #[must_use]
    pub const fn roster(&self) -> &CombatRoster {
        &self.roster
    }

    /// Event bus for HUD/audio consumers.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Whether [`Self::cleanup`] has run.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.skins.is_none()
    }

    /// Per-frame update. Structures attack only on the server.
    pub fn update(&mut self, dt: f32, ctx: &mut TickContext<'_>) {
        if !self.authority().is_server() {
            return;
        }

        let pool = TargetPool::new(ctx.players, ctx.minions);
        for (id, entity) in self.roster.iter_mut() {
            let outcome = self
                .scheduler
                .tick(entity, AttackSource::Structure(id), dt, &pool, ctx.attacks);
            if let SchedulerOutcome::Attacked(request) = outcome {
                self.events.publish(CombatEvent::attack(&request));
            }
        }
    }

    /// Hands every structure to the renderer.
    pub fn render(&self, renderer: &mut dyn StructureRenderer) {
        let Some(skins) = self.skins else {
            return;
        };
        for (id, entity) in self.roster.iter() {
            renderer.draw_structure(&StructureView {
                id,
                kind: entity.kind(),
                position: entity.position(),
                team: entity.team(),
                health: entity.health(),
                max_health: entity.max_health(),
                destroyed: entity.is_destroyed(),
                skin: skins.for_appearance(entity.appearance()),
                label: format!("{:.0}/{:.0}", entity.health(), entity.max_health()),
            });
        }
    }

    /// Releases skins. Safe to call more than once.
    pub fn cleanup(&mut self, loader: &mut dyn SkinLoader) {
        if let Some(skins) = self.skins.take() {
            info!("Cleaning up combat core resources");
            skins.release(loader);
        }
    }

    /// Single entry point for structure health changes.
    ///
    /// The server accepts only [`DamageMode::ServerAuthoritative`] and pushes
    /// a notice for every applied hit; a client accepts only
    /// [`DamageMode::ClientSnapshot`].
    pub fn apply_damage(
        &mut self,
        target: StructureId,
        mode: DamageMode,
        channel: &mut dyn SyncChannel,
    ) -> DamageOutcome {
        let allowed = matches!(
            (self.authority(), mode),
            (Authority::Server, DamageMode::ServerAuthoritative { .. })
                | (Authority::Client, DamageMode::ClientSnapshot { .. })
        );
        if !allowed {
            warn!("Refusing {mode:?} on {target} as {:?}", self.authority());
            return DamageOutcome::Ignored(IgnoreReason::NotAuthoritative);
        }

        let outcome = resolve_damage(&mut self.roster, target, mode);
        let DamageOutcome::Applied(report) = outcome else {
            return outcome;
        };

        if self.authority().is_server() {
            let notice = self.server_sync.notice(target, report.damage, report.health);
            channel.send(WireMessage::DamageApplied(notice));
        }

        self.events.publish(CombatEvent::StructureDamaged {
            target,
            damage: report.damage,
            health: report.health,
        });
        if report.destroyed {
            self.events.publish(CombatEvent::StructureDestroyed { target });
        }
        if let Some(lifted) = report.immunity_lifted {
            self.events.publish(CombatEvent::ImmunityLifted {
                target: lifted,
                by: target,
            });
        }
        outcome
    }

    /// Handles one incoming wire message.
    ///
    /// Clients apply damage notices in sequence order. The server reviews
    /// hit claims against its own targeting and never applies them.
    pub fn receive(&mut self, message: WireMessage, pool: &TargetPool<'_>) -> IngressOutcome {
        match (self.authority(), message) {
            (Authority::Client, WireMessage::DamageApplied(notice)) => {
                if !self.client_sync.is_newer(&notice) {
                    warn!(
                        "Dropping stale notice {} for {} (last applied {})",
                        notice.sequence,
                        notice.target,
                        self.client_sync.last_applied(notice.target)
                    );
                    return IngressOutcome::Stale {
                        sequence: notice.sequence,
                    };
                }
                let outcome = self.apply_notice(&notice);
                if outcome == DamageOutcome::Ignored(IgnoreReason::Immune) {
                    // The protector's notice has not arrived yet.
                    debug!("Holding notice {} for {} until it loses immunity", notice.sequence, notice.target);
                    self.client_sync.hold(notice);
                    return IngressOutcome::Held {
                        sequence: notice.sequence,
                    };
                }
                self.replay_held(outcome);
                IngressOutcome::Applied(outcome)
            },
            (Authority::Server, WireMessage::HitClaim(claim)) => IngressOutcome::Reviewed(self.review_claim(&claim, pool)),
            (authority, message) => {
                debug!("Discarding {message:?} received as {authority:?}");
                IngressOutcome::Discarded
            },
        }
    }

    /// Applies one server notice as a snapshot and commits its sequence
    /// unless immunity blocked it.
    fn apply_notice(&mut self, notice: &DamageNotice) -> DamageOutcome {
        let mode = DamageMode::ClientSnapshot {
            damage: notice.damage,
            health: notice.health,
        };
        // Clients never send anything back for a snapshot.
        let mut no_reply: Vec<WireMessage> = Vec::new();
        let outcome = self.apply_damage(notice.target, mode, &mut no_reply);
        if outcome != DamageOutcome::Ignored(IgnoreReason::Immune) {
            self.client_sync.commit(notice);
        }
        outcome
    }

    /// Walks the immunity chain, applying notices that were waiting on it.
    fn replay_held(&mut self, outcome: DamageOutcome) {
        let mut lifted = outcome.report().and_then(|r| r.immunity_lifted);
        while let Some(target) = lifted {
            let Some(held) = self.client_sync.take_held(target) else {
                break;
            };
            debug!("Replaying held notice {} for {target}", held.sequence);
            lifted = self.apply_notice(&held).report().and_then(|r| r.immunity_lifted);
        }
    }

    /// Reviews a client hit claim. Health is never touched.
    pub fn review_claim(&self, claim: &HitClaim, pool: &TargetPool<'_>) -> ClaimVerdict {
        let verdict = review_claim(&self.roster, claim, pool);
        match verdict {
            ClaimVerdict::Plausible => {
                debug!("Hit claim from {:?} against {} is plausible", claim.claimant, claim.source);
            },
            ClaimVerdict::Rejected(reason) => {
                warn!(
                    "Rejected hit claim from {:?} against {}: {reason:?}",
                    claim.claimant, claim.source
                );
                self.events.publish(CombatEvent::ClaimRejected {
                    source: claim.source,
                    reason,
                });
            },
        }
        verdict
    }
}
