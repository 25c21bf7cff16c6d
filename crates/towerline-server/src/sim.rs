//! Headless lane match.
//!
//! Drives a server-role [`CombatCore`] at a fixed step against scripted
//! minion waves and mirrors every damage notice into a client-role core over
//! the in-process loopback. Nothing is drawn; skins are plain counters.

use fastrand::Rng;
use towerline_combat::prelude::*;
use towerline_common::{
    within_range, CandidateKind, StructureId, Team, TowerlineResult, WorldPoint,
};
use tracing::{debug, info};

use crate::config::ServerConfig;

/// Hands out sequential handles; nothing is ever loaded.
#[derive(Debug, Default)]
pub struct HeadlessSkins {
    next: u32,
    live: u32,
}

impl HeadlessSkins {
    /// Number of handles not yet released.
    #[must_use]
    pub const fn live(&self) -> u32 {
        self.live
    }
}

impl SkinLoader for HeadlessSkins {
    fn load(&mut self, kind: SkinKind) -> Result<SkinHandle, String> {
        self.next += 1;
        self.live += 1;
        debug!("Headless skin {kind:?} -> {}", self.next);
        Ok(SkinHandle(self.next))
    }

    fn release(&mut self, _handle: SkinHandle) {
        self.live = self.live.saturating_sub(1);
    }
}

/// Logs each structure's HUD line.
struct LogRenderer;

impl StructureRenderer for LogRenderer {
    fn draw_structure(&mut self, view: &StructureView) {
        info!(
            "{:>10} {:>4} at ({:.0}, {:.0}) {}{}",
            view.id.to_string(),
            view.team.to_string(),
            view.position.x,
            view.position.y,
            view.label,
            if view.destroyed { " [destroyed]" } else { "" }
        );
    }
}

/// Live minions of both teams. Dead minions leave an empty slot so that
/// slot numbers handed to the resolver stay stable.
#[derive(Debug, Default)]
pub struct MinionWave {
    slots: Vec<Option<CombatEntity>>,
}

impl MinionWave {
    /// Adds a minion, reusing the first empty slot.
    pub fn spawn(&mut self, minion: CombatEntity) -> u16 {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            self.slots[index] = Some(minion);
            return index as u16;
        }
        self.slots.push(Some(minion));
        (self.slots.len() - 1) as u16
    }

    /// Minion in `slot`, if alive.
    #[must_use]
    pub fn get(&self, slot: u16) -> Option<&CombatEntity> {
        self.slots.get(slot as usize).and_then(Option::as_ref)
    }

    fn targetable(&self, slot: usize) -> Option<&CombatEntity> {
        self.slots
            .get(slot)?
            .as_ref()
            .filter(|minion| minion.is_targetable())
    }

    /// Number of live minions of a team.
    #[must_use]
    pub fn alive(&self, team: Team) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|m| m.team() == team)
            .count()
    }

    /// Applies a hit; a destroyed minion frees its slot. Returns true if
    /// the minion died.
    pub fn hit(&mut self, slot: u16, damage: f32) -> bool {
        let Some(entry) = self.slots.get_mut(slot as usize) else {
            return false;
        };
        let Some(minion) = entry.as_mut() else {
            return false;
        };
        match strike(minion, DamageMode::ServerAuthoritative { damage }) {
            Ok(hit) if hit.destroyed => {
                *entry = None;
                true
            },
            _ => false,
        }
    }
}

impl CandidateSource for MinionWave {
    fn kind(&self) -> CandidateKind {
        CandidateKind::Minion
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn team(&self, slot: usize) -> Option<Team> {
        self.targetable(slot).map(CombatEntity::team)
    }

    fn position(&self, slot: usize) -> Option<WorldPoint> {
        self.targetable(slot).map(CombatEntity::position)
    }
}

/// Final state of one structure on both sides of the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureSummary {
    /// Structure
    pub id: StructureId,
    /// Health on the server
    pub server_health: f32,
    /// Health mirrored on the client
    pub client_health: f32,
    /// Destroyed on the server
    pub destroyed: bool,
}

impl StructureSummary {
    /// True if the client mirrors the server exactly.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.server_health == self.client_health
    }
}

/// Outcome of a headless match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    /// Steps actually simulated
    pub ticks: u32,
    /// Team whose opponent lost its base, if any
    pub winner: Option<Team>,
    /// Minions spawned over the match
    pub minions_spawned: u32,
    /// Minions killed by structures
    pub minions_killed: u32,
    /// Structure damage notices sent to the client
    pub notices_sent: u32,
    /// Per-structure final state
    pub structures: Vec<StructureSummary>,
}

impl MatchReport {
    /// True if every structure has identical health on both sides.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.structures.iter().all(StructureSummary::converged)
    }
}

/// Everything one headless match owns.
struct Lane {
    config: ServerConfig,
    rng: Rng,
    server: CombatCore,
    client: CombatCore,
    scheduler: AttackScheduler,
    tx: LoopbackSender,
    rx: LoopbackReceiver,
    players: CandidateList,
    minions: MinionWave,
    report: MatchReport,
}

impl Lane {
    fn new(config: ServerConfig, skins: &mut HeadlessSkins) -> TowerlineResult<Self> {
        let server = CombatCore::init(config.combat.clone(), Authority::Server, skins)?;
        let client = CombatCore::init(config.combat.clone(), Authority::Client, skins)?;
        let (tx, rx) = loopback(config.combat.sync.channel_capacity);
        let rng = Rng::with_seed(config.driver.seed);

        Ok(Self {
            config,
            rng,
            server,
            client,
            scheduler: AttackScheduler::new(Authority::Server),
            tx,
            rx,
            players: CandidateList::players(),
            minions: MinionWave::default(),
            report: MatchReport {
                ticks: 0,
                winner: None,
                minions_spawned: 0,
                minions_killed: 0,
                notices_sent: 0,
                structures: Vec::new(),
            },
        })
    }

    fn spawn_wave(&mut self) {
        let layout = &self.config.combat.layout;
        for team in Team::ALL {
            let x = match team {
                Team::Red => layout.red_base_x,
                Team::Blue => layout.blue_base_x,
            };
            for _ in 0..self.config.driver.wave_size {
                let offset = (self.rng.f32() * 2.0 - 1.0) * self.config.driver.spawn_jitter;
                let position = WorldPoint::new(x, layout.buildings_y + offset);
                let minion = CombatEntity::new(EntityKind::Minion, team, position, &self.config.combat.minion);
                self.minions.spawn(minion);
                self.report.minions_spawned += 1;
            }
        }
        debug!("Wave spawned, {} minions on the lane", self.minions.slots.len());
    }

    /// Structures fire at minions; shots land instantly.
    fn structures_fire(&mut self, dt: f32) {
        let mut attacks: Vec<AttackRequest> = Vec::new();
        self.server.update(
            dt,
            &mut TickContext {
                players: &self.players,
                minions: &self.minions,
                attacks: &mut attacks,
            },
        );

        let combat = &self.config.combat;
        for attack in attacks {
            if attack.victim.kind != CandidateKind::Minion {
                continue;
            }
            let damage = match attack.kind {
                AttackKind::TowerShot => combat.tower.attack_damage,
                AttackKind::MinionStrike => combat.minion.attack_damage,
            };
            if self.minions.hit(attack.victim.slot, damage) {
                self.report.minions_killed += 1;
            }
        }
    }

    /// Minions walk toward the enemy's lane target and strike it in range.
    fn minions_advance(&mut self, dt: f32) {
        let speed = self.config.driver.minion_speed;
        let damage = self.config.combat.minion.attack_damage;

        for slot in 0..self.minions.slots.len() {
            let Some(minion) = self.minions.slots[slot].as_mut() else {
                continue;
            };
            let target = self.server.roster().lane_target(minion.team().opponent());
            let Some(goal) = self.server.roster().get(target).map(CombatEntity::position) else {
                continue;
            };

            let ready = self.scheduler.charge(minion, dt).is_ok();
            if !within_range(minion.position(), goal, minion.attack_range()) {
                let to_goal = goal - minion.position();
                let distance = to_goal.length();
                let step = (speed * dt).min(distance - minion.attack_range()).max(0.0);
                minion.relocate(minion.position() + to_goal / distance * step);
                continue;
            }
            if !ready {
                continue;
            }

            minion.reset_cooldown();
            let outcome = self.server.apply_damage(
                target,
                DamageMode::ServerAuthoritative { damage },
                &mut self.tx,
            );
            if outcome.report().is_some() {
                self.report.notices_sent += 1;
            }
        }
    }

    fn mirror_to_client(&mut self) {
        let empty = CandidateList::minions();
        let pool = TargetPool::new(&self.players, &empty);
        for message in self.rx.drain() {
            self.client.receive(message, &pool);
        }
        // Collaborators would consume these; keep the bounded buses flowing.
        for event in self.server.events().drain() {
            if let CombatEvent::StructureDestroyed { target } = event {
                info!("Server saw {target} fall");
            }
        }
        self.client.events().drain();
    }

    fn run(mut self, skins: &mut HeadlessSkins) -> MatchReport {
        let driver = self.config.driver.clone();
        let dt = driver.step();
        let wave_every = (driver.wave_interval / dt).round().max(1.0) as u32;

        for tick in 0..driver.ticks {
            if tick % wave_every == 0 {
                self.spawn_wave();
            }
            self.structures_fire(dt);
            self.minions_advance(dt);
            self.mirror_to_client();
            self.report.ticks = tick + 1;

            let defeated = Team::ALL.into_iter().find(|&t| self.server.roster().is_defeated(t));
            if let Some(loser) = defeated {
                self.report.winner = Some(loser.opponent());
                info!("{loser} base destroyed at tick {tick}");
                break;
            }
        }

        self.client.render(&mut LogRenderer);
        self.report.structures = self
            .server
            .roster()
            .iter()
            .map(|(id, server)| StructureSummary {
                id,
                server_health: server.health(),
                client_health: self.client.roster().get(id).map_or(f32::NAN, CombatEntity::health),
                destroyed: server.is_destroyed(),
            })
            .collect();

        self.server.cleanup(skins);
        self.client.cleanup(skins);
        self.report
    }
}

/// Runs one headless match to completion.
pub fn run(config: ServerConfig) -> TowerlineResult<MatchReport> {
    let mut skins = HeadlessSkins::default();
    info!(
        "Starting headless match: {} ticks at {} Hz, seed {}",
        config.driver.ticks, config.driver.tick_rate, config.driver.seed
    );
    let lane = Lane::new(config, &mut skins)?;
    let report = lane.run(&mut skins);
    debug!("{} skin handles outstanding after cleanup", skins.live());
    Ok(report)
}
