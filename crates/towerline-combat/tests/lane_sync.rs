//! End-to-end lane scenarios: a server core decides, a client core mirrors
//! it through the loopback transport.

use towerline_combat::prelude::*;
use towerline_common::{CandidateRef, StructureId, Team, WorldPoint};

#[derive(Default)]
struct CountingLoader {
    next: u32,
}

impl SkinLoader for CountingLoader {
    fn load(&mut self, _kind: SkinKind) -> Result<SkinHandle, String> {
        self.next += 1;
        Ok(SkinHandle(self.next))
    }

    fn release(&mut self, _handle: SkinHandle) {}
}

struct Match {
    server: CombatCore,
    client: CombatCore,
    tx: LoopbackSender,
    rx: LoopbackReceiver,
}

impl Match {
    fn new(config: MatchConfig) -> Self {
        let mut loader = CountingLoader::default();
        let server = CombatCore::init(config.clone(), Authority::Server, &mut loader).expect("server init");
        let client = CombatCore::init(config, Authority::Client, &mut loader).expect("client init");
        let (tx, rx) = loopback(256);
        Self { server, client, tx, rx }
    }

    fn hit(&mut self, target: StructureId, damage: f32) -> DamageOutcome {
        self.server
            .apply_damage(target, DamageMode::ServerAuthoritative { damage }, &mut self.tx)
    }

    fn deliver(&mut self) -> Vec<IngressOutcome> {
        let players = CandidateList::players();
        let minions = CandidateList::minions();
        let pool = TargetPool::new(&players, &minions);
        self.rx
            .drain()
            .into_iter()
            .map(|message| self.client.receive(message, &pool))
            .collect()
    }

    fn assert_converged(&self) {
        for (id, server) in self.server.roster().iter() {
            let client = self.client.roster().get(id).expect("same roster");
            assert_eq!(client.health(), server.health(), "{id}");
            assert_eq!(client.is_destroyed(), server.is_destroyed(), "{id}");
            assert_eq!(client.is_immune(), server.is_immune(), "{id}");
        }
    }
}

#[test]
fn scenario_a_tower_fires_once_at_minion_in_range() {
    let mut config = MatchConfig::default();
    config.tower = config.tower.with_range(200.0);
    let mut game = Match::new(config);

    // Red front tower at (900, 540); Blue minion 50 units away.
    let players = CandidateList::players();
    let mut minions = CandidateList::minions();
    minions.push(Team::Blue, WorldPoint::new(950.0, 540.0));
    let mut attacks: Vec<AttackRequest> = Vec::new();

    game.server.update(
        0.016,
        &mut TickContext {
            players: &players,
            minions: &minions,
            attacks: &mut attacks,
        },
    );

    assert_eq!(attacks.len(), 1);
    assert_eq!(attacks[0].source, AttackSource::Structure(StructureId::tower(1)));
    assert_eq!(attacks[0].victim, CandidateRef::minion(0));
    assert_eq!(attacks[0].target, WorldPoint::new(950.0, 540.0));

    let tower = game.server.roster().get(StructureId::tower(1)).expect("tower");
    assert_eq!(tower.cooldown(), tower.attack_cooldown());
    assert_eq!(tower.health(), tower.max_health());

    // Next tick: still cooling down, nothing new.
    game.server.update(
        0.016,
        &mut TickContext {
            players: &players,
            minions: &minions,
            attacks: &mut attacks,
        },
    );
    assert_eq!(attacks.len(), 1);
    assert!(game
        .server
        .events()
        .drain()
        .iter()
        .any(|e| matches!(e, CombatEvent::AttackSpawned { .. })));
}

#[test]
fn scenario_b_overkill_clamps_and_client_converges() {
    let mut config = MatchConfig::default();
    config.tower = config.tower.with_health(100.0);
    let mut game = Match::new(config);
    let front = StructureId::tower(3);

    game.hit(front, 70.0);
    let outcome = game.hit(front, 40.0);
    let report = outcome.report().expect("applied");
    assert_eq!(report.health, 0.0);
    assert!(report.destroyed);

    let delivered = game.deliver();
    assert_eq!(delivered.len(), 2);
    game.assert_converged();
    assert_eq!(game.client.roster().get(front).map(CombatEntity::health), Some(0.0));
}

#[test]
fn scenario_c_immunity_chain_propagates_to_client() {
    let mut game = Match::new(MatchConfig::default());
    let front = StructureId::tower(1);
    let rear = StructureId::tower(0);
    let base = StructureId::Base(Team::Red);

    // Rear and base are immune while the front stands.
    assert_eq!(game.hit(rear, 100.0), DamageOutcome::Ignored(IgnoreReason::Immune));
    assert_eq!(game.hit(base, 100.0), DamageOutcome::Ignored(IgnoreReason::Immune));

    let outcome = game.hit(front, 10_000.0);
    assert_eq!(outcome.report().and_then(|r| r.immunity_lifted), Some(rear));
    game.deliver();
    game.assert_converged();
    assert!(!game.client.roster().get(rear).expect("rear").is_immune());
    assert!(game.client.roster().get(base).expect("base").is_immune());

    let outcome = game.hit(rear, 10_000.0);
    assert_eq!(outcome.report().and_then(|r| r.immunity_lifted), Some(base));
    // Hitting the wreck again changes nothing anywhere.
    assert_eq!(game.hit(front, 5.0), DamageOutcome::Ignored(IgnoreReason::AlreadyDestroyed));
    game.deliver();
    game.assert_converged();
    assert!(!game.client.roster().get(base).expect("base").is_immune());

    let outcome = game.hit(base, 10_000.0);
    assert!(outcome.report().is_some_and(|r| r.destroyed && r.immunity_lifted.is_none()));
    game.deliver();
    game.assert_converged();
    assert!(game.client.roster().is_defeated(Team::Red));
    assert!(!game.client.roster().is_defeated(Team::Blue));
}

#[test]
fn reordered_notices_never_roll_health_back() {
    let mut game = Match::new(MatchConfig::default());
    let front = StructureId::tower(3);

    game.hit(front, 10.0);
    game.hit(front, 10.0);
    game.hit(front, 10.0);

    let mut messages = game.rx.drain();
    messages.reverse();
    let players = CandidateList::players();
    let minions = CandidateList::minions();
    let pool = TargetPool::new(&players, &minions);

    let outcomes: Vec<_> = messages
        .into_iter()
        .map(|m| game.client.receive(m, &pool))
        .collect();

    assert!(matches!(outcomes[0], IngressOutcome::Applied(_)));
    assert_eq!(outcomes[1], IngressOutcome::Stale { sequence: 2 });
    assert_eq!(outcomes[2], IngressOutcome::Stale { sequence: 1 });
    assert_eq!(game.client.roster().get(front).map(CombatEntity::health), Some(470.0));
}

#[test]
fn snapshot_overrides_client_prediction() {
    let mut game = Match::new(MatchConfig::default());
    let front = StructureId::tower(1);
    let mut sink: Vec<WireMessage> = Vec::new();

    // Client-local value drifts from the server's.
    game.client
        .apply_damage(front, DamageMode::ClientSnapshot { damage: 0.0, health: 40.0 }, &mut sink);
    assert!(sink.is_empty());

    let players = CandidateList::players();
    let minions = CandidateList::minions();
    let pool = TargetPool::new(&players, &minions);
    let notice = WireMessage::DamageApplied(DamageNotice {
        sequence: 1,
        target: front,
        damage: 15.0,
        health: 25.0,
    });
    game.client.receive(notice, &pool);
    assert_eq!(game.client.roster().get(front).map(CombatEntity::health), Some(25.0));
}

#[test]
fn notice_behind_its_protector_waits_then_applies() {
    let mut game = Match::new(MatchConfig::default());
    let front = StructureId::tower(1);
    let rear = StructureId::tower(0);

    game.hit(front, 10_000.0);
    game.hit(rear, 10_000.0);

    // The rear tower's notice overtakes the front tower's.
    let mut messages = game.rx.drain();
    messages.reverse();
    let players = CandidateList::players();
    let minions = CandidateList::minions();
    let pool = TargetPool::new(&players, &minions);

    let first = game.client.receive(messages[0], &pool);
    assert_eq!(first, IngressOutcome::Held { sequence: 1 });
    assert!(!game.client.roster().get(rear).expect("rear").is_destroyed());

    let second = game.client.receive(messages[1], &pool);
    assert!(matches!(second, IngressOutcome::Applied(DamageOutcome::Applied(_))));
    game.assert_converged();
    assert!(game.client.roster().get(rear).expect("rear").is_destroyed());
    assert!(!game.client.roster().get(StructureId::Base(Team::Red)).expect("base").is_immune());

    // A transport retry of either notice is now a harmless duplicate.
    for message in messages {
        assert!(matches!(game.client.receive(message, &pool), IngressOutcome::Stale { .. }));
    }
    game.assert_converged();
}

#[test]
fn retried_notice_for_immune_structure_is_not_lost() {
    let mut game = Match::new(MatchConfig::default());
    let front = StructureId::tower(3);
    let rear = StructureId::tower(2);

    game.hit(front, 10_000.0);
    game.hit(rear, 200.0);
    let messages = game.rx.drain();
    let players = CandidateList::players();
    let minions = CandidateList::minions();
    let pool = TargetPool::new(&players, &minions);

    // Rear notice arrives twice before the front one.
    assert_eq!(game.client.receive(messages[1], &pool), IngressOutcome::Held { sequence: 1 });
    assert_eq!(game.client.receive(messages[1], &pool), IngressOutcome::Held { sequence: 1 });
    game.client.receive(messages[0], &pool);

    game.assert_converged();
    assert_eq!(game.client.roster().get(rear).map(CombatEntity::health), Some(300.0));
}
