//! Fixed per-match roster of towers and bases with explicit lane topology.
//!
//! Each team's towers are stored rear to front. The front tower is the only
//! vulnerable tower at match start; each tower protects the one behind it,
//! and the rear tower protects the team base.

use towerline_common::{StructureId, Team, TowerIndex, WorldPoint};

use crate::config::MatchConfig;
use crate::entity::{CombatEntity, EntityKind};

/// All static combat structures of a match. Allocated once, never resized.
#[derive(Debug, Clone)]
pub struct CombatRoster {
    towers: Vec<CombatEntity>,
    bases: [CombatEntity; 2],
    towers_per_team: usize,
}

impl CombatRoster {
    /// Builds the starting roster. `config` must already have passed
    /// [`MatchConfig::validate`]; [`crate::CombatCore::init`] is the public
    /// way in.
    #[must_use]
    pub(crate) fn new(config: &MatchConfig) -> Self {
        let layout = &config.layout;
        let per_team = layout.towers_per_team;
        let mut towers = Vec::with_capacity(per_team * 2);

        for team in Team::ALL {
            for rank in 0..per_team {
                // Distance from the front, in tower spacings.
                let behind = (per_team - 1 - rank) as f32;
                let x = match team {
                    Team::Red => layout.red_front_x - behind * layout.spacing_x,
                    Team::Blue => layout.blue_front_x + behind * layout.spacing_x,
                };
                let protected = if rank == 0 {
                    StructureId::Base(team)
                } else {
                    StructureId::tower((team.index() * per_team + rank - 1) as u8)
                };
                let is_front = rank + 1 == per_team;

                towers.push(
                    CombatEntity::new(
                        EntityKind::Tower,
                        team,
                        WorldPoint::new(x, layout.buildings_y),
                        &config.tower,
                    )
                    .with_immunity(!is_front)
                    .protecting(protected),
                );
            }
        }

        let base = |team: Team, x: f32| {
            CombatEntity::new(
                EntityKind::Base,
                team,
                WorldPoint::new(x, layout.buildings_y),
                &config.base,
            )
            .with_immunity(true)
        };

        Self {
            towers,
            bases: [
                base(Team::Red, layout.red_base_x),
                base(Team::Blue, layout.blue_base_x),
            ],
            towers_per_team: per_team,
        }
    }

    /// Towers per team.
    #[must_use]
    pub const fn towers_per_team(&self) -> usize {
        self.towers_per_team
    }

    /// Total number of structures (towers and bases).
    #[must_use]
    pub fn len(&self) -> usize {
        self.towers.len() + self.bases.len()
    }

    /// Always false; a roster has at least one tower and two bases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Looks up a structure.
    #[must_use]
    pub fn get(&self, id: StructureId) -> Option<&CombatEntity> {
        match id {
            StructureId::Tower(index) => self.towers.get(index.as_usize()),
            StructureId::Base(team) => Some(&self.bases[team.index()]),
        }
    }

    /// Looks up a structure mutably.
    pub fn get_mut(&mut self, id: StructureId) -> Option<&mut CombatEntity> {
        match id {
            StructureId::Tower(index) => self.towers.get_mut(index.as_usize()),
            StructureId::Base(team) => Some(&mut self.bases[team.index()]),
        }
    }

    /// Ids of every structure: towers in index order, then Red and Blue bases.
    pub fn ids(&self) -> impl Iterator<Item = StructureId> {
        let towers = (0..self.towers.len()).map(|i| StructureId::Tower(TowerIndex::new(i as u8)));
        towers.chain(Team::ALL.into_iter().map(StructureId::Base))
    }

    /// Iterates structures with their ids in [`Self::ids`] order.
    pub fn iter(&self) -> impl Iterator<Item = (StructureId, &CombatEntity)> {
        let towers = self
            .towers
            .iter()
            .enumerate()
            .map(|(i, t)| (StructureId::Tower(TowerIndex::new(i as u8)), t));
        let bases = Team::ALL
            .into_iter()
            .zip(self.bases.iter())
            .map(|(team, b)| (StructureId::Base(team), b));
        towers.chain(bases)
    }

    /// Mutable iteration in [`Self::ids`] order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (StructureId, &mut CombatEntity)> {
        let towers = self
            .towers
            .iter_mut()
            .enumerate()
            .map(|(i, t)| (StructureId::Tower(TowerIndex::new(i as u8)), t));
        let bases = Team::ALL
            .into_iter()
            .zip(self.bases.iter_mut())
            .map(|(team, b)| (StructureId::Base(team), b));
        towers.chain(bases)
    }

    /// Tower ids of one team, rear to front.
    pub fn team_towers(&self, team: Team) -> impl Iterator<Item = StructureId> {
        let start = team.index() * self.towers_per_team;
        (start..start + self.towers_per_team).map(|i| StructureId::tower(i as u8))
    }

    /// The protector tower of a team's lane.
    #[must_use]
    pub fn front_tower(&self, team: Team) -> StructureId {
        StructureId::tower(((team.index() + 1) * self.towers_per_team - 1) as u8)
    }

    /// The first structure of `team` an attacker marching down the lane
    /// reaches: the front-most surviving tower, else the base.
    #[must_use]
    pub fn lane_target(&self, team: Team) -> StructureId {
        let mut towers: Vec<_> = self.team_towers(team).collect();
        towers.reverse();
        towers
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|t| !t.is_destroyed()))
            .unwrap_or(StructureId::Base(team))
    }

    /// Number of surviving structures of a team, base included.
    #[must_use]
    pub fn alive_count(&self, team: Team) -> usize {
        self.iter()
            .filter(|(_, e)| e.team() == team && !e.is_destroyed())
            .count()
    }

    /// Whether a team's base has fallen.
    #[must_use]
    pub fn is_defeated(&self, team: Team) -> bool {
        self.bases[team.index()].is_destroyed()
    }
}
