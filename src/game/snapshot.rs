//! Frame snapshots handed to the renderer and the network layer

use serde::Serialize;

use super::combat::HitTarget;
use super::entities::{Enemy, Particle, Player, Projectile, RemotePlayer, Rock};
use super::store::{EntityId, EntityStore};

/// Things that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FrameEvent {
    /// The local player fired a volley
    Shot {
        projectile_ids: Vec<EntityId>,
        x: f32,
        z: f32,
        direction: f32,
    },
    /// An enemy fired
    EnemyShot {
        enemy_id: EntityId,
        projectile_id: EntityId,
    },
    Hit {
        projectile_id: EntityId,
        target: HitTargetView,
        damage: f32,
    },
    Destroyed {
        target: HitTargetView,
        xp: u32,
    },
    LevelUp {
        level: u32,
    },
    PlayerDied,
    PlayerRespawned,
}

/// Serializable mirror of [`HitTarget`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum HitTargetView {
    Rock(EntityId),
    Enemy(EntityId),
    Player,
}

impl From<HitTarget> for HitTargetView {
    fn from(target: HitTarget) -> Self {
        match target {
            HitTarget::Rock(id) => Self::Rock(id),
            HitTarget::Enemy(id) => Self::Enemy(id),
            HitTarget::Player => Self::Player,
        }
    }
}

/// Full world view after one tick
#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub tick: u64,
    /// Simulation time in milliseconds
    pub time: f64,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub rocks: Vec<Rock>,
    pub projectiles: Vec<Projectile>,
    pub particles: Vec<Particle>,
    pub remote_players: Vec<RemotePlayer>,
    pub events: Vec<FrameEvent>,
}

impl FrameSnapshot {
    pub fn has_event(&self, predicate: impl Fn(&FrameEvent) -> bool) -> bool {
        self.events.iter().any(predicate)
    }
}

/// Builds snapshots from the store
#[derive(Debug, Default)]
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the live world into a snapshot. Expects a compacted store.
    pub fn build(
        &self,
        store: &EntityStore,
        tick: u64,
        time: f64,
        events: Vec<FrameEvent>,
    ) -> FrameSnapshot {
        FrameSnapshot {
            tick,
            time,
            player: store.player.clone(),
            enemies: store.enemies().cloned().collect(),
            rocks: store.rocks().cloned().collect(),
            projectiles: store.projectiles().cloned().collect(),
            particles: store.particles().to_vec(),
            remote_players: store.remote_players().cloned().collect(),
            events,
        }
    }
}
