//! Canonical entity collections for one local simulation
//!
//! Removal is deferred: systems mark ids during a tick and `compact` drops
//! them at the end. Marked entities are hidden from iteration, so nothing is
//! processed twice or skipped while a tick is in flight.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::{Enemy, Particle, Player, Projectile, RemotePlayer, Rock};

/// Store-unique entity id. Allocated from a counter and never reused.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct EntityStore {
    next_id: u64,
    pub player: Player,
    enemies: BTreeMap<EntityId, Enemy>,
    rocks: BTreeMap<EntityId, Rock>,
    projectiles: BTreeMap<EntityId, Projectile>,
    particles: Vec<Particle>,
    remote_players: BTreeMap<Uuid, RemotePlayer>,
    pending_removal: BTreeSet<EntityId>,
}

impl EntityStore {
    pub fn new(player: Player) -> Self {
        Self {
            next_id: 1,
            player,
            enemies: BTreeMap::new(),
            rocks: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            particles: Vec::new(),
            remote_players: BTreeMap::new(),
            pending_removal: BTreeSet::new(),
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    // Inserts assign the id, overwriting whatever the entity carried.

    pub fn insert_enemy(&mut self, mut enemy: Enemy) -> EntityId {
        let id = self.allocate_id();
        enemy.id = id;
        self.enemies.insert(id, enemy);
        id
    }

    pub fn insert_rock(&mut self, mut rock: Rock) -> EntityId {
        let id = self.allocate_id();
        rock.id = id;
        self.rocks.insert(id, rock);
        id
    }

    pub fn insert_projectile(&mut self, mut projectile: Projectile) -> EntityId {
        let id = self.allocate_id();
        projectile.id = id;
        self.projectiles.insert(id, projectile);
        id
    }

    pub fn push_particles(&mut self, particles: impl IntoIterator<Item = Particle>) {
        self.particles.extend(particles);
    }

    /// Flag an entity for removal at the next `compact`
    pub fn mark_for_removal(&mut self, id: EntityId) {
        self.pending_removal.insert(id);
    }

    pub fn is_marked(&self, id: EntityId) -> bool {
        self.pending_removal.contains(&id)
    }

    /// Drop every marked entity and every expired particle. Returns how many
    /// entities were removed.
    pub fn compact(&mut self) -> usize {
        let mut removed = 0;
        for id in std::mem::take(&mut self.pending_removal) {
            if self.enemies.remove(&id).is_some()
                || self.rocks.remove(&id).is_some()
                || self.projectiles.remove(&id).is_some()
            {
                removed += 1;
            }
        }
        self.particles.retain(|p| p.lifetime > 0.0);
        removed
    }

    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.get(&id).filter(|_| !self.is_marked(id))
    }

    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        if self.is_marked(id) {
            return None;
        }
        self.enemies.get_mut(&id)
    }

    pub fn rock(&self, id: EntityId) -> Option<&Rock> {
        self.rocks.get(&id).filter(|_| !self.is_marked(id))
    }

    pub fn rock_mut(&mut self, id: EntityId) -> Option<&mut Rock> {
        if self.is_marked(id) {
            return None;
        }
        self.rocks.get_mut(&id)
    }

    pub fn projectile(&self, id: EntityId) -> Option<&Projectile> {
        self.projectiles.get(&id).filter(|_| !self.is_marked(id))
    }

    /// Live enemies in id order
    pub fn enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values().filter(|e| !self.pending_removal.contains(&e.id))
    }

    pub fn enemies_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        let pending = &self.pending_removal;
        self.enemies.values_mut().filter(move |e| !pending.contains(&e.id))
    }

    /// Live rocks in id order
    pub fn rocks(&self) -> impl Iterator<Item = &Rock> {
        self.rocks.values().filter(|r| !self.pending_removal.contains(&r.id))
    }

    /// Live projectiles in id order
    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values().filter(|p| !self.pending_removal.contains(&p.id))
    }

    pub fn projectiles_mut(&mut self) -> impl Iterator<Item = &mut Projectile> {
        let pending = &self.pending_removal;
        self.projectiles.values_mut().filter(move |p| !pending.contains(&p.id))
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Most recently inserted live enemy
    pub fn last_enemy_id(&self) -> Option<EntityId> {
        self.enemies().last().map(|e| e.id)
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies().count()
    }

    pub fn rock_count(&self) -> usize {
        self.rocks().count()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles().count()
    }

    pub fn remote_players(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.remote_players.values()
    }

    pub fn remote_player(&self, id: &Uuid) -> Option<&RemotePlayer> {
        self.remote_players.get(id)
    }

    pub fn remote_player_mut(&mut self, id: &Uuid) -> Option<&mut RemotePlayer> {
        self.remote_players.get_mut(id)
    }

    pub fn upsert_remote_player(&mut self, remote: RemotePlayer) {
        self.remote_players.insert(remote.id, remote);
    }

    pub fn remove_remote_player(&mut self, id: &Uuid) -> Option<RemotePlayer> {
        self.remote_players.remove(id)
    }

    pub fn clear_remote_players(&mut self) {
        self.remote_players.clear();
    }
}
