//! Per-frame simulation driver
//!
//! `SimulationClock::step` runs one ordered tick: player intent, AI, ballistics,
//! collisions, progression, death/respawn, compaction, snapshot. It knows
//! nothing about rendering; a display loop calls [`SimulationClock::frame`]
//! with its timestamps, tests call `step` directly.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::ai::AiController;
use super::combat::CombatResolver;
use super::entities::{Owner, Player, Team, HOSTILE_COLOR};
use super::intent::InputIntent;
use super::physics::PhysicsSystem;
use super::progression::{self, Upgrade, UpgradeOffer, UpgradeSet};
use super::snapshot::{FrameEvent, FrameSnapshot, SnapshotBuilder};
use super::spawn;
use super::store::{EntityId, EntityStore};

/// Player movement speed (units/s)
pub const PLAYER_SPEED: f32 = 15.0;
/// Fire cooldown at fire-rate multiplier 1
pub const PLAYER_FIRE_COOLDOWN_MS: f64 = 500.0;
pub const RESPAWN_DELAY_MS: f64 = 2000.0;
/// Passive health loss while alive (health/s)
pub const HEALTH_DECAY_PER_SEC: f32 = 0.5;
/// Upper bound on a single tick's delta (s)
pub const MAX_DELTA: f32 = 0.25;

/// Owns the local world and advances it one frame at a time
pub struct SimulationClock {
    store: EntityStore,
    rng: ChaCha8Rng,
    tick: u64,
    /// Simulation time in milliseconds
    time_ms: f64,
    last_frame_ms: Option<f64>,
    last_player_shot: Option<f64>,
    health_decay: bool,
    snapshots: SnapshotBuilder,
}

impl SimulationClock {
    /// New match with a seeded arena
    pub fn new(player_name: impl Into<String>, team: Team, seed: u64) -> Self {
        let mut clock = Self::empty(player_name, team, seed);
        spawn::seed_arena(&mut clock.store, &mut clock.rng);
        info!(
            rocks = clock.store.rock_count(),
            enemies = clock.store.enemy_count(),
            "Arena seeded"
        );
        clock
    }

    /// New match with nothing but the player in it
    pub fn empty(player_name: impl Into<String>, team: Team, seed: u64) -> Self {
        Self {
            store: EntityStore::new(Player::new(player_name.into(), team)),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            time_ms: 0.0,
            last_frame_ms: None,
            last_player_shot: None,
            health_decay: true,
            snapshots: SnapshotBuilder::new(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn player(&self) -> &Player {
        &self.store.player
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn health_decay(&self) -> bool {
        self.health_decay
    }

    pub fn set_health_decay(&mut self, enabled: bool) {
        self.health_decay = enabled;
    }

    /// Step using display timestamps (ms). The first frame has a zero delta.
    pub fn frame(&mut self, now_ms: f64, intent: &InputIntent) -> FrameSnapshot {
        let dt = match self.last_frame_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_frame_ms = Some(now_ms);
        self.step(dt, intent)
    }

    /// Advance the world by `dt` seconds
    pub fn step(&mut self, dt: f32, intent: &InputIntent) -> FrameSnapshot {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_DELTA) } else { 0.0 };
        self.tick += 1;
        self.time_ms += f64::from(dt) * 1000.0;
        let now = self.time_ms;
        let intent = intent.sanitized();
        let mut events = Vec::new();

        if self.store.player.alive {
            self.move_player(dt, &intent);
            if intent.fire {
                if let Some(event) = self.fire_player(&intent) {
                    events.push(event);
                }
            }
            if self.health_decay {
                let player = &mut self.store.player;
                player.health = (player.health - HEALTH_DECAY_PER_SEC * dt).max(0.0);
            }
        }

        for shot in AiController::update(&mut self.store, now, dt, &mut self.rng) {
            let volley = CombatResolver::fire_weapon(
                shot.x,
                shot.z,
                shot.direction,
                &UpgradeSet::default(),
                Owner::Hostile,
                HOSTILE_COLOR,
            );
            for projectile_id in CombatResolver::spawn_volley(&mut self.store, volley) {
                events.push(FrameEvent::EnemyShot {
                    enemy_id: shot.enemy_id,
                    projectile_id,
                });
            }
        }

        CombatResolver::advance(&mut self.store, dt);
        CombatResolver::advance_particles(&mut self.store, dt);

        let outcome = CombatResolver::resolve_collisions(&mut self.store, &mut self.rng);
        for hit in &outcome.hits {
            events.push(FrameEvent::Hit {
                projectile_id: hit.projectile_id,
                target: hit.target.into(),
                damage: hit.damage,
            });
        }
        for kill in &outcome.kills {
            events.push(FrameEvent::Destroyed {
                target: kill.target.into(),
                xp: kill.xp,
            });
        }

        // Rewards are applied one kill at a time so every kill can promote.
        for kill in &outcome.kills {
            if let Some(level) = progression::grant_experience(&mut self.store.player, kill.xp) {
                events.push(FrameEvent::LevelUp { level });
            }
        }

        self.update_life(now, &mut events);

        self.store.compact();
        self.snapshots.build(&self.store, self.tick, now, events)
    }

    fn move_player(&mut self, dt: f32, intent: &InputIntent) {
        let player = &mut self.store.player;
        let (x, z) = PhysicsSystem::clamp_to_arena(
            player.x + intent.move_x * PLAYER_SPEED * dt,
            player.z + intent.move_z * PLAYER_SPEED * dt,
        );
        player.x = x;
        player.z = z;
        player.rotation = (intent.aim_x - x).atan2(intent.aim_z - z);
    }

    fn fire_player(&mut self, intent: &InputIntent) -> Option<FrameEvent> {
        let player = &self.store.player;
        let cooldown = PLAYER_FIRE_COOLDOWN_MS / f64::from(player.upgrades.fire_rate.max(f32::EPSILON));
        if !CombatResolver::cooldown_elapsed(self.last_player_shot, self.time_ms, cooldown) {
            return None;
        }

        let (x, z) = (player.x, player.z);
        let direction = PhysicsSystem::heading(x, z, intent.aim_x, intent.aim_z);
        let volley = CombatResolver::fire_weapon(
            x,
            z,
            direction,
            &player.upgrades,
            Owner::Player,
            player.team.color(),
        );
        self.last_player_shot = Some(self.time_ms);
        let projectile_ids = CombatResolver::spawn_volley(&mut self.store, volley);

        Some(FrameEvent::Shot {
            projectile_ids,
            x,
            z,
            direction,
        })
    }

    fn update_life(&mut self, now: f64, events: &mut Vec<FrameEvent>) {
        let player = &mut self.store.player;
        if player.alive && player.health <= 0.0 {
            player.alive = false;
            player.death_time = Some(now);
            info!(player = %player.name, "Player died");
            events.push(FrameEvent::PlayerDied);
        } else if !player.alive {
            let due = player
                .death_time
                .map_or(true, |died| now - died >= RESPAWN_DELAY_MS);
            if due {
                player.respawn();
                debug!(player = %player.name, "Player respawned");
                events.push(FrameEvent::PlayerRespawned);
            }
        }
    }

    /// Upgrades currently on offer for the player's level
    pub fn available_upgrades(&self) -> Vec<UpgradeOffer> {
        progression::available_upgrades(self.store.player.progress.level)
    }

    /// Apply an upgrade if the player's level has unlocked it
    pub fn choose_upgrade(&mut self, upgrade: Upgrade) -> bool {
        let unlocked = self
            .available_upgrades()
            .iter()
            .any(|offer| offer.upgrade == upgrade);
        if unlocked {
            progression::apply_upgrade(&mut self.store.player, upgrade);
        }
        unlocked
    }

    /// Insert a level-1 enemy
    pub fn add_bot(&mut self, team: Option<Team>) -> EntityId {
        spawn::spawn_bot(&mut self.store, team, &mut self.rng)
    }

    /// Remove every enemy matching a case-insensitive name, or the most
    /// recently added one. Returns the removed enemies' names.
    pub fn remove_bot(&mut self, name: Option<&str>) -> Vec<String> {
        let doomed: Vec<(EntityId, String)> = match name {
            Some(name) => self
                .store
                .enemies()
                .filter(|e| e.name.eq_ignore_ascii_case(name))
                .map(|e| (e.id, e.name.clone()))
                .collect(),
            None => self
                .store
                .last_enemy_id()
                .and_then(|id| self.store.enemy(id))
                .map(|e| (e.id, e.name.clone()))
                .into_iter()
                .collect(),
        };
        for (id, _) in &doomed {
            self.store.mark_for_removal(*id);
        }
        self.store.compact();
        doomed.into_iter().map(|(_, name)| name).collect()
    }
}
