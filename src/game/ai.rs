//! Enemy behaviour controller
//!
//! Aggressive enemies chase and shoot the player inside the engagement
//! radius; everyone else wanders between random points. All randomness comes
//! from the caller's RNG so a seeded run is reproducible.

use std::f32::consts::FRAC_PI_2;

use rand::Rng;

use super::combat::CombatResolver;
use super::entities::Behavior;
use super::physics::PhysicsSystem;
use super::store::{EntityId, EntityStore};

pub const ENGAGEMENT_RADIUS: f32 = 30.0;
pub const CHASE_SPEED: f32 = 8.0;
pub const WANDER_SPEED: f32 = 6.0;
pub const ARRIVAL_RADIUS: f32 = 2.0;
/// Per-tick chance of picking a new wander target
pub const RETARGET_CHANCE: f64 = 0.02;
/// Wander targets are drawn from `[-WANDER_RANGE, WANDER_RANGE)` on each axis
pub const WANDER_RANGE: f32 = 40.0;
pub const ENEMY_FIRE_COOLDOWN_MS: f64 = 1000.0;

/// An enemy wants to shoot this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireIntent {
    pub enemy_id: EntityId,
    pub x: f32,
    pub z: f32,
    pub direction: f32,
}

pub struct AiController;

impl AiController {
    /// Roll a behaviour for a freshly spawned enemy (50/50)
    pub fn assign_behavior<R: Rng + ?Sized>(rng: &mut R) -> Behavior {
        if rng.gen_bool(0.5) {
            Behavior::Aggressive
        } else {
            Behavior::Defensive
        }
    }

    /// Uniform point inside the wander square
    pub fn random_point<R: Rng + ?Sized>(rng: &mut R) -> (f32, f32) {
        (
            rng.gen_range(-WANDER_RANGE..WANDER_RANGE),
            rng.gen_range(-WANDER_RANGE..WANDER_RANGE),
        )
    }

    /// Move every enemy one tick and collect fire intents. `now` is the
    /// simulation time in milliseconds.
    pub fn update<R: Rng + ?Sized>(
        store: &mut EntityStore,
        now: f64,
        dt: f32,
        rng: &mut R,
    ) -> Vec<FireIntent> {
        let target = store
            .player
            .alive
            .then_some((store.player.x, store.player.z));
        let mut intents = Vec::new();

        for enemy in store.enemies_mut() {
            let chasing = match (enemy.behavior, target) {
                (Behavior::Aggressive, Some((tx, tz))) => {
                    PhysicsSystem::distance(enemy.x, enemy.z, tx, tz) < ENGAGEMENT_RADIUS
                }
                _ => false,
            };

            match target {
                Some((tx, tz)) if chasing => {
                    let heading = PhysicsSystem::heading(enemy.x, enemy.z, tx, tz);
                    let (x, z) = PhysicsSystem::advance(enemy.x, enemy.z, heading, CHASE_SPEED * dt);
                    enemy.x = x;
                    enemy.z = z;
                    enemy.rotation = heading - FRAC_PI_2;

                    if CombatResolver::cooldown_elapsed(enemy.last_shot, now, ENEMY_FIRE_COOLDOWN_MS) {
                        intents.push(FireIntent {
                            enemy_id: enemy.id,
                            x: enemy.x,
                            z: enemy.z,
                            direction: enemy.rotation + FRAC_PI_2,
                        });
                        enemy.last_shot = Some(now);
                    }
                }
                _ => {
                    if rng.gen_bool(RETARGET_CHANCE) {
                        let (wx, wz) = Self::random_point(rng);
                        enemy.wander_x = wx;
                        enemy.wander_z = wz;
                    }

                    if let Some((x, z, heading)) = PhysicsSystem::step_towards(
                        enemy.x,
                        enemy.z,
                        enemy.wander_x,
                        enemy.wander_z,
                        WANDER_SPEED * dt,
                        ARRIVAL_RADIUS,
                    ) {
                        enemy.x = x;
                        enemy.z = z;
                        enemy.rotation = heading - FRAC_PI_2;
                    }
                }
            }

            let (x, z) = PhysicsSystem::clamp_to_arena(enemy.x, enemy.z);
            enemy.x = x;
            enemy.z = z;
        }

        intents
    }
}
