//! Combat system - weapons, projectile ballistics, hit detection

use rand::Rng;
use tracing::debug;

use super::entities::{Owner, Particle, Projectile, HOSTILE_COLOR, ROCK_COLOR};
use super::physics::PhysicsSystem;
use super::progression::UpgradeSet;
use super::store::{EntityId, EntityStore};
use crate::ws::protocol::Vec3;

/// Damage of an unmodified shot
pub const BASE_DAMAGE: f32 = 10.0;
/// Projectile travel speed (units/s)
pub const PROJECTILE_SPEED: f32 = 40.0;
/// Projectile lifetime (s)
pub const PROJECTILE_LIFETIME: f32 = 3.0;
/// Muzzle height, cosmetic only
pub const PROJECTILE_HEIGHT: f32 = 1.0;

pub const ROCK_HIT_RADIUS: f32 = 2.5;
pub const ENEMY_HIT_RADIUS: f32 = 2.0;
pub const PLAYER_HIT_RADIUS: f32 = 2.0;

/// Experience for destroying a rock
pub const ROCK_XP: u32 = 20;
/// Experience per enemy level for a kill
pub const ENEMY_XP_PER_LEVEL: u32 = 50;

const PARTICLES_PER_BURST: usize = 8;
const PARTICLE_LIFETIME: f32 = 0.5;

/// What a projectile connected with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Rock(EntityId),
    Enemy(EntityId),
    Player,
}

/// Hit result from combat resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub projectile_id: EntityId,
    pub target: HitTarget,
    pub damage: f32,
    pub x: f32,
    pub z: f32,
    pub target_killed: bool,
}

/// A destroyed rock or enemy and the experience it is worth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub target: HitTarget,
    pub xp: u32,
}

/// Everything one collision pass did
#[derive(Debug, Clone, Default)]
pub struct CombatOutcome {
    pub hits: Vec<HitResult>,
    pub kills: Vec<Kill>,
    pub damage_to_player: f32,
}

impl CombatOutcome {
    pub fn experience(&self) -> u32 {
        self.kills.iter().map(|k| k.xp).sum()
    }
}

/// Combat system for firing, moving and resolving projectiles
pub struct CombatResolver;

impl CombatResolver {
    /// Build one projectile per barrel: the base front barrel plus every
    /// unlocked extra mount. Ids are assigned when inserted into the store.
    pub fn fire_weapon(
        origin_x: f32,
        origin_z: f32,
        base_direction: f32,
        upgrades: &UpgradeSet,
        owner: Owner,
        color: u32,
    ) -> Vec<Projectile> {
        let damage = match owner {
            Owner::Player => BASE_DAMAGE * upgrades.damage,
            Owner::Hostile => BASE_DAMAGE,
        };
        let color = match owner {
            Owner::Player => color,
            Owner::Hostile => HOSTILE_COLOR,
        };

        upgrades
            .directions()
            .flat_map(|dir| dir.angle_offsets().iter().copied())
            .map(|offset| Projectile {
                id: EntityId::default(),
                x: origin_x,
                z: origin_z,
                direction: base_direction + offset,
                speed: PROJECTILE_SPEED,
                lifetime: PROJECTILE_LIFETIME,
                damage,
                owner,
                color,
            })
            .collect()
    }

    /// Fire and insert in one go, returning the new ids
    pub fn spawn_volley(store: &mut EntityStore, volley: Vec<Projectile>) -> Vec<EntityId> {
        volley
            .into_iter()
            .map(|p| store.insert_projectile(p))
            .collect()
    }

    /// Move projectiles along their headings and mark the expired or escaped
    /// ones for removal
    pub fn advance(store: &mut EntityStore, dt: f32) {
        let mut expired = Vec::new();
        for projectile in store.projectiles_mut() {
            let (x, z) = PhysicsSystem::advance(
                projectile.x,
                projectile.z,
                projectile.direction,
                projectile.speed * dt,
            );
            projectile.x = x;
            projectile.z = z;
            projectile.lifetime -= dt;

            if projectile.lifetime <= 0.0 || PhysicsSystem::out_of_bounds(x, z) {
                expired.push(projectile.id);
            }
        }

        for id in expired {
            store.mark_for_removal(id);
        }
    }

    /// Age and move cosmetic particles. Dead ones drop out on compaction.
    pub fn advance_particles(store: &mut EntityStore, dt: f32) {
        for particle in store.particles_mut() {
            particle.lifetime -= dt;
            particle.position.x += particle.velocity.x * dt;
            particle.position.y += particle.velocity.y * dt;
            particle.position.z += particle.velocity.z * dt;
        }
    }

    /// Single ordered collision pass: pair every live projectile with at most
    /// one target against a snapshot of positions, apply the pairs in id
    /// order, then compact.
    ///
    /// Player-owned projectiles test rocks then enemies; hostile projectiles
    /// only test the local player. Within a kind the lowest id wins.
    pub fn resolve_collisions<R: Rng + ?Sized>(
        store: &mut EntityStore,
        rng: &mut R,
    ) -> CombatOutcome {
        let pairs = Self::find_hits(store);
        let mut outcome = CombatOutcome::default();

        for (projectile_id, target) in pairs {
            let Some(projectile) = store.projectile(projectile_id) else {
                continue;
            };
            let damage = projectile.damage;
            store.mark_for_removal(projectile_id);

            // An earlier projectile this tick may already have destroyed the
            // target; the shot is spent either way but scores nothing.
            let Some(result) = Self::apply_hit(store, target, damage) else {
                continue;
            };

            let (x, z, color) = result;
            store.push_particles(Self::particle_burst(x, z, color, rng));

            let killed = match target {
                HitTarget::Rock(id) => store.rock(id).map_or(false, |r| r.health <= 0.0),
                HitTarget::Enemy(id) => store.enemy(id).map_or(false, |e| e.health <= 0.0),
                HitTarget::Player => false,
            };

            if killed {
                let xp = match target {
                    HitTarget::Rock(_) => ROCK_XP,
                    HitTarget::Enemy(id) => {
                        store.enemy(id).map_or(0, |e| ENEMY_XP_PER_LEVEL * e.level)
                    }
                    HitTarget::Player => 0,
                };
                match target {
                    HitTarget::Rock(id) | HitTarget::Enemy(id) => store.mark_for_removal(id),
                    HitTarget::Player => {}
                }
                debug!(?target, xp, "Target destroyed");
                outcome.kills.push(Kill { target, xp });
            }

            if target == HitTarget::Player {
                outcome.damage_to_player += damage;
            }

            outcome.hits.push(HitResult {
                projectile_id,
                target,
                damage,
                x,
                z,
                target_killed: killed,
            });
        }

        store.compact();
        outcome
    }

    /// Compute hit pairs against the current positions without mutating
    fn find_hits(store: &EntityStore) -> Vec<(EntityId, HitTarget)> {
        let player = &store.player;
        let mut pairs = Vec::new();

        for projectile in store.projectiles() {
            let (px, pz) = (projectile.x, projectile.z);
            let target = match projectile.owner {
                Owner::Player => store
                    .rocks()
                    .find(|r| PhysicsSystem::within(px, pz, r.x, r.z, ROCK_HIT_RADIUS))
                    .map(|r| HitTarget::Rock(r.id))
                    .or_else(|| {
                        store
                            .enemies()
                            .find(|e| PhysicsSystem::within(px, pz, e.x, e.z, ENEMY_HIT_RADIUS))
                            .map(|e| HitTarget::Enemy(e.id))
                    }),
                Owner::Hostile => (player.alive
                    && PhysicsSystem::within(px, pz, player.x, player.z, PLAYER_HIT_RADIUS))
                .then_some(HitTarget::Player),
            };

            if let Some(target) = target {
                pairs.push((projectile.id, target));
            }
        }

        pairs
    }

    /// Apply damage to a live target, returning the impact point and debris
    /// color, or `None` if the target is gone
    fn apply_hit(store: &mut EntityStore, target: HitTarget, damage: f32) -> Option<(f32, f32, u32)> {
        match target {
            HitTarget::Rock(id) => {
                let rock = store.rock_mut(id)?;
                rock.health = Self::apply_damage(rock.health, damage).0;
                Some((rock.x, rock.z, ROCK_COLOR))
            }
            HitTarget::Enemy(id) => {
                let enemy = store.enemy_mut(id)?;
                enemy.health = Self::apply_damage(enemy.health, damage).0;
                Some((enemy.x, enemy.z, enemy.team.color()))
            }
            HitTarget::Player => {
                let player = &mut store.player;
                if !player.alive {
                    return None;
                }
                player.health = Self::apply_damage(player.health, damage).0;
                Some((player.x, player.z, player.team.color()))
            }
        }
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }

    /// Strictly more than `cooldown_ms` since the last shot, or never fired
    pub fn cooldown_elapsed(last_shot: Option<f64>, now: f64, cooldown_ms: f64) -> bool {
        last_shot.map_or(true, |last| now - last > cooldown_ms)
    }

    /// Decorative debris at an impact point
    pub fn particle_burst<R: Rng + ?Sized>(x: f32, z: f32, color: u32, rng: &mut R) -> Vec<Particle> {
        (0..PARTICLES_PER_BURST)
            .map(|_| Particle {
                position: Vec3::new(x, PROJECTILE_HEIGHT, z),
                velocity: Vec3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(0.0..5.0),
                    rng.gen_range(-5.0..5.0),
                ),
                lifetime: PARTICLE_LIFETIME,
                max_lifetime: PARTICLE_LIFETIME,
                color,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Behavior, Enemy, Player, Rock, Team};
    use crate::game::progression::CannonDirection;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn store() -> EntityStore {
        let mut player = Player::new("Ace".into(), Team::Red);
        player.x = -40.0;
        player.z = -40.0;
        EntityStore::new(player)
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn enemy_at(x: f32, z: f32, level: u32) -> Enemy {
        Enemy::new("Bot".into(), Team::Blue, x, z, level, Behavior::Defensive)
    }

    fn shot_at(store: &mut EntityStore, x: f32, z: f32, owner: Owner, damage: f32) -> EntityId {
        let mut volley = CombatResolver::fire_weapon(x, z, 0.0, &UpgradeSet::default(), owner, 0);
        let mut projectile = volley.remove(0);
        projectile.damage = damage;
        store.insert_projectile(projectile)
    }

    #[test]
    fn volley_sizes_follow_unlocked_mounts() {
        let mut upgrades = UpgradeSet::default();
        let fire = |u: &UpgradeSet| CombatResolver::fire_weapon(0.0, 0.0, 0.0, u, Owner::Player, 0);

        assert_eq!(fire(&upgrades).len(), 1);
        upgrades.add_cannon(CannonDirection::Side);
        assert_eq!(fire(&upgrades).len(), 3);
        upgrades.add_cannon(CannonDirection::Diagonal);
        assert_eq!(fire(&upgrades).len(), 7);
        upgrades.add_cannon(CannonDirection::Back);
        assert_eq!(fire(&upgrades).len(), 8);
    }

    #[test]
    fn side_cannons_fire_perpendicular() {
        let mut upgrades = UpgradeSet::default();
        upgrades.add_cannon(CannonDirection::Side);
        let volley = CombatResolver::fire_weapon(0.0, 0.0, 1.0, &upgrades, Owner::Player, 0);
        let dirs: Vec<f32> = volley.iter().map(|p| p.direction).collect();
        assert_eq!(dirs[0], 1.0);
        assert!((dirs[1] - (1.0 - std::f32::consts::FRAC_PI_2)).abs() < 1e-6);
        assert!((dirs[2] - (1.0 + std::f32::consts::FRAC_PI_2)).abs() < 1e-6);
    }

    #[test]
    fn damage_scales_for_player_only() {
        let upgrades = UpgradeSet {
            damage: 2.5,
            ..UpgradeSet::default()
        };
        let mine = CombatResolver::fire_weapon(0.0, 0.0, 0.0, &upgrades, Owner::Player, 0x123);
        let theirs = CombatResolver::fire_weapon(0.0, 0.0, 0.0, &upgrades, Owner::Hostile, 0x123);
        assert_eq!(mine[0].damage, 25.0);
        assert_eq!(mine[0].color, 0x123);
        assert_eq!(theirs[0].damage, BASE_DAMAGE);
        assert_eq!(theirs[0].color, HOSTILE_COLOR);
    }

    #[test]
    fn advance_prunes_on_lifetime_and_bounds() {
        let mut store = store();
        let fast = shot_at(&mut store, 49.0, 0.0, Owner::Player, 10.0);
        let slow = shot_at(&mut store, -20.0, 0.0, Owner::Player, 10.0);

        CombatResolver::advance(&mut store, 0.1);
        assert!(store.is_marked(fast));
        assert!(!store.is_marked(slow));

        CombatResolver::advance(&mut store, PROJECTILE_LIFETIME);
        assert!(store.is_marked(slow));
        store.compact();
        assert_eq!(store.projectile_count(), 0);
    }

    #[test]
    fn rock_kill_awards_twenty_once() {
        let mut store = store();
        let rock = store.insert_rock(Rock::new(10.0, 10.0, 0.0));
        shot_at(&mut store, 10.0, 10.0, Owner::Player, 20.0);
        shot_at(&mut store, 10.5, 10.0, Owner::Player, 20.0);
        shot_at(&mut store, 10.0, 10.5, Owner::Player, 20.0);

        let outcome = CombatResolver::resolve_collisions(&mut store, &mut rng());
        assert_eq!(outcome.kills, vec![Kill { target: HitTarget::Rock(rock), xp: ROCK_XP }]);
        assert_eq!(outcome.experience(), 20);
        assert!(store.rock(rock).is_none());
        // all three shots were in contact and are spent
        assert_eq!(store.projectile_count(), 0);
    }

    #[test]
    fn enemy_kill_awards_by_level() {
        let mut store = store();
        let enemy = store.insert_enemy(enemy_at(0.0, 0.0, 3));
        shot_at(&mut store, 0.5, 0.0, Owner::Player, 100.0);

        let outcome = CombatResolver::resolve_collisions(&mut store, &mut rng());
        assert_eq!(outcome.experience(), 150);
        assert!(outcome.hits[0].target_killed);
        assert_eq!(store.enemy_count(), 0);
        assert!(store.enemy(enemy).is_none());
    }

    #[test]
    fn one_projectile_resolves_one_target() {
        let mut store = store();
        let first = store.insert_enemy(enemy_at(0.0, 0.0, 1));
        let second = store.insert_enemy(enemy_at(0.5, 0.0, 1));
        shot_at(&mut store, 0.25, 0.0, Owner::Player, 100.0);

        let outcome = CombatResolver::resolve_collisions(&mut store, &mut rng());
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.kills.len(), 1);
        assert_eq!(outcome.hits[0].target, HitTarget::Enemy(first));
        assert!(store.enemy(second).is_some());
    }

    #[test]
    fn rocks_shadow_enemies() {
        let mut store = store();
        let rock = store.insert_rock(Rock::new(0.0, 0.0, 0.0));
        store.insert_enemy(enemy_at(0.0, 0.0, 1));
        shot_at(&mut store, 0.0, 0.0, Owner::Player, 5.0);

        let outcome = CombatResolver::resolve_collisions(&mut store, &mut rng());
        assert_eq!(outcome.hits[0].target, HitTarget::Rock(rock));
        assert_eq!(store.rock(rock).unwrap().health, 25.0);
        assert_eq!(store.enemies().next().unwrap().health, 100.0);
    }

    #[test]
    fn hostile_shots_hit_only_the_player() {
        let mut store = store();
        store.player.x = 0.0;
        store.player.z = 0.0;
        store.insert_rock(Rock::new(0.0, 0.0, 0.0));
        store.insert_enemy(enemy_at(0.0, 0.0, 1));
        shot_at(&mut store, 0.0, 0.0, Owner::Hostile, BASE_DAMAGE);

        let outcome = CombatResolver::resolve_collisions(&mut store, &mut rng());
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].target, HitTarget::Player);
        assert_eq!(outcome.damage_to_player, BASE_DAMAGE);
        assert_eq!(store.player.health, 90.0);
        assert_eq!(store.particles().len(), 8);
    }

    #[test]
    fn health_never_goes_negative() {
        let mut store = store();
        store.player.x = 0.0;
        store.player.z = 0.0;
        store.player.health = 3.0;
        let rock = store.insert_rock(Rock::new(20.0, 20.0, 0.0));
        store.rock_mut(rock).unwrap().health = 1.0;

        shot_at(&mut store, 0.0, 0.0, Owner::Hostile, BASE_DAMAGE);
        shot_at(&mut store, 0.0, 0.0, Owner::Hostile, BASE_DAMAGE);
        shot_at(&mut store, 20.0, 20.0, Owner::Player, 500.0);
        CombatResolver::resolve_collisions(&mut store, &mut rng());

        assert_eq!(store.player.health, 0.0);
        assert!(store.player.health <= store.player.max_health);
    }

    #[test]
    fn dead_player_is_not_a_target() {
        let mut store = store();
        store.player.x = 0.0;
        store.player.z = 0.0;
        store.player.alive = false;
        shot_at(&mut store, 0.0, 0.0, Owner::Hostile, BASE_DAMAGE);

        let outcome = CombatResolver::resolve_collisions(&mut store, &mut rng());
        assert!(outcome.hits.is_empty());
        assert_eq!(store.projectile_count(), 1);
    }

    #[test]
    fn particles_decay_and_expire() {
        let mut store = store();
        store.push_particles(CombatResolver::particle_burst(5.0, -5.0, ROCK_COLOR, &mut rng()));
        let start: Vec<Vec3> = store.particles().iter().map(|p| p.position).collect();

        CombatResolver::advance_particles(&mut store, 0.3);
        store.compact();
        assert_eq!(store.particles().len(), PARTICLES_PER_BURST);
        for (particle, origin) in store.particles().iter().zip(&start) {
            assert!((particle.lifetime - (PARTICLE_LIFETIME - 0.3)).abs() < 1e-6);
            assert!((particle.position.x - (origin.x + particle.velocity.x * 0.3)).abs() < 1e-5);
            assert!(particle.position.y >= origin.y);
        }

        CombatResolver::advance_particles(&mut store, 0.25);
        store.compact();
        assert!(store.particles().is_empty());
    }
}
