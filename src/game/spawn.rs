//! Initial population and bot insertion

use std::f32::consts::TAU;

use rand::seq::IteratorRandom;
use rand::Rng;

use super::ai::AiController;
use super::entities::{Enemy, Rock, Team};
use super::store::{EntityId, EntityStore};

pub const INITIAL_ROCKS: usize = 20;
pub const INITIAL_ENEMIES: usize = 6;
/// Spawn positions are drawn from `[-SPAWN_RANGE, SPAWN_RANGE)` on each axis
pub const SPAWN_RANGE: f32 = 40.0;

fn random_position<R: Rng + ?Sized>(rng: &mut R) -> (f32, f32) {
    (
        rng.gen_range(-SPAWN_RANGE..SPAWN_RANGE),
        rng.gen_range(-SPAWN_RANGE..SPAWN_RANGE),
    )
}

/// Seed rocks and enemies for a new match. Enemies are drawn from the teams
/// other than the player's.
pub fn seed_arena<R: Rng + ?Sized>(store: &mut EntityStore, rng: &mut R) {
    for _ in 0..INITIAL_ROCKS {
        let (x, z) = random_position(rng);
        let rotation = rng.gen_range(0.0..TAU);
        store.insert_rock(Rock::new(x, z, rotation));
    }

    let player_team = store.player.team;
    for i in 0..INITIAL_ENEMIES {
        let team = player_team.others().choose(rng).unwrap_or(player_team);
        let level = rng.gen_range(1..=3);
        spawn_enemy(store, format!("Player {}", i + 1), team, level, rng);
    }
}

/// Insert a level-1 bot at a random position
pub fn spawn_bot<R: Rng + ?Sized>(store: &mut EntityStore, team: Option<Team>, rng: &mut R) -> EntityId {
    let team = team.unwrap_or_else(|| Team::ALL[rng.gen_range(0..Team::ALL.len())]);
    let name = format!("Bot {}", rng.gen_range(0..1000));
    spawn_enemy(store, name, team, 1, rng)
}

fn spawn_enemy<R: Rng + ?Sized>(
    store: &mut EntityStore,
    name: String,
    team: Team,
    level: u32,
    rng: &mut R,
) -> EntityId {
    let (x, z) = random_position(rng);
    let behavior = AiController::assign_behavior(rng);
    let mut enemy = Enemy::new(name, team, x, z, level, behavior);
    enemy.rotation = rng.gen_range(0.0..TAU);
    store.insert_enemy(enemy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Player;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn seeded_arena_has_full_population() {
        let mut store = EntityStore::new(Player::new("Ace".into(), Team::Blue));
        seed_arena(&mut store, &mut ChaCha8Rng::seed_from_u64(11));

        assert_eq!(store.rock_count(), INITIAL_ROCKS);
        assert_eq!(store.enemy_count(), INITIAL_ENEMIES);
        for enemy in store.enemies() {
            assert_ne!(enemy.team, Team::Blue);
            assert!((1..=3).contains(&enemy.level));
            assert!(enemy.x.abs() <= SPAWN_RANGE && enemy.z.abs() <= SPAWN_RANGE);
        }
        assert_eq!(store.enemies().next().unwrap().name, "Player 1");
    }

    #[test]
    fn same_seed_same_arena() {
        let layout = |seed| {
            let mut store = EntityStore::new(Player::new("Ace".into(), Team::Red));
            seed_arena(&mut store, &mut ChaCha8Rng::seed_from_u64(seed));
            store
                .enemies()
                .map(|e| (e.x, e.z, e.behavior, e.team))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(42), layout(42));
    }
}
