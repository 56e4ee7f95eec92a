//! Simulation entities

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::progression::{Progress, UpgradeSet};
use super::store::EntityId;
use crate::ws::protocol::Vec3;

/// Starting (and base maximum) health of the player and enemies
pub const BASE_HEALTH: f32 = 100.0;
/// Starting health of a rock
pub const ROCK_HEALTH: f32 = 30.0;
/// Color of hostile projectiles
pub const HOSTILE_COLOR: u32 = 0xff0000;
/// Color of rock debris
pub const ROCK_COLOR: u32 = 0x666666;

/// Playable teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
    Green,
}

impl Team {
    pub const ALL: [Team; 3] = [Team::Red, Team::Blue, Team::Green];

    /// Name shown to players and used on the wire
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Red => "Red Phoenix",
            Self::Blue => "Blue Wolves",
            Self::Green => "Green Dragons",
        }
    }

    pub fn color(self) -> u32 {
        match self {
            Self::Red => 0xff0044,
            Self::Blue => 0x0088ff,
            Self::Green => 0x00ff88,
        }
    }

    /// Parse the short console key (`red`, `blue`, `green`)
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "red" => Some(Self::Red),
            "blue" => Some(Self::Blue),
            "green" => Some(Self::Green),
            _ => None,
        }
    }

    /// Every team except this one
    pub fn others(self) -> impl Iterator<Item = Team> {
        Self::ALL.into_iter().filter(move |t| *t != self)
    }
}

/// Enemy behaviour, fixed at spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    Aggressive,
    Defensive,
}

/// The local human-controlled avatar
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub name: String,
    pub team: Team,
    pub x: f32,
    pub z: f32,
    /// Facing angle, `atan2(dx, dz)` towards the aim point
    pub rotation: f32,
    pub health: f32,
    pub max_health: f32,
    pub progress: Progress,
    pub upgrades: UpgradeSet,
    pub alive: bool,
    /// Simulation time (ms) of death while dead
    pub death_time: Option<f64>,
}

impl Player {
    pub fn new(name: String, team: Team) -> Self {
        Self {
            name,
            team,
            x: 0.0,
            z: 0.0,
            rotation: 0.0,
            health: BASE_HEALTH,
            max_health: BASE_HEALTH,
            progress: Progress::default(),
            upgrades: UpgradeSet::default(),
            alive: true,
            death_time: None,
        }
    }

    /// Back to the origin with full health
    pub fn respawn(&mut self) {
        self.x = 0.0;
        self.z = 0.0;
        self.health = self.max_health;
        self.alive = true;
        self.death_time = None;
    }
}

/// AI-controlled opponent
#[derive(Debug, Clone, Serialize)]
pub struct Enemy {
    pub id: EntityId,
    pub name: String,
    pub team: Team,
    pub x: f32,
    pub z: f32,
    /// Facing angle; the muzzle points along `rotation + PI/2`
    pub rotation: f32,
    pub health: f32,
    pub max_health: f32,
    pub level: u32,
    pub behavior: Behavior,
    /// Simulation time (ms) of the last shot, `None` before the first
    pub last_shot: Option<f64>,
    pub wander_x: f32,
    pub wander_z: f32,
}

impl Enemy {
    /// Id is assigned by the store on insert
    pub fn new(name: String, team: Team, x: f32, z: f32, level: u32, behavior: Behavior) -> Self {
        Self {
            id: EntityId::default(),
            name,
            team,
            x,
            z,
            rotation: 0.0,
            health: BASE_HEALTH,
            max_health: BASE_HEALTH,
            level,
            behavior,
            last_shot: None,
            wander_x: 0.0,
            wander_z: 0.0,
        }
    }
}

/// Destructible obstacle
#[derive(Debug, Clone, Serialize)]
pub struct Rock {
    pub id: EntityId,
    pub x: f32,
    pub z: f32,
    pub health: f32,
    pub max_health: f32,
    pub rotation: f32,
}

impl Rock {
    pub fn new(x: f32, z: f32, rotation: f32) -> Self {
        Self {
            id: EntityId::default(),
            x,
            z,
            health: ROCK_HEALTH,
            max_health: ROCK_HEALTH,
            rotation,
        }
    }
}

/// Which side fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    Player,
    Hostile,
}

#[derive(Debug, Clone, Serialize)]
pub struct Projectile {
    pub id: EntityId,
    pub x: f32,
    pub z: f32,
    /// Travel heading in radians, fixed for the projectile's life
    pub direction: f32,
    pub speed: f32,
    /// Seconds left before expiry
    pub lifetime: f32,
    pub damage: f32,
    pub owner: Owner,
    pub color: u32,
}

/// Cosmetic debris
#[derive(Debug, Clone, Serialize)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub lifetime: f32,
    pub max_lifetime: f32,
    pub color: u32,
}

/// Last reported state of another live player in the room. Never simulated.
#[derive(Debug, Clone, Serialize)]
pub struct RemotePlayer {
    pub id: Uuid,
    pub name: String,
    pub team: String,
    pub position: Vec3,
    pub rotation: f32,
    pub health: f32,
    pub level: u32,
    pub xp: u32,
    pub upgrades: serde_json::Value,
    pub alive: bool,
}
