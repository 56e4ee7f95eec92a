//! Experience, levels and the weapon upgrade catalog

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entities::Player;

/// Damage multiplier gained per damage upgrade
pub const DAMAGE_UPGRADE_STEP: f32 = 0.5;
/// Fire-rate multiplier gained per fire-rate upgrade
pub const FIRE_RATE_UPGRADE_STEP: f32 = 0.3;
/// Max (and current) health gained per health upgrade
pub const MAX_HEALTH_UPGRADE_STEP: f32 = 20.0;

/// Experience needed to leave `level`: `level * 100 + level^2 * 50`,
/// saturating at `u32::MAX` for absurd levels
pub fn level_requirement(level: u32) -> u32 {
    let level = u64::from(level);
    let requirement = level * 100 + level * level * 50;
    u32::try_from(requirement).unwrap_or(u32::MAX)
}

/// Extra cannon mounts. `Front` is the base mount every weapon has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CannonDirection {
    Front,
    Side,
    Back,
    Diagonal,
}

impl CannonDirection {
    /// Angle offsets (radians) from the base direction, one per projectile
    pub fn angle_offsets(self) -> &'static [f32] {
        use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};
        const THREE_FRAC_PI_4: f32 = 3.0 * FRAC_PI_4;

        match self {
            Self::Front => &[0.0],
            Self::Side => &[-FRAC_PI_2, FRAC_PI_2],
            Self::Back => &[PI],
            Self::Diagonal => &[-FRAC_PI_4, FRAC_PI_4, -THREE_FRAC_PI_4, THREE_FRAC_PI_4],
        }
    }
}

/// Cumulative weapon modifiers. Only ever grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeSet {
    /// Damage multiplier (starts at 1)
    pub damage: f32,
    /// Fire-rate multiplier (starts at 1)
    pub fire_rate: f32,
    /// Unlocked extra mounts in unlock order, no duplicates
    pub extra_cannons: Vec<CannonDirection>,
}

impl Default for UpgradeSet {
    fn default() -> Self {
        Self {
            damage: 1.0,
            fire_rate: 1.0,
            extra_cannons: Vec::new(),
        }
    }
}

impl UpgradeSet {
    /// Every mount that fires, base `Front` first
    pub fn directions(&self) -> impl Iterator<Item = CannonDirection> + '_ {
        std::iter::once(CannonDirection::Front).chain(self.extra_cannons.iter().copied())
    }

    /// Add a mount unless already present. Returns true if it was new.
    pub fn add_cannon(&mut self, direction: CannonDirection) -> bool {
        if direction == CannonDirection::Front || self.extra_cannons.contains(&direction) {
            return false;
        }
        self.extra_cannons.push(direction);
        true
    }
}

/// Something a player can pick on level-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Upgrade {
    FireRate,
    Damage,
    ExtraCannon(CannonDirection),
    MaxHealth,
}

/// Catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeOffer {
    pub upgrade: Upgrade,
    pub unlock_level: u32,
    pub name: &'static str,
    pub description: &'static str,
}

/// The full catalog, ordered by unlock level
pub const UPGRADE_CATALOG: [UpgradeOffer; 6] = [
    UpgradeOffer {
        upgrade: Upgrade::FireRate,
        unlock_level: 2,
        name: "Fire Rate +",
        description: "Shoot faster",
    },
    UpgradeOffer {
        upgrade: Upgrade::Damage,
        unlock_level: 3,
        name: "Damage +",
        description: "More damage per shot",
    },
    UpgradeOffer {
        upgrade: Upgrade::ExtraCannon(CannonDirection::Side),
        unlock_level: 4,
        name: "Side Cannons",
        description: "Shoot from sides",
    },
    UpgradeOffer {
        upgrade: Upgrade::ExtraCannon(CannonDirection::Back),
        unlock_level: 5,
        name: "Back Cannon",
        description: "Shoot backwards",
    },
    UpgradeOffer {
        upgrade: Upgrade::ExtraCannon(CannonDirection::Diagonal),
        unlock_level: 6,
        name: "Diagonal Cannons",
        description: "Shoot diagonally",
    },
    UpgradeOffer {
        upgrade: Upgrade::MaxHealth,
        unlock_level: 7,
        name: "Max Health +",
        description: "Increase max health",
    },
];

/// Catalog entries unlocked at or below `level`
pub fn available_upgrades(level: u32) -> Vec<UpgradeOffer> {
    UPGRADE_CATALOG
        .iter()
        .filter(|offer| offer.unlock_level <= level)
        .copied()
        .collect()
}

/// Level and experience towards the next level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub level: u32,
    pub xp: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self { level: 1, xp: 0 }
    }
}

impl Progress {
    /// Add experience. Promotes at most one level per call; any overflow
    /// past the next level's requirement is capped just below it so that
    /// `xp < level_requirement(level)` always holds. Returns true on promotion.
    pub fn grant(&mut self, amount: u32) -> bool {
        let total = self.xp.saturating_add(amount);
        let requirement = level_requirement(self.level);

        if total < requirement {
            self.xp = total;
            return false;
        }

        self.level = self.level.saturating_add(1);
        let next_requirement = level_requirement(self.level);
        self.xp = (total - requirement).min(next_requirement - 1);
        true
    }

    /// Administrative promotion: next level, experience reset
    pub fn force_level_up(&mut self) {
        self.level = self.level.saturating_add(1);
        self.xp = 0;
    }
}

/// Grant experience to the player, returning the new level on promotion
pub fn grant_experience(player: &mut Player, amount: u32) -> Option<u32> {
    if player.progress.grant(amount) {
        debug!(level = player.progress.level, "Player levelled up");
        Some(player.progress.level)
    } else {
        None
    }
}

/// Apply an upgrade to the player
pub fn apply_upgrade(player: &mut Player, upgrade: Upgrade) {
    match upgrade {
        Upgrade::Damage => player.upgrades.damage += DAMAGE_UPGRADE_STEP,
        Upgrade::FireRate => player.upgrades.fire_rate += FIRE_RATE_UPGRADE_STEP,
        Upgrade::ExtraCannon(direction) => {
            player.upgrades.add_cannon(direction);
        }
        Upgrade::MaxHealth => {
            player.max_health += MAX_HEALTH_UPGRADE_STEP;
            player.health = (player.health + MAX_HEALTH_UPGRADE_STEP).min(player.max_health);
        }
    }
}
