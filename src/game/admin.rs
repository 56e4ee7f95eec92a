//! Admin console commands

use thiserror::Error;
use tracing::info;

use super::clock::SimulationClock;
use super::entities::Team;

pub const HELP_TEXT: &str = "\
nohealthdecay / godmode - Toggle health decay
levelup [name] - Grant level up to player or bot
addbot [team] - Add a bot (red/blue/green)
removebot [name] - Remove bot by name or last bot
heal - Restore player health
clear - Clear command input
help - Show this help";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminCommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}. Type 'help' for commands.")]
    Unknown(String),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    ToggleHealthDecay,
    /// `None` targets the local player
    LevelUp(Option<String>),
    AddBot(Option<Team>),
    /// `None` removes the most recently added enemy
    RemoveBot(Option<String>),
    Heal,
    Help,
    Clear,
}

impl AdminCommand {
    /// Parse a console line. Keywords are case-insensitive.
    pub fn parse(line: &str) -> Result<Self, AdminCommandError> {
        let line = line.trim();
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line, ""),
        };
        let argument = (!rest.is_empty()).then(|| rest.to_string());

        match keyword.to_ascii_lowercase().as_str() {
            "" => Err(AdminCommandError::Empty),
            "godmode" | "nohealthdecay" => Ok(Self::ToggleHealthDecay),
            "levelup" => Ok(Self::LevelUp(argument)),
            "addbot" => match argument {
                None => Ok(Self::AddBot(None)),
                Some(key) => Team::from_key(&key)
                    .map(|team| Self::AddBot(Some(team)))
                    .ok_or(AdminCommandError::UnknownTeam(key)),
            },
            "removebot" => Ok(Self::RemoveBot(argument)),
            "heal" => Ok(Self::Heal),
            "help" => Ok(Self::Help),
            "clear" => Ok(Self::Clear),
            other => Err(AdminCommandError::Unknown(other.to_string())),
        }
    }

    /// Apply to the simulation, returning the console feedback line
    pub fn execute(self, clock: &mut SimulationClock) -> String {
        info!(command = ?self, "Admin command");

        match self {
            Self::ToggleHealthDecay => {
                let enabled = !clock.health_decay();
                clock.set_health_decay(enabled);
                if enabled {
                    "Health decay enabled".to_string()
                } else {
                    "Health decay disabled".to_string()
                }
            }
            Self::LevelUp(None) => {
                clock.store_mut().player.progress.force_level_up();
                "Player leveled up!".to_string()
            }
            Self::LevelUp(Some(name)) => {
                let mut count = 0;
                for enemy in clock.store_mut().enemies_mut() {
                    if enemy.name.eq_ignore_ascii_case(&name) {
                        enemy.level += 1;
                        count += 1;
                    }
                }
                if count == 0 {
                    format!("No bot named {name}")
                } else {
                    format!("Leveled up {name}")
                }
            }
            Self::AddBot(team) => {
                let id = clock.add_bot(team);
                match clock.store().enemy(id) {
                    Some(enemy) => format!("Added {} on team {}", enemy.name, enemy.team.display_name()),
                    None => "Added bot".to_string(),
                }
            }
            Self::RemoveBot(name) => match clock.remove_bot(name.as_deref()).as_slice() {
                [] => "No bot to remove".to_string(),
                [removed] => format!("Removed bot {removed}"),
                removed => format!("Removed {} bots named {}", removed.len(), removed[0]),
            },
            Self::Heal => {
                let player = &mut clock.store_mut().player;
                player.health = player.max_health;
                "Player healed".to_string()
            }
            Self::Help => HELP_TEXT.to_string(),
            Self::Clear => String::new(),
        }
    }
}
