//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Maximum players per room
pub const ROOM_CAPACITY: usize = 4;
/// Name used when a client does not send one
pub const DEFAULT_PLAYER_NAME: &str = "Player";
/// Team used when a client does not send one
pub const DEFAULT_TEAM: &str = "Red Phoenix";

/// Every `type` discriminator a client may send
pub const CLIENT_MESSAGE_TYPES: [&str; 9] = [
    "CREATE_ROOM",
    "JOIN_ROOM",
    "LEAVE_ROOM",
    "PLAYER_UPDATE",
    "PLAYER_SHOOT",
    "PLAYER_DAMAGE",
    "PLAYER_DEATH",
    "PLAYER_LEVEL_UP",
    "CHAT_MESSAGE",
];

/// World-space position as the client reports it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Inbound frames that could not be turned into a [`ClientMsg`]
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMsg {
    /// Open a new room with the sender as host
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team: Option<String>,
    },

    LeaveRoom,

    /// Periodic state; only the fields present are applied
    PlayerUpdate(PlayerStatePatch),

    #[serde(rename_all = "camelCase")]
    PlayerShoot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Vec3>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<f32>,
        /// Client-chosen, relayed untouched
        #[serde(default, skip_serializing_if = "Option::is_none")]
        projectile_id: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    PlayerDamage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        damage: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        health: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attacker_id: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    PlayerDeath {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        killer_id: Option<Value>,
    },

    PlayerLevelUp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        xp: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upgrades: Option<Value>,
    },

    ChatMessage {
        message: String,
    },
}

impl ClientMsg {
    /// Parse one text frame. Unknown discriminators are reported separately
    /// from frames that fail to parse.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::Malformed("missing type".to_string()))?;

        if !CLIENT_MESSAGE_TYPES.contains(&kind) {
            return Err(ProtocolError::UnknownEventType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Discriminator as sent on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "CREATE_ROOM",
            Self::JoinRoom { .. } => "JOIN_ROOM",
            Self::LeaveRoom => "LEAVE_ROOM",
            Self::PlayerUpdate(_) => "PLAYER_UPDATE",
            Self::PlayerShoot { .. } => "PLAYER_SHOOT",
            Self::PlayerDamage { .. } => "PLAYER_DAMAGE",
            Self::PlayerDeath { .. } => "PLAYER_DEATH",
            Self::PlayerLevelUp { .. } => "PLAYER_LEVEL_UP",
            Self::ChatMessage { .. } => "CHAT_MESSAGE",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMsg {
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_code: String, player_id: Uuid },

    #[serde(rename_all = "camelCase")]
    RoomJoined { room_code: String, player_id: Uuid },

    /// Sent to a joiner: everyone already in the room
    ExistingPlayers { players: Vec<PlayerInfo> },

    PlayerJoined { player: PlayerInfo },

    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: Uuid },

    #[serde(rename_all = "camelCase")]
    PlayerUpdate {
        player_id: Uuid,
        #[serde(flatten)]
        patch: PlayerStatePatch,
    },

    #[serde(rename_all = "camelCase")]
    PlayerShoot {
        player_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Vec3>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        projectile_id: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    PlayerDamage {
        player_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        damage: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        health: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attacker_id: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    PlayerDeath {
        player_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        killer_id: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    PlayerLevelUp {
        player_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        xp: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upgrades: Option<Value>,
    },

    /// Chat is echoed to the sender too
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        player_id: Uuid,
        player_name: String,
        message: String,
    },

    Error { message: String },
}

/// Roster entry as shown to other players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub team: String,
    pub position: Vec3,
    pub rotation: f32,
    pub health: f32,
    pub level: u32,
    pub xp: u32,
    /// Opaque to the server
    pub upgrades: Value,
}

impl PlayerInfo {
    /// Fresh roster entry at the origin with full health
    pub fn new(id: Uuid, name: Option<String>, team: Option<String>) -> Self {
        Self {
            id,
            name: name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string()),
            team: team
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TEAM.to_string()),
            position: Vec3::default(),
            rotation: 0.0,
            health: 100.0,
            level: 1,
            xp: 0,
            upgrades: Value::Object(Default::default()),
        }
    }
}

/// Partial player state. Absent fields leave the receiver's copy untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrades: Option<Value>,
}

impl PlayerStatePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite only the fields this patch carries
    pub fn apply_to(&self, info: &mut PlayerInfo) {
        if let Some(position) = self.position {
            info.position = position;
        }
        if let Some(rotation) = self.rotation {
            info.rotation = rotation;
        }
        if let Some(health) = self.health {
            info.health = health;
        }
        if let Some(level) = self.level {
            info.level = level;
        }
        if let Some(xp) = self.xp {
            info.xp = xp;
        }
        if let Some(upgrades) = &self.upgrades {
            info.upgrades = upgrades.clone();
        }
    }
}
