//! Process-wide room and connection registry
//!
//! Created once at startup and shared with every connection handler through
//! `AppState`. Guards on `rooms` and `connections` are never held across each
//! other's lookups.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::SessionError;
use super::mirror::{MirrorVerdict, PeerStateMirror, TrustingMirror};
use super::room::{deliver, generate_room_code, Outbox, PlayerSession, Room};
use crate::ws::protocol::{ClientMsg, PlayerInfo, ServerMsg};

/// One live WebSocket
struct Connection {
    outbox: Outbox,
    room: Option<String>,
}

pub struct SessionRegistry {
    rooms: DashMap<String, Room>,
    connections: DashMap<Uuid, Connection>,
    rng: Mutex<ChaCha8Rng>,
    mirror: Arc<dyn PeerStateMirror>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::from_rng(ChaCha8Rng::from_entropy())
    }

    /// Deterministic room codes
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_rng(rng: ChaCha8Rng) -> Self {
        Self {
            rooms: DashMap::new(),
            connections: DashMap::new(),
            rng: Mutex::new(rng),
            mirror: Arc::new(TrustingMirror),
        }
    }

    /// Replace the review hook for relayed gameplay messages
    pub fn with_mirror(mut self, mirror: impl PeerStateMirror + 'static) -> Self {
        self.mirror = Arc::new(mirror);
        self
    }

    /// Track a new connection and assign its player id
    pub fn register(&self, outbox: Outbox) -> Uuid {
        let player_id = Uuid::new_v4();
        self.connections
            .insert(player_id, Connection { outbox, room: None });
        debug!(player_id = %player_id, "Connection registered");
        player_id
    }

    fn outbox(&self, player_id: Uuid) -> Option<Outbox> {
        self.connections.get(&player_id).map(|c| c.outbox.clone())
    }

    /// Room the connection is currently in
    pub fn current_room(&self, player_id: Uuid) -> Option<String> {
        self.connections
            .get(&player_id)
            .and_then(|c| c.room.clone())
    }

    fn set_room(&self, player_id: Uuid, code: Option<String>) {
        if let Some(mut connection) = self.connections.get_mut(&player_id) {
            connection.room = code;
        }
    }

    /// Handle one decoded client message. Failures the client should know
    /// about are answered with `ERROR`; the rest are logged.
    pub fn dispatch(&self, player_id: Uuid, msg: ClientMsg) {
        let kind = msg.kind();
        let result = match msg {
            ClientMsg::CreateRoom { player_name, team } => {
                self.create_room(player_id, player_name, team).map(|_| ())
            }
            ClientMsg::JoinRoom {
                room_code,
                player_name,
                team,
            } => self.join_room(player_id, &room_code, player_name, team),
            ClientMsg::LeaveRoom => {
                self.leave(player_id);
                Ok(())
            }
            ClientMsg::ChatMessage { message } => self.chat(player_id, message),
            gameplay => self.relay(player_id, gameplay),
        };

        match result {
            Ok(()) => {}
            Err(e @ (SessionError::RoomNotFound | SessionError::RoomFull | SessionError::AlreadyInRoom)) => {
                info!(player_id = %player_id, kind, error = %e, "Request refused");
                if let Some(outbox) = self.outbox(player_id) {
                    deliver(&outbox, player_id, ServerMsg::Error { message: e.to_string() });
                }
            }
            Err(SessionError::NotInRoom) => {
                debug!(player_id = %player_id, kind, "Dropped message outside a room");
            }
            Err(e) => {
                warn!(player_id = %player_id, kind, error = %e, "Dispatch failed");
            }
        }
    }

    /// Open a room with the sender as host and sole occupant. A sender
    /// already in a room leaves it first.
    pub fn create_room(
        &self,
        player_id: Uuid,
        player_name: Option<String>,
        team: Option<String>,
    ) -> Result<String, SessionError> {
        let outbox = self.outbox(player_id).ok_or(SessionError::UnknownConnection)?;
        self.leave(player_id);

        let session = PlayerSession::new(PlayerInfo::new(player_id, player_name, team), outbox.clone());
        let code = loop {
            let candidate = generate_room_code(&mut *self.rng.lock());
            match self.rooms.entry(candidate.clone()) {
                Entry::Occupied(_) => {
                    debug!(room = %candidate, "Room code collision, drawing again");
                }
                Entry::Vacant(slot) => {
                    slot.insert(Room::new(candidate.clone(), session));
                    break candidate;
                }
            }
        };

        self.set_room(player_id, Some(code.clone()));
        deliver(
            &outbox,
            player_id,
            ServerMsg::RoomCreated {
                room_code: code.clone(),
                player_id,
            },
        );

        info!(room = %code, player_id = %player_id, "Room created");
        Ok(code)
    }

    /// Join an existing room. On failure nothing changes, including the
    /// sender's current room.
    pub fn join_room(
        &self,
        player_id: Uuid,
        room_code: &str,
        player_name: Option<String>,
        team: Option<String>,
    ) -> Result<(), SessionError> {
        let outbox = self.outbox(player_id).ok_or(SessionError::UnknownConnection)?;
        let previous = self.current_room(player_id);
        if previous.as_deref() == Some(room_code) {
            return Err(SessionError::AlreadyInRoom);
        }

        let info = PlayerInfo::new(player_id, player_name, team);
        {
            let mut room = self
                .rooms
                .get_mut(room_code)
                .ok_or(SessionError::RoomNotFound)?;
            room.add(PlayerSession::new(info.clone(), outbox.clone()))?;

            // Queued under the room guard so no relayed message can overtake
            // the joiner's confirmation.
            deliver(
                &outbox,
                player_id,
                ServerMsg::RoomJoined {
                    room_code: room_code.to_string(),
                    player_id,
                },
            );
            deliver(
                &outbox,
                player_id,
                ServerMsg::ExistingPlayers {
                    players: room.roster_except(player_id),
                },
            );
            room.broadcast(&ServerMsg::PlayerJoined { player: info.clone() }, Some(player_id));
        }

        if previous.is_some() {
            self.leave(player_id);
        }
        self.set_room(player_id, Some(room_code.to_string()));

        info!(room = %room_code, player_id = %player_id, name = %info.name, "Player joined room");
        Ok(())
    }

    /// Remove the sender from its room, notify the rest and reap the room if
    /// it emptied. Safe to call any number of times; returns the room left.
    pub fn leave(&self, player_id: Uuid) -> Option<String> {
        let code = self
            .connections
            .get_mut(&player_id)
            .and_then(|mut c| c.room.take())?;

        let now_empty = match self.rooms.get_mut(&code) {
            Some(mut room) => {
                room.remove(player_id);
                room.broadcast(&ServerMsg::PlayerLeft { player_id }, None);
                room.is_empty()
            }
            None => false,
        };

        info!(room = %code, player_id = %player_id, "Player left room");
        if now_empty && self.rooms.remove_if(&code, |_, room| room.is_empty()).is_some() {
            info!(room = %code, "Room deleted (empty)");
        }
        Some(code)
    }

    /// Transport closed: leave once, then forget the connection
    pub fn disconnect(&self, player_id: Uuid) {
        self.leave(player_id);
        if self.connections.remove(&player_id).is_some() {
            debug!(player_id = %player_id, "Connection removed");
        }
    }

    /// Forward a gameplay message to the sender's room peers. State-bearing
    /// messages update the sender's mirror first.
    pub fn relay(&self, player_id: Uuid, msg: ClientMsg) -> Result<(), SessionError> {
        let code = self.current_room(player_id).ok_or(SessionError::NotInRoom)?;
        let mut room = self.rooms.get_mut(&code).ok_or(SessionError::RoomNotFound)?;
        let sender = room.player_mut(player_id).ok_or(SessionError::NotInRoom)?;

        if let MirrorVerdict::Reject(reason) = self.mirror.review(&sender.info, &msg) {
            warn!(room = %code, player_id = %player_id, kind = msg.kind(), %reason, "Peer message rejected");
            return Ok(());
        }

        let outbound = match msg {
            ClientMsg::PlayerUpdate(patch) => {
                patch.apply_to(&mut sender.info);
                ServerMsg::PlayerUpdate { player_id, patch }
            }
            ClientMsg::PlayerLevelUp { level, xp, upgrades } => {
                if let Some(level) = level {
                    sender.info.level = level;
                }
                if let Some(xp) = xp {
                    sender.info.xp = xp;
                }
                if let Some(upgrades) = &upgrades {
                    sender.info.upgrades = upgrades.clone();
                }
                ServerMsg::PlayerLevelUp {
                    player_id,
                    level,
                    xp,
                    upgrades,
                }
            }
            ClientMsg::PlayerShoot {
                position,
                direction,
                projectile_id,
            } => ServerMsg::PlayerShoot {
                player_id,
                position,
                direction,
                projectile_id,
            },
            ClientMsg::PlayerDamage {
                damage,
                health,
                attacker_id,
            } => ServerMsg::PlayerDamage {
                player_id,
                damage,
                health,
                attacker_id,
            },
            ClientMsg::PlayerDeath { killer_id } => ServerMsg::PlayerDeath {
                player_id,
                killer_id,
            },
            other => {
                debug!(kind = other.kind(), "Not a relayed message");
                return Ok(());
            }
        };

        room.broadcast(&outbound, Some(player_id));
        Ok(())
    }

    /// Chat goes to everyone in the room, sender included
    pub fn chat(&self, player_id: Uuid, message: String) -> Result<(), SessionError> {
        let code = self.current_room(player_id).ok_or(SessionError::NotInRoom)?;
        let room = self.rooms.get(&code).ok_or(SessionError::RoomNotFound)?;
        let player_name = room
            .player(player_id)
            .ok_or(SessionError::NotInRoom)?
            .info
            .name
            .clone();

        room.broadcast(
            &ServerMsg::ChatMessage {
                player_id,
                player_name,
                message,
            },
            None,
        );
        Ok(())
    }

    /// Drop rooms that have sat empty for longer than `max_age`
    pub fn sweep_stale_rooms(&self, max_age: chrono::Duration) -> usize {
        self.sweep_stale_rooms_at(Utc::now(), max_age)
    }

    fn sweep_stale_rooms_at(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> usize {
        let mut swept = 0;
        self.rooms.retain(|code, room| {
            let stale = room.is_empty() && now - room.created_at > max_age;
            if stale {
                info!(room = %code, "Cleaned up old empty room");
                swept += 1;
            }
            !stale
        });
        swept
    }

    /// Periodic retention sweep. Stops on its own once the registry is gone.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration, max_age: chrono::Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let swept = registry.sweep_stale_rooms(max_age);
                if swept > 0 {
                    info!(swept, rooms = registry.room_count(), "Room sweep finished");
                }
            }
        })
    }

    pub fn room_exists(&self, code: &str) -> bool {
        self.rooms.contains_key(code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Players currently in a room
    pub fn player_count(&self) -> usize {
        self.rooms.iter().map(|r| r.len()).sum()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Server-side mirror of a room's occupants, in join order
    pub fn roster(&self, code: &str) -> Option<Vec<PlayerInfo>> {
        self.rooms
            .get(code)
            .map(|room| room.players().map(|p| p.info.clone()).collect())
    }

    pub fn host(&self, code: &str) -> Option<Uuid> {
        self.rooms.get(code).map(|room| room.host_id)
    }
}
