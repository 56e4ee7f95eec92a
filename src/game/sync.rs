//! Client side of the relay protocol
//!
//! Turns local frame snapshots into outbound messages and merges relayed
//! peer state into the store. Remote players are only ever overwritten with
//! what their owners reported; nothing here simulates them.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::combat::PROJECTILE_HEIGHT;
use super::entities::RemotePlayer;
use super::snapshot::{FrameEvent, FrameSnapshot};
use super::store::EntityStore;
use crate::ws::protocol::{ClientMsg, PlayerInfo, PlayerStatePatch, ServerMsg, Vec3};

/// Frames between periodic state updates (about 20 Hz at 60 fps)
pub const DEFAULT_UPDATE_INTERVAL: u32 = 3;

impl From<&PlayerInfo> for RemotePlayer {
    fn from(info: &PlayerInfo) -> Self {
        Self {
            id: info.id,
            name: info.name.clone(),
            team: info.team.clone(),
            position: info.position,
            rotation: info.rotation,
            health: info.health,
            level: info.level,
            xp: info.xp,
            upgrades: info.upgrades.clone(),
            alive: info.health > 0.0,
        }
    }
}

/// Publish cadence and edge detection for one local player
#[derive(Debug)]
pub struct NetSync {
    local_id: Option<Uuid>,
    update_interval: u32,
    frames_since_update: u32,
    last_level: u32,
    was_alive: bool,
}

impl Default for NetSync {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL)
    }
}

impl NetSync {
    pub fn new(update_interval: u32) -> Self {
        let update_interval = update_interval.max(1);
        Self {
            local_id: None,
            update_interval,
            // the first frame always publishes
            frames_since_update: update_interval - 1,
            last_level: 1,
            was_alive: true,
        }
    }

    /// Id the relay assigned to us, once in a room
    pub fn local_id(&self) -> Option<Uuid> {
        self.local_id
    }

    /// Check if a periodic update is due this frame
    pub fn should_send(&mut self) -> bool {
        self.frames_since_update += 1;
        if self.frames_since_update >= self.update_interval {
            self.frames_since_update = 0;
            true
        } else {
            false
        }
    }

    /// Publish on the next check regardless of cadence
    pub fn force_next(&mut self) {
        self.frames_since_update = self.update_interval;
    }

    /// Messages to send for one local frame
    pub fn outbound(&mut self, snapshot: &FrameSnapshot) -> Vec<ClientMsg> {
        let player = &snapshot.player;
        let upgrades = serde_json::to_value(&player.upgrades).ok();
        let mut out = Vec::new();

        for event in &snapshot.events {
            if let FrameEvent::Shot {
                projectile_ids,
                x,
                z,
                direction,
            } = event
            {
                out.push(ClientMsg::PlayerShoot {
                    position: Some(Vec3::new(*x, PROJECTILE_HEIGHT, *z)),
                    direction: Some(*direction),
                    projectile_id: projectile_ids.first().map(|id| Value::from(id.get())),
                });
            }
        }

        if player.progress.level != self.last_level {
            self.last_level = player.progress.level;
            out.push(ClientMsg::PlayerLevelUp {
                level: Some(player.progress.level),
                xp: Some(player.progress.xp),
                upgrades: upgrades.clone(),
            });
            self.force_next();
        }

        if self.was_alive && !player.alive {
            out.push(ClientMsg::PlayerDeath { killer_id: None });
        }
        // respawns publish immediately too
        if self.was_alive != player.alive {
            self.force_next();
        }
        self.was_alive = player.alive;

        if self.should_send() {
            out.push(ClientMsg::PlayerUpdate(PlayerStatePatch {
                position: Some(Vec3::new(player.x, 0.0, player.z)),
                rotation: Some(player.rotation),
                health: Some(player.health),
                level: Some(player.progress.level),
                xp: Some(player.progress.xp),
                upgrades,
            }));
        }

        out
    }

    /// Merge one relayed message into the remote-player table. Returns true
    /// if the store changed.
    pub fn apply(&mut self, msg: &ServerMsg, store: &mut EntityStore) -> bool {
        match msg {
            ServerMsg::RoomCreated { player_id, .. } | ServerMsg::RoomJoined { player_id, .. } => {
                self.local_id = Some(*player_id);
                store.clear_remote_players();
                true
            }
            ServerMsg::ExistingPlayers { players } => {
                for info in players {
                    self.upsert(store, info);
                }
                !players.is_empty()
            }
            ServerMsg::PlayerJoined { player } => self.upsert(store, player),
            ServerMsg::PlayerLeft { player_id } => store.remove_remote_player(player_id).is_some(),
            ServerMsg::PlayerUpdate { player_id, patch } => {
                if patch.is_empty() {
                    return false;
                }
                let Some(remote) = store.remote_player_mut(player_id) else {
                    return false;
                };
                merge_patch(remote, patch);
                true
            }
            ServerMsg::PlayerLevelUp {
                player_id,
                level,
                xp,
                upgrades,
            } => {
                let Some(remote) = store.remote_player_mut(player_id) else {
                    return false;
                };
                merge_patch(
                    remote,
                    &PlayerStatePatch {
                        level: *level,
                        xp: *xp,
                        upgrades: upgrades.clone(),
                        ..Default::default()
                    },
                );
                true
            }
            ServerMsg::PlayerDamage {
                player_id, health, ..
            } => match (store.remote_player_mut(player_id), health) {
                (Some(remote), Some(health)) => {
                    remote.health = health.max(0.0);
                    true
                }
                _ => false,
            },
            ServerMsg::PlayerDeath { player_id, .. } => {
                let Some(remote) = store.remote_player_mut(player_id) else {
                    return false;
                };
                remote.alive = false;
                remote.health = 0.0;
                true
            }
            ServerMsg::PlayerShoot { .. } | ServerMsg::ChatMessage { .. } | ServerMsg::Error { .. } => {
                false
            }
        }
    }

    fn upsert(&self, store: &mut EntityStore, info: &PlayerInfo) -> bool {
        if Some(info.id) == self.local_id {
            return false;
        }
        debug!(player_id = %info.id, name = %info.name, "Remote player tracked");
        store.upsert_remote_player(RemotePlayer::from(info));
        true
    }
}

fn merge_patch(remote: &mut RemotePlayer, patch: &PlayerStatePatch) {
    if let Some(position) = patch.position {
        remote.position = position;
    }
    if let Some(rotation) = patch.rotation {
        remote.rotation = rotation;
    }
    if let Some(health) = patch.health {
        remote.health = health;
        remote.alive = health > 0.0;
    }
    if let Some(level) = patch.level {
        remote.level = level;
    }
    if let Some(xp) = patch.xp {
        remote.xp = xp;
    }
    if let Some(upgrades) = &patch.upgrades {
        remote.upgrades = upgrades.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::clock::SimulationClock;
    use crate::game::entities::{Player, Team};
    use crate::game::intent::InputIntent;
    use serde_json::json;

    fn store() -> EntityStore {
        EntityStore::new(Player::new("Ace".into(), Team::Red))
    }

    fn info(name: &str) -> PlayerInfo {
        PlayerInfo::new(Uuid::new_v4(), Some(name.into()), Some("Blue Wolves".into()))
    }

    #[test]
    fn first_frame_publishes_then_follows_cadence() {
        let mut clock = SimulationClock::empty("Ace", Team::Red, 1);
        let mut sync = NetSync::new(3);
        let updates = |msgs: Vec<ClientMsg>| {
            msgs.iter()
                .filter(|m| matches!(m, ClientMsg::PlayerUpdate(_)))
                .count()
        };

        let idle = InputIntent::default();
        assert_eq!(updates(sync.outbound(&clock.step(0.016, &idle))), 1);
        assert_eq!(updates(sync.outbound(&clock.step(0.016, &idle))), 0);
        assert_eq!(updates(sync.outbound(&clock.step(0.016, &idle))), 0);
        assert_eq!(updates(sync.outbound(&clock.step(0.016, &idle))), 1);
    }

    #[test]
    fn volley_and_level_up_are_published() {
        let mut clock = SimulationClock::empty("Ace", Team::Red, 1);
        let mut sync = NetSync::new(60);
        sync.outbound(&clock.step(0.0, &InputIntent::default()));

        clock.store_mut().player.progress.level = 2;
        let fire = InputIntent {
            aim_x: 10.0,
            fire: true,
            ..InputIntent::default()
        };
        let msgs = sync.outbound(&clock.step(0.016, &fire));
        let kinds: Vec<&str> = msgs.iter().map(ClientMsg::kind).collect();
        assert_eq!(kinds, vec!["PLAYER_SHOOT", "PLAYER_LEVEL_UP", "PLAYER_UPDATE"]);

        let ClientMsg::PlayerShoot { direction, .. } = &msgs[0] else {
            panic!("expected PLAYER_SHOOT");
        };
        assert_eq!(*direction, Some(0.0));
    }

    #[test]
    fn death_is_published_once() {
        let mut clock = SimulationClock::empty("Ace", Team::Red, 1);
        let mut sync = NetSync::new(60);
        clock.store_mut().player.health = 0.001;

        let deaths = |msgs: &[ClientMsg]| {
            msgs.iter()
                .filter(|m| matches!(m, ClientMsg::PlayerDeath { .. }))
                .count()
        };
        let first = sync.outbound(&clock.step(0.1, &InputIntent::default()));
        let second = sync.outbound(&clock.step(0.1, &InputIntent::default()));
        assert_eq!(deaths(&first), 1);
        assert_eq!(deaths(&second), 0);
    }

    #[test]
    fn existing_players_then_partial_updates() {
        let mut store = store();
        let mut sync = NetSync::default();
        let peer = info("Zed");

        sync.apply(
            &ServerMsg::RoomJoined {
                room_code: "ABC234".into(),
                player_id: Uuid::new_v4(),
            },
            &mut store,
        );
        sync.apply(
            &ServerMsg::ExistingPlayers {
                players: vec![peer.clone()],
            },
            &mut store,
        );
        assert_eq!(store.remote_players().count(), 1);

        let moved = PlayerStatePatch {
            position: Some(Vec3::new(3.0, 0.0, 4.0)),
            level: Some(3),
            ..Default::default()
        };
        sync.apply(
            &ServerMsg::PlayerUpdate {
                player_id: peer.id,
                patch: moved,
            },
            &mut store,
        );

        let hurt = PlayerStatePatch {
            health: Some(55.0),
            ..Default::default()
        };
        assert!(sync.apply(
            &ServerMsg::PlayerUpdate {
                player_id: peer.id,
                patch: hurt,
            },
            &mut store,
        ));

        let remote = store.remote_player(&peer.id).unwrap();
        assert_eq!(remote.health, 55.0);
        assert_eq!(remote.position, Vec3::new(3.0, 0.0, 4.0));
        assert_eq!(remote.level, 3);
        assert_eq!(remote.name, "Zed");
    }

    #[test]
    fn death_level_up_and_leave() {
        let mut store = store();
        let mut sync = NetSync::default();
        let peer = info("Zed");
        sync.apply(&ServerMsg::PlayerJoined { player: peer.clone() }, &mut store);

        sync.apply(
            &ServerMsg::PlayerLevelUp {
                player_id: peer.id,
                level: Some(5),
                xp: Some(12),
                upgrades: Some(json!({"damage": 1.5})),
            },
            &mut store,
        );
        sync.apply(
            &ServerMsg::PlayerDeath {
                player_id: peer.id,
                killer_id: None,
            },
            &mut store,
        );
        let remote = store.remote_player(&peer.id).unwrap();
        assert_eq!((remote.level, remote.xp), (5, 12));
        assert_eq!(remote.upgrades["damage"], 1.5);
        assert!(!remote.alive);

        assert!(sync.apply(&ServerMsg::PlayerLeft { player_id: peer.id }, &mut store));
        assert!(store.remote_player(&peer.id).is_none());
    }

    #[test]
    fn empty_update_changes_nothing() {
        let mut store = store();
        let mut sync = NetSync::default();
        let peer = info("Bob");
        sync.apply(&ServerMsg::PlayerJoined { player: peer.clone() }, &mut store);

        assert!(!sync.apply(
            &ServerMsg::PlayerUpdate {
                player_id: peer.id,
                patch: PlayerStatePatch::default(),
            },
            &mut store,
        ));
        let remote = store.remote_player(&peer.id).unwrap();
        assert_eq!(remote.health, peer.health);
        assert!(remote.alive);
    }

    #[test]
    fn unknown_peers_and_self_are_ignored() {
        let mut store = store();
        let mut sync = NetSync::default();
        let me = Uuid::new_v4();
        sync.apply(
            &ServerMsg::RoomCreated {
                room_code: "ABC234".into(),
                player_id: me,
            },
            &mut store,
        );

        assert!(!sync.apply(
            &ServerMsg::PlayerUpdate {
                player_id: Uuid::new_v4(),
                patch: PlayerStatePatch::default(),
            },
            &mut store,
        ));
        let mut myself = info("Ace");
        myself.id = me;
        assert!(!sync.apply(&ServerMsg::PlayerJoined { player: myself }, &mut store));
        assert_eq!(store.remote_players().count(), 0);
        assert_eq!(sync.local_id(), Some(me));
    }
}
