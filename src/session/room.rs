//! Rooms and their rosters

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::error::SessionError;
use crate::ws::protocol::{PlayerInfo, ServerMsg, ROOM_CAPACITY};

/// Room code characters. No 0, 1, I or O.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ROOM_CODE_LEN: usize = 6;

/// Per-connection outbound channel.
/// Bounded so a slow client cannot grow memory without limit.
pub type Outbox = mpsc::Sender<ServerMsg>;

/// Draw a fresh room code
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
}

/// Queue a message without waiting. Slow or gone clients just miss it.
pub fn deliver(outbox: &Outbox, player_id: Uuid, msg: ServerMsg) -> bool {
    match outbox.try_send(msg) {
        Ok(()) => true,
        Err(e) => {
            debug!(player_id = %player_id, error = %e, "Skipping send to slow or closed client");
            false
        }
    }
}

/// Server-side mirror of one occupant's last reported state
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub info: PlayerInfo,
    pub outbox: Outbox,
}

impl PlayerSession {
    pub fn new(info: PlayerInfo, outbox: Outbox) -> Self {
        Self { info, outbox }
    }

    pub fn id(&self) -> Uuid {
        self.info.id
    }

    pub fn send(&self, msg: ServerMsg) -> bool {
        deliver(&self.outbox, self.info.id, msg)
    }
}

#[derive(Debug)]
pub struct Room {
    pub code: String,
    pub host_id: Uuid,
    /// In join order
    players: Vec<PlayerSession>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// New room with the host as sole occupant
    pub fn new(code: String, host: PlayerSession) -> Self {
        Self {
            code,
            host_id: host.id(),
            players: vec![host],
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= ROOM_CAPACITY
    }

    pub fn contains(&self, player_id: Uuid) -> bool {
        self.players.iter().any(|p| p.id() == player_id)
    }

    pub fn player(&self, player_id: Uuid) -> Option<&PlayerSession> {
        self.players.iter().find(|p| p.id() == player_id)
    }

    pub fn player_mut(&mut self, player_id: Uuid) -> Option<&mut PlayerSession> {
        self.players.iter_mut().find(|p| p.id() == player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerSession> {
        self.players.iter()
    }

    /// Add an occupant, refusing at capacity
    pub fn add(&mut self, session: PlayerSession) -> Result<(), SessionError> {
        if self.contains(session.id()) {
            return Err(SessionError::AlreadyInRoom);
        }
        if self.is_full() {
            return Err(SessionError::RoomFull);
        }
        self.players.push(session);
        Ok(())
    }

    /// Remove an occupant. The host role passes to the longest-standing
    /// remaining player.
    pub fn remove(&mut self, player_id: Uuid) -> Option<PlayerSession> {
        let index = self.players.iter().position(|p| p.id() == player_id)?;
        let removed = self.players.remove(index);
        if self.host_id == player_id {
            if let Some(next) = self.players.first() {
                self.host_id = next.id();
            }
        }
        Some(removed)
    }

    /// Everyone's public state except `player_id`
    pub fn roster_except(&self, player_id: Uuid) -> Vec<PlayerInfo> {
        self.players
            .iter()
            .filter(|p| p.id() != player_id)
            .map(|p| p.info.clone())
            .collect()
    }

    /// Send to every occupant except `exclude`. Returns how many were queued.
    pub fn broadcast(&self, msg: &ServerMsg, exclude: Option<Uuid>) -> usize {
        self.players
            .iter()
            .filter(|p| Some(p.id()) != exclude)
            .filter(|p| p.send(msg.clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn session(name: &str) -> (PlayerSession, mpsc::Receiver<ServerMsg>) {
        let (tx, rx) = mpsc::channel(16);
        let info = PlayerInfo::new(Uuid::new_v4(), Some(name.into()), None);
        (PlayerSession::new(info, tx), rx)
    }

    #[test]
    fn codes_use_the_unambiguous_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            let code = generate_room_code(&mut rng);
            assert!(is_valid_room_code(&code), "bad code {code}");
            assert!(!code.chars().any(|c| "01IO".contains(c)));
        }
        assert!(!is_valid_room_code("ABC12"));
        assert!(!is_valid_room_code("abcdef"));
    }

    #[test]
    fn capacity_is_enforced() {
        let (host, _rx) = session("Host");
        let mut room = Room::new("ABCDEF".into(), host);
        let mut receivers = Vec::new();
        for i in 0..3 {
            let (s, rx) = session(&format!("P{i}"));
            receivers.push(rx);
            room.add(s).unwrap();
        }
        let (late, _late_rx) = session("Late");
        assert_eq!(room.add(late), Err(SessionError::RoomFull));
        assert_eq!(room.len(), ROOM_CAPACITY);
    }

    #[test]
    fn host_migrates_on_leave() {
        let (host, _a) = session("Host");
        let (second, _b) = session("Second");
        let host_id = host.id();
        let second_id = second.id();
        let mut room = Room::new("ABCDEF".into(), host);
        room.add(second).unwrap();

        assert!(room.remove(host_id).is_some());
        assert_eq!(room.host_id, second_id);
        assert!(room.remove(host_id).is_none());
        room.remove(second_id);
        assert!(room.is_empty());
    }

    #[test]
    fn broadcast_skips_the_excluded_sender() {
        let (host, mut host_rx) = session("Host");
        let (guest, mut guest_rx) = session("Guest");
        let host_id = host.id();
        let mut room = Room::new("ABCDEF".into(), host);
        room.add(guest).unwrap();

        let msg = ServerMsg::PlayerLeft {
            player_id: Uuid::nil(),
        };
        assert_eq!(room.broadcast(&msg, Some(host_id)), 1);
        assert!(host_rx.try_recv().is_err());
        assert_eq!(guest_rx.try_recv().unwrap(), msg);
    }
}
