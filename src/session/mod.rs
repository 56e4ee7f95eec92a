//! Multiplayer rooms and the relay between their occupants

pub mod error;
pub mod mirror;
pub mod registry;
pub mod room;

pub use error::SessionError;
pub use mirror::{MirrorVerdict, PeerStateMirror, TrustingMirror};
pub use registry::SessionRegistry;
pub use room::{PlayerSession, Room};
