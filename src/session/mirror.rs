//! Review hook between a reported peer message and the relay
//!
//! The relay trusts reporters: [`TrustingMirror`] accepts everything. A
//! validating implementation can be swapped in through
//! [`SessionRegistry::with_mirror`](super::SessionRegistry::with_mirror)
//! without touching the simulation.

use crate::ws::protocol::{ClientMsg, PlayerInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorVerdict {
    /// Apply to the server mirror and relay
    Accept,
    /// Drop the message; the reason is logged
    Reject(String),
}

pub trait PeerStateMirror: Send + Sync {
    /// Judge a gameplay message from `sender`, whose last accepted state is
    /// given. Only called for messages that are relayed to peers.
    fn review(&self, sender: &PlayerInfo, msg: &ClientMsg) -> MirrorVerdict;
}

/// Accepts whatever clients report
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustingMirror;

impl PeerStateMirror for TrustingMirror {
    fn review(&self, _sender: &PlayerInfo, _msg: &ClientMsg) -> MirrorVerdict {
        MirrorVerdict::Accept
    }
}
