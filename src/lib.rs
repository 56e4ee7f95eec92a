//! Nexus Arena
//!
//! Deterministic arena combat simulation plus the room-based relay that
//! lets several clients share an arena over WebSocket.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod session;
pub mod util;
pub mod ws;
