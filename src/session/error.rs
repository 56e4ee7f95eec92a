//! Session errors. The `Display` text is what clients see in `ERROR`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full (max 4 players)")]
    RoomFull,

    #[error("Not in a room")]
    NotInRoom,

    #[error("Already in this room")]
    AlreadyInRoom,

    #[error("Unknown connection")]
    UnknownConnection,
}
