//! Game simulation modules

pub mod admin;
pub mod ai;
pub mod clock;
pub mod combat;
pub mod entities;
pub mod intent;
pub mod physics;
pub mod progression;
pub mod snapshot;
pub mod spawn;
pub mod store;
pub mod sync;

pub use admin::{AdminCommand, AdminCommandError};
pub use clock::SimulationClock;
pub use entities::Team;
pub use intent::{InputIntent, KeyState};
pub use snapshot::{FrameEvent, FrameSnapshot};
pub use store::{EntityId, EntityStore};
pub use sync::NetSync;
