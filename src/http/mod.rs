//! HTTP surface: health endpoint, WebSocket route and static client files

pub mod routes;

pub use routes::build_router;
