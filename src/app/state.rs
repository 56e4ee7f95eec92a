//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, SessionRegistry::new())
    }

    /// State around a prepared registry (seeded or with a custom mirror)
    pub fn with_registry(config: Config, registry: SessionRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
        }
    }
}
