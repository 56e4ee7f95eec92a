//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::util::rate_limit::DEFAULT_MESSAGE_RATE_LIMIT;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Directory served at `/` when set
    pub static_dir: Option<PathBuf>,
    /// Allowed client origins for CORS; empty allows any
    pub client_origins: Vec<String>,

    /// How often empty rooms are swept
    pub room_sweep_interval: Duration,
    /// Age after which an empty room is reclaimed
    pub room_stale_after: Duration,
    /// Max inbound messages per second per connection
    pub message_rate_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            static_dir: None,
            client_origins: Vec::new(),
            room_sweep_interval: Duration::from_secs(60 * 60),
            room_stale_after: Duration::from_secs(24 * 60 * 60),
            message_rate_limit: DEFAULT_MESSAGE_RATE_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        // PORT wins over SERVER_ADDR
        let server_addr: SocketAddr = match (lookup("PORT"), lookup("SERVER_ADDR")) {
            (Some(port), _) => format!("0.0.0.0:{}", port.trim())
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", port))?,
            (None, Some(addr)) => addr
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("SERVER_ADDR", addr))?,
            (None, None) => defaults.server_addr,
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            static_dir: lookup("STATIC_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            client_origins,
            room_sweep_interval: parse_secs(&lookup, "ROOM_SWEEP_INTERVAL_SECS")?
                .unwrap_or(defaults.room_sweep_interval),
            room_stale_after: parse_secs(&lookup, "ROOM_STALE_SECS")?
                .unwrap_or(defaults.room_stale_after),
            message_rate_limit: parse(&lookup, "MESSAGE_RATE_LIMIT")?
                .unwrap_or(defaults.message_rate_limit),
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key, raw)),
        None => Ok(None),
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    match parse::<u64>(lookup, key)? {
        Some(0) => Err(ConfigError::Invalid(key, "0".to_string())),
        other => Ok(other.map(Duration::from_secs)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.static_dir.is_none());
        assert!(config.client_origins.is_empty());
        assert_eq!(config.room_sweep_interval, Duration::from_secs(3600));
        assert_eq!(config.room_stale_after, Duration::from_secs(86_400));
        assert_eq!(config.message_rate_limit, 60);
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = load(&[("PORT", "8081"), ("SERVER_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:8081".parse().unwrap());

        let config = load(&[("SERVER_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let config = load(&[("CLIENT_ORIGIN", "http://a.test, http://b.test,")]).unwrap();
        assert_eq!(config.client_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid("PORT", _))
        ));
        assert!(matches!(
            load(&[("MESSAGE_RATE_LIMIT", "-3")]),
            Err(ConfigError::Invalid("MESSAGE_RATE_LIMIT", _))
        ));
        assert!(matches!(
            load(&[("ROOM_SWEEP_INTERVAL_SECS", "0")]),
            Err(ConfigError::Invalid("ROOM_SWEEP_INTERVAL_SECS", _))
        ));
    }
}
