//! Server configuration from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const ADDR_ENV: &str = "INKBOARD_ADDR";
pub const DATA_DIR_ENV: &str = "INKBOARD_DATA_DIR";
pub const CHANNEL_CAPACITY_ENV: &str = "INKBOARD_CHANNEL_CAPACITY";

/// Messages buffered per topic before slow receivers start dropping.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// File-backed stores live here; in-memory when unset.
    pub data_dir: Option<PathBuf>,
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3030)),
            data_dir: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(ADDR_ENV) {
            config.addr = value.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: ADDR_ENV,
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(value) = get(DATA_DIR_ENV) {
            config.data_dir = Some(PathBuf::from(value.trim()));
        }
        if let Some(value) = get(CHANNEL_CAPACITY_ENV) {
            config.channel_capacity = match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        name: CHANNEL_CAPACITY_ENV,
                        value,
                        reason: "must be positive".into(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: CHANNEL_CAPACITY_ENV,
                        value: value.clone(),
                        reason: e.to_string(),
                    });
                }
            };
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr.port(), 3030);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ADDR_ENV, "127.0.0.1:8080"),
            (DATA_DIR_ENV, "/var/lib/inkboard"),
            (CHANNEL_CAPACITY_ENV, "64"),
        ]))
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/inkboard")));
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    fn test_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup(&[(ADDR_ENV, "nowhere")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[(CHANNEL_CAPACITY_ENV, "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[(CHANNEL_CAPACITY_ENV, "many")])).is_err());
    }
}
