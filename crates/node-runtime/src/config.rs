//! # Node Configuration
//!
//! Defaults for every subsystem, overridden from `B2_*` environment variables:
//!
//! | Variable            | Field                          |
//! |---------------------|--------------------------------|
//! | `B2_DATA_DIR`       | `data_dir` (`:memory:` for none) |
//! | `B2_LISTEN_ADDR`    | `network.listen_addr`          |
//! | `B2_PEERS`          | `network.peers`, comma separated |
//! | `B2_TOPIC`          | `network.topic`, 64 hex chars  |
//! | `B2_CYCLE_SECS`     | `ledger.cycle_interval_secs`   |
//! | `B2_WORK_THRESHOLD` | `ledger.work_threshold`        |
//! | `B2_DIFFICULTY`     | `ledger.difficulty`            |
//! | `B2_INTERACTIVE`    | `interactive`                  |

use b2_03_ledger::LedgerConfig;
use b2_05_peer_network::{NetworkConfig, Topic};
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const MEMORY_DATA_DIR: &str = ":memory:";

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Root of the `blocks/` and `mempool/` directories; `None` keeps both in memory.
    pub data_dir: Option<PathBuf>,
    pub ledger: LedgerConfig,
    pub network: NetworkConfig,
    /// Read instructions from stdin.
    pub interactive: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: Some(PathBuf::from("b2db-data")),
            ledger: LedgerConfig::default(),
            network: NetworkConfig::default(),
            interactive: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl NodeConfig {
    /// In-memory stores, loopback listener on a free port, no stdin.
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            network: NetworkConfig::local(),
            interactive: false,
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `B2_*` variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("B2_DATA_DIR") {
            config.data_dir = match dir.trim() {
                "" | MEMORY_DATA_DIR => None,
                dir => Some(PathBuf::from(dir)),
            };
        }
        if let Some(value) = lookup("B2_LISTEN_ADDR") {
            config.network.listen_addr = parse("B2_LISTEN_ADDR", &value)?;
        }
        if let Some(value) = lookup("B2_PEERS") {
            config.network.peers = value
                .split(',')
                .map(str::trim)
                .filter(|peer| !peer.is_empty())
                .map(|peer| parse::<SocketAddr>("B2_PEERS", peer))
                .collect::<Result<_, _>>()?;
        }
        if let Some(value) = lookup("B2_TOPIC") {
            config.network.topic = parse::<Topic>("B2_TOPIC", &value)?;
        }
        if let Some(value) = lookup("B2_CYCLE_SECS") {
            config.ledger.cycle_interval_secs = parse("B2_CYCLE_SECS", &value)?;
        }
        if let Some(value) = lookup("B2_WORK_THRESHOLD") {
            config.ledger.work_threshold = parse("B2_WORK_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("B2_DIFFICULTY") {
            config.ledger.difficulty = parse("B2_DIFFICULTY", &value)?;
            config.ledger.validate().map_err(|e| ConfigError::Invalid {
                var: "B2_DIFFICULTY",
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(value) = lookup("B2_INTERACTIVE") {
            config.interactive = parse_flag("B2_INTERACTIVE", &value)?;
        }

        Ok(config)
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected a boolean".into(),
        }),
    }
}
