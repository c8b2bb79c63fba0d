//! # Config - environment-driven settings
//!
//! ```text
//! VAULT_WAL_PATH   WAL file path, or ":memory:" for no durability (default: "vendor.wal")
//! VAULT_WAL_SYNC   fsync every WAL append                          (default: "true")
//! VAULT_LOG        tracing filter directive                        (default: "info")
//! ```
//!
//! Values that fail to parse fall back to their defaults.

use std::path::PathBuf;

pub const ENV_WAL_PATH: &str = "VAULT_WAL_PATH";
pub const ENV_WAL_SYNC: &str = "VAULT_WAL_SYNC";
pub const ENV_LOG: &str = "VAULT_LOG";

pub const DEFAULT_WAL_PATH: &str = "vendor.wal";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Sentinel WAL path selecting a store without durability.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Durability {
    InMemory,
    Wal { path: PathBuf, sync: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub durability: Durability,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            durability: Durability::Wal {
                path: PathBuf::from(DEFAULT_WAL_PATH),
                sync: true,
            },
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup(ENV_WAL_PATH)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WAL_PATH.to_string());
        let sync = lookup(ENV_WAL_SYNC)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(true);
        let log_filter = lookup(ENV_LOG)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let durability = if path == IN_MEMORY {
            Durability::InMemory
        } else {
            Durability::Wal {
                path: PathBuf::from(path),
                sync,
            }
        };

        Self {
            durability,
            log_filter,
        }
    }
}

impl std::fmt::Display for Durability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Durability::InMemory => write!(f, "in-memory"),
            Durability::Wal { path, sync } => {
                write!(f, "wal={} sync={}", path.display(), sync)
            }
        }
    }
}
