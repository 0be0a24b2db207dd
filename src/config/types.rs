use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use tabula_db::PoolOptions;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HandlerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite database file (default: a private in-memory database)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Maximum pooled connections (default: 4)
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// How long a connection waits on a locked database, in milliseconds
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    /// Enforce foreign key constraints on every connection
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
}

fn default_pool_size() -> u32 {
    4
}
fn default_busy_timeout() -> u64 {
    5000
}
fn default_foreign_keys() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout(),
            foreign_keys: default_foreign_keys(),
        }
    }
}

impl DatabaseConfig {
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_size: self.pool_size,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            foreign_keys: self.foreign_keys,
        }
    }
}
