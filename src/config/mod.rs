//! Handler configuration loaded from TOML.
//!
//! ```toml
//! [database]
//! path = "/var/lib/app/data.sqlite"
//! pool_size = 8
//! busy_timeout_ms = 2000
//! foreign_keys = true
//! ```
//!
//! Every key is optional; an empty file yields an in-memory database.

mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<HandlerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {:?}", path))
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<HandlerConfig> {
    let config: HandlerConfig = toml::from_str(content).context("Failed to parse config")?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &HandlerConfig) -> Result<()> {
    if config.database.pool_size == 0 {
        anyhow::bail!("Database pool_size cannot be 0");
    }

    if let Some(path) = &config.database.path {
        if path.as_os_str().is_empty() {
            anyhow::bail!("Database path cannot be empty; omit it for an in-memory database");
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tracing::warn!("Database directory does not exist: {:?}", parent);
            }
        }
    }

    Ok(())
}
