mod file_config;

pub use file_config::FileConfig;

use crate::session::SessionConfig;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ORDER_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub order_timeout_secs: u64,
    pub busy_timeout_ms: u64,
    pub seed_demo_data: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            order_timeout_secs: DEFAULT_ORDER_TIMEOUT_SECS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            seed_demo_data: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub order_timeout: Duration,
    pub busy_timeout: Duration,
    pub seed_demo_data: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified on the command line or in config file")
            })?;

        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        // The database file itself is created on first use, its directory is not.
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let order_timeout_secs = file.order_timeout_secs.unwrap_or(cli.order_timeout_secs);
        if order_timeout_secs == 0 {
            bail!("order_timeout_secs must be greater than zero");
        }

        let busy_timeout_ms = file.busy_timeout_ms.unwrap_or(cli.busy_timeout_ms);
        if busy_timeout_ms > i32::MAX as u64 {
            bail!(
                "busy_timeout_ms must be at most {} (got {})",
                i32::MAX,
                busy_timeout_ms
            );
        }
        let seed_demo_data = file.seed_demo_data.unwrap_or(cli.seed_demo_data);

        Ok(Self {
            db_path,
            order_timeout: Duration::from_secs(order_timeout_secs),
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            seed_demo_data,
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.db_path.clone()).with_busy_timeout(self.busy_timeout)
    }
}
