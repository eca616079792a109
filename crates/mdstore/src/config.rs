//! Configuration for store operations
//!
//! Lock timing is tunable per deployment. Values resolve in this order
//! (highest first):
//!
//! 1. Environment variables (`MDSTORE_LOCK_*`)
//! 2. `[lock]` table of a TOML config file
//! 3. Built-in defaults (50 ms retry, 30 s stale age, 10 s timeout)
//!
//! ```toml
//! [lock]
//! retry_interval_ms = 50
//! stale_after_ms = 30000
//! timeout_ms = 10000
//! kernel_timeout_ms = 5000
//! ```

use crate::io::error::StoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const ENV_RETRY_MS: &str = "MDSTORE_LOCK_RETRY_MS";
pub const ENV_STALE_MS: &str = "MDSTORE_LOCK_STALE_MS";
pub const ENV_TIMEOUT_MS: &str = "MDSTORE_LOCK_TIMEOUT_MS";
pub const ENV_KERNEL_TIMEOUT_MS: &str = "MDSTORE_LOCK_KERNEL_TIMEOUT_MS";

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory lock timing
    #[serde(default)]
    pub lock: LockConfig,
}

/// Timing for the directory lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Sleep between acquisition attempts
    pub retry_interval_ms: u64,
    /// Age after which a lock marker is treated as abandoned
    pub stale_after_ms: u64,
    /// Overall acquisition deadline for the lock-marker strategy
    pub timeout_ms: u64,
    /// Optional deadline for the kernel lock; `None` blocks until granted
    pub kernel_timeout_ms: Option<u64>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 50,
            stale_after_ms: 30_000,
            timeout_ms: 10_000,
            kernel_timeout_ms: None,
        }
    }
}

impl LockConfig {
    /// Defaults with `MDSTORE_LOCK_*` overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn kernel_timeout(&self) -> Option<Duration> {
        self.kernel_timeout_ms.map(Duration::from_millis)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |name: &str| lookup(name).and_then(|raw| parse_millis(name, &raw));
        if let Some(ms) = millis(ENV_RETRY_MS) {
            self.retry_interval_ms = ms;
        }
        if let Some(ms) = millis(ENV_STALE_MS) {
            self.stale_after_ms = ms;
        }
        if let Some(ms) = millis(ENV_TIMEOUT_MS) {
            self.timeout_ms = ms;
        }
        if let Some(ms) = millis(ENV_KERNEL_TIMEOUT_MS) {
            self.kernel_timeout_ms = Some(ms);
        }
    }
}

impl StoreConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self {
            lock: LockConfig::from_env(),
        }
    }

    /// Parse a TOML document. Missing tables and keys take their defaults.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, StoreError> {
        toml::from_str(contents).map_err(|e| StoreError::Config {
            path: origin.to_path_buf(),
            source: e,
        })
    }

    /// Load `path`, then apply environment overrides.
    ///
    /// A missing file is not an error: the result is defaults plus
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file exists but cannot be read, or
    /// `StoreError::Config` if it is not valid TOML for this shape.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents, path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        config.lock.apply_env_overrides();
        Ok(config)
    }
}

fn parse_millis(name: &str, raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(_) => {
            warn!("Ignoring {name}={raw:?}: expected milliseconds as an integer");
            None
        }
    }
}
