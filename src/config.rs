use std::path::Path;
use std::time::Duration;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bucket configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BucketConfig {
    /// capacity defines the maximum number of tokens the bucket refills to.
    pub capacity: u64,

    /// count defines the number of tokens available right after creation.
    /// Default to 0. May exceed capacity, in which case refill stays idle
    /// until the bucket has been drained below capacity.
    pub count: Option<u64>,

    /// interval_ms defines how many milliseconds pass between two refills.
    /// Required: true
    /// Minimum: 1
    pub interval_ms: u64,

    /// autostart defines whether the refill worker should be started
    /// as soon as the bucket is built. Default to false.
    pub autostart: Option<bool>,
}

impl BucketConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            let msg = "interval_ms must be at least 1".to_string();
            error!("{msg}");
            return Err(Error::Config(msg));
        }
        if let Some(count) = self.count {
            if count > self.capacity {
                warn!(
                    "Initial count {count} exceeds capacity {}, it will not be clamped",
                    self.capacity
                );
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Load a JSON config from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let vec = std::fs::read(path).map_err(|e| {
            error!("Fail to read config {}: {e}", path.display());
            Error::Io(e)
        })?;
        serde_json::from_slice(&vec).map_err(|e| {
            let msg = format!("Fail to deserialize config {}: {e}", path.display());
            error!("{msg}");
            Error::Config(msg)
        })
    }

    /// Export the config as JSON
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_vec_pretty(self).map_err(|e| {
            let msg = format!("Fail to serialize config: {e}");
            error!("{msg}");
            Error::Config(msg)
        })?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Read config from `TB_CAPACITY`, `TB_COUNT`, `TB_INTERVAL_MS`
    /// and `TB_AUTOSTART`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            capacity: parse_env("TB_CAPACITY")?.unwrap_or_default(),
            count: parse_env("TB_COUNT")?,
            interval_ms: parse_env("TB_INTERVAL_MS")?.unwrap_or_default(),
            autostart: parse_env::<String>("TB_AUTOSTART")?
                .map(|s| s.to_lowercase().parse::<bool>())
                .transpose()
                .map_err(|e| {
                    let msg = format!("Bad value for TB_AUTOSTART: {e}");
                    error!("{msg}");
                    Error::Config(msg)
                })?,
        })
    }
}

fn parse_env<T>(key: &'static str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(s) => s.trim().parse().map(Some).map_err(|e| {
            let msg = format!("Bad value for {key}: {e}");
            error!("{msg}");
            Error::Config(msg)
        }),
        Err(_) => Ok(None),
    }
}
