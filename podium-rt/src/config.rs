//! Service configuration
//!
//! Loaded from an optional TOML file; every field has a compiled
//! default so the service starts with zero configuration. CLI flags
//! (see `main.rs`) override the file.

use podium_common::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Runtime configuration for the feedback service
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bind address
    pub host: String,
    /// HTTP/WebSocket port
    pub port: u16,
    /// Process every Nth video frame (process-wide load shedding)
    pub frame_sample_rate: u64,
    /// Minimum interval between feedback emissions on one connection
    pub feedback_interval_ms: i64,
    /// Maximum retained score history entries per session
    pub score_history_cap: usize,
    /// Optional bound on a single analyzer call; `None` means a slow
    /// analyzer stalls its connection until it returns (accepted
    /// trade-off for trusted in-process engines)
    pub analyzer_timeout_ms: Option<u64>,
    /// TTL for per-chunk metric cache entries on the side-channel
    pub metrics_cache_ttl_secs: u64,
    /// TTL for the session snapshot cached at start
    pub session_cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5731,
            frame_sample_rate: 3,
            feedback_interval_ms: 1000,
            score_history_cap: 50,
            analyzer_timeout_ms: None,
            metrics_cache_ttl_secs: 60,
            session_cache_ttl_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, or defaults if no path given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                toml::from_str(&contents)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.frame_sample_rate == 0 {
            return Err(Error::Config("frame_sample_rate must be >= 1".to_string()));
        }
        if self.feedback_interval_ms <= 0 {
            return Err(Error::Config("feedback_interval_ms must be positive".to_string()));
        }
        if self.score_history_cap == 0 {
            return Err(Error::Config("score_history_cap must be >= 1".to_string()));
        }
        Ok(())
    }
}
