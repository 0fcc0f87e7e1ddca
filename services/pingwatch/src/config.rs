//! Configuration types for the pingwatch service

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Probe period used when none is configured or the configured one is unusable
pub const DEFAULT_PERIOD_SECONDS: u64 = 5;

/// Longest wait for in-flight probes at shutdown
pub const MAX_SHUTDOWN_GRACE_SECONDS: u64 = 3600;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Sweep timing and concurrency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between sweep starts. Unparseable or non-positive values are
    /// dropped at load time and the default applies.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub period_seconds: Option<u64>,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_seconds: None,
            probe_timeout_seconds: default_probe_timeout(),
            max_concurrent_probes: default_max_concurrent_probes(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

impl SchedulerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds.unwrap_or(DEFAULT_PERIOD_SECONDS))
    }

    /// Per-probe timeout, clamped to half the period when it would not finish
    /// before the next sweep is due
    pub fn probe_timeout(&self) -> Duration {
        let period = self.period();
        let timeout = Duration::from_secs(self.probe_timeout_seconds);
        if timeout.is_zero() || timeout >= period {
            let clamped = period / 2;
            tracing::warn!(
                "Probe timeout {:?} is not shorter than the period {:?}; using {:?}",
                timeout,
                period,
                clamped
            );
            clamped
        } else {
            timeout
        }
    }

    pub fn max_concurrent_probes(&self) -> usize {
        self.max_concurrent_probes.max(1)
    }

    pub fn shutdown_grace(&self) -> Duration {
        if self.shutdown_grace_seconds > MAX_SHUTDOWN_GRACE_SECONDS {
            tracing::warn!(
                "Shutdown grace {}s is too long; using {}s",
                self.shutdown_grace_seconds,
                MAX_SHUTDOWN_GRACE_SECONDS
            );
            return Duration::from_secs(MAX_SHUTDOWN_GRACE_SECONDS);
        }
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

/// Where targets are persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file. Targets are kept in memory when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_api_port(),
        }
    }
}

impl Config {
    /// Apply `PINGWATCH_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PINGWATCH_PERIOD") {
            match parse_period(&raw) {
                Some(seconds) => self.scheduler.period_seconds = Some(seconds),
                None => {
                    tracing::warn!(
                        "Ignoring invalid PINGWATCH_PERIOD '{}'; using {}s",
                        raw,
                        DEFAULT_PERIOD_SECONDS
                    );
                    self.scheduler.period_seconds = None;
                }
            }
        }

        if let Some(path) = lookup("PINGWATCH_DB").filter(|p| !p.trim().is_empty()) {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup("PINGWATCH_PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.api.port = port,
                Err(e) => tracing::warn!("Ignoring invalid PINGWATCH_PORT '{}': {}", raw, e),
            }
        }
    }
}

/// Parse a period in whole seconds; `None` for anything unusable
pub fn parse_period(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|s| *s > 0)
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let seconds = match &value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Number(n) => n.as_u64().filter(|s| *s > 0),
        serde_json::Value::String(s) => parse_period(s),
        _ => None,
    };
    if seconds.is_none() {
        tracing::warn!(
            "Ignoring invalid period_seconds {}; using {}s",
            value,
            DEFAULT_PERIOD_SECONDS
        );
    }
    Ok(seconds)
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_max_concurrent_probes() -> usize {
    8
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_api_port() -> u16 {
    8080
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::PingwatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
