//! Target record and health status types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of a monitored target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// No probe has completed yet
    Unknown,
    Healthy,
    Unhealthy,
}

impl TargetStatus {
    pub const ALL: [TargetStatus; 3] = [
        TargetStatus::Unknown,
        TargetStatus::Healthy,
        TargetStatus::Unhealthy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Unknown => "unknown",
            TargetStatus::Healthy => "healthy",
            TargetStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetStatus {
    type Err = crate::PingwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(TargetStatus::Unknown),
            "healthy" => Ok(TargetStatus::Healthy),
            "unhealthy" => Ok(TargetStatus::Unhealthy),
            other => Err(crate::PingwatchError::Storage(format!(
                "unrecognised target status '{}'",
                other
            ))),
        }
    }
}

/// A monitored endpoint and its accumulated health record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub status: TargetStatus,
    pub total_checks: u64,
    pub passed_checks: u64,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Target {
    /// A freshly registered target: unknown status and zeroed counters
    pub fn registered(id: i64, new: NewTarget, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            url: new.url,
            status: TargetStatus::Unknown,
            total_checks: 0,
            passed_checks: 0,
            last_checked_at: None,
            created_at,
        }
    }
}

/// Payload for registering a new target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTarget {
    pub name: String,
    pub url: String,
}

impl NewTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Trim the fields and reject empty names and non-http(s) URLs
    pub fn validate(self) -> crate::Result<Self> {
        let name = self.name.trim().to_string();
        let url = self.url.trim().to_string();

        if name.is_empty() {
            return Err(crate::PingwatchError::InvalidTarget(
                "name must not be empty".to_string(),
            ));
        }

        let parsed = reqwest::Url::parse(&url).map_err(|e| {
            crate::PingwatchError::InvalidTarget(format!("invalid url '{}': {}", url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(crate::PingwatchError::InvalidTarget(format!(
                "unsupported url scheme '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self { name, url })
    }
}
