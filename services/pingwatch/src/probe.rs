//! Prober: one HTTP GET per target, classified into an outcome

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::io::HttpClient;

/// Classification of a single probe attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered with status 200
    Success,
    /// The endpoint answered with any other status
    Failure { status: u16 },
    /// No response: DNS, refused connection, timeout and the like
    TransportError { reason: String },
}

impl ProbeOutcome {
    /// Classify a received status code. Only 200 counts as a pass.
    pub fn from_status(status: u16) -> Self {
        if status == 200 {
            ProbeOutcome::Success
        } else {
            ProbeOutcome::Failure { status }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Success => write!(f, "success"),
            ProbeOutcome::Failure { status } => write!(f, "failure (status {})", status),
            ProbeOutcome::TransportError { reason } => write!(f, "transport error ({})", reason),
        }
    }
}

/// Trait for probing a URL
#[async_trait]
pub trait Prober: Send + Sync + fmt::Debug {
    /// Probe the URL once. Never fails: errors become `TransportError`.
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Prober issuing a single GET through an [`HttpClient`], bounded by a timeout
pub struct HttpProber {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl fmt::Debug for HttpProber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpProber")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpProber {
    pub fn new(http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let outcome = match tokio::time::timeout(self.timeout, self.http.get(url)).await {
            Ok(Ok(response)) => ProbeOutcome::from_status(response.status),
            Ok(Err(e)) => ProbeOutcome::TransportError {
                reason: e.to_string(),
            },
            Err(_) => ProbeOutcome::TransportError {
                reason: format!("timed out after {:?}", self.timeout),
            },
        };

        tracing::debug!("Probe {} -> {}", url, outcome);
        outcome
    }
}
