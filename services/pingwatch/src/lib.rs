//! Pingwatch - URL health-check monitor
//!
//! Keeps a list of target URLs, probes each one with an HTTP GET on a fixed
//! period, and records health status and check counters. A small REST API
//! registers targets and reports their current status.

pub mod api;
pub mod config;
pub mod error;
pub mod io;
pub mod probe;
pub mod scheduler;
pub mod store;
pub mod target;
pub mod tracker;

pub use config::{load_config, Config};
pub use error::{PingwatchError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::io::{HttpClient, ReqwestHttpClient};
use crate::probe::HttpProber;
use crate::scheduler::Scheduler;
use crate::store::{MemoryStore, SqliteStore, TargetStore};

/// Assembles a [`Pingwatch`] service, allowing collaborators to be injected
pub struct PingwatchBuilder {
    config: Config,
    store: Option<Arc<dyn TargetStore>>,
    http: Option<Arc<dyn HttpClient>>,
    cancel: Option<CancellationToken>,
}

impl PingwatchBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            http: None,
            cancel: None,
        }
    }

    /// Use this store instead of the one described by the storage config
    pub fn with_store(mut self, store: Arc<dyn TargetStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this HTTP client for probing instead of reqwest
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Open the store and construct the scheduler. Failing to open the
    /// store is the one fatal error.
    pub async fn build(self) -> Result<Pingwatch> {
        let store: Arc<dyn TargetStore> = match self.store {
            Some(store) => store,
            None => match &self.config.storage.path {
                Some(path) => Arc::new(SqliteStore::open(path)?),
                None => {
                    tracing::warn!("No storage path configured; targets are kept in memory");
                    Arc::new(MemoryStore::new())
                }
            },
        };

        let probe_timeout = self.config.scheduler.probe_timeout();
        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::with_timeout(probe_timeout)?),
        };
        let prober = Arc::new(HttpProber::new(http, probe_timeout));
        tracing::debug!("Probing with a {:?} timeout", prober.timeout());

        let cancel = self.cancel.unwrap_or_else(CancellationToken::new);
        let scheduler = Scheduler::new(
            Arc::clone(&store),
            prober,
            &self.config.scheduler,
            cancel.clone(),
        );

        tracing::debug!(
            "Built pingwatch: period={:?}, max_concurrent_probes={}",
            scheduler.period(),
            self.config.scheduler.max_concurrent_probes()
        );

        Ok(Pingwatch {
            config: self.config,
            store,
            scheduler,
            cancel,
        })
    }
}

/// A fully wired service, ready to start
#[derive(Debug)]
pub struct Pingwatch {
    config: Config,
    store: Arc<dyn TargetStore>,
    scheduler: Scheduler,
    cancel: CancellationToken,
}

impl Pingwatch {
    pub fn store(&self) -> Arc<dyn TargetStore> {
        Arc::clone(&self.store)
    }

    /// Serve the API and run the scheduler until cancelled (Ctrl-C or the
    /// injected token)
    pub async fn start(self) -> Result<()> {
        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                Err(e) => tracing::warn!("Failed to listen for ctrl-c: {}", e),
            }
        });

        let api_task = if self.config.api.enabled {
            let api_port = self.config.api.port;
            let api_store = Arc::clone(&self.store);
            let cancel_for_api = self.cancel.clone();

            Some(tokio::spawn(async move {
                let router = api::build_router(api_store);
                let addr = SocketAddr::from(([0, 0, 0, 0], api_port));

                let listener = match tokio::net::TcpListener::bind(addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        tracing::error!(
                            "Failed to bind API to port {}: {}. Continuing without API.",
                            api_port,
                            e
                        );
                        return;
                    }
                };
                tracing::info!("API listening on http://{}", addr);

                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        cancel_for_api.cancelled().await;
                    })
                    .await
                    .ok();

                tracing::debug!("API stopped");
            }))
        } else {
            None
        };

        tracing::info!("Pingwatch started");

        // Blocks until cancelled
        self.scheduler.run().await;

        if let Some(api_task) = api_task {
            api_task
                .await
                .map_err(|e| PingwatchError::Api(format!("API task failed: {}", e)))?;
        }

        tracing::info!("Pingwatch stopped");
        Ok(())
    }
}
