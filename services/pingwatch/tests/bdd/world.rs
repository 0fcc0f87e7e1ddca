//! BDD test world for pingwatch service

use std::sync::Arc;

use cucumber::World;
use pingwatch::config::Config;
use pingwatch::scheduler::SweepReport;
use pingwatch::store::{MemoryStore, TargetStore};
use pingwatch::target::Target;
use tokio_util::sync::CancellationToken;

use crate::steps::sweep_steps::ScriptedHttpClient;

#[derive(Debug, Default, World)]
pub struct PingwatchWorld {
    // Status tracking
    pub target: Option<Target>,

    // Shared by sweep, api and lifecycle steps
    pub store: Option<Arc<dyn TargetStore>>,
    pub http: Option<Arc<ScriptedHttpClient>>,

    // Sweeps
    pub sweep_result: Option<pingwatch::Result<SweepReport>>,

    // API
    pub response_status: Option<u16>,
    pub response_body: Option<serde_json::Value>,
    pub listed: Option<Vec<Target>>,

    // Lifecycle
    pub config: Option<Config>,
    pub cancel: Option<CancellationToken>,
    pub build_succeeded: Option<bool>,
    pub start_succeeded: Option<bool>,
    pub tempdir: Option<tempfile::TempDir>,
}

impl PingwatchWorld {
    /// The store for this scenario, created empty on first use
    pub fn store(&mut self) -> Arc<dyn TargetStore> {
        self.store
            .get_or_insert_with(|| Arc::new(MemoryStore::new()))
            .clone()
    }

    /// The scripted HTTP client for this scenario, created on first use
    pub fn http(&mut self) -> Arc<ScriptedHttpClient> {
        self.http
            .get_or_insert_with(|| Arc::new(ScriptedHttpClient::default()))
            .clone()
    }

    /// Look up a stored target by name
    pub async fn stored_target(&mut self, name: &str) -> Target {
        self.store()
            .list_targets()
            .await
            .expect("failed to list targets")
            .into_iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| panic!("no target named {}", name))
    }
}
