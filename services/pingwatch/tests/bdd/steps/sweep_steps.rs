//! BDD step definitions for sweep feature

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use cucumber::{given, then, when};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use pingwatch::config::SchedulerConfig;
use pingwatch::io::{HttpClient, HttpResponse};
use pingwatch::probe::HttpProber;
use pingwatch::scheduler::Scheduler;
use pingwatch::store::TargetStore;
use pingwatch::target::{NewTarget, Target};
use pingwatch::PingwatchError;

use crate::world::PingwatchWorld;

// --- Test doubles ---

/// A scripted reply for one GET
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16),
    Unreachable,
}

/// An HTTP client that replays scripted replies per URL and records every
/// request. The last scripted reply for a URL repeats; unscripted URLs get 200.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    replies: RwLock<HashMap<String, VecDeque<Reply>>>,
    pub requests: RwLock<Vec<String>>,
}

impl ScriptedHttpClient {
    pub async fn script(&self, url: &str, replies: Vec<Reply>) {
        self.replies
            .write()
            .await
            .insert(url.to_string(), replies.into());
    }

    async fn next_reply(&self, url: &str) -> Reply {
        let mut replies = self.replies.write().await;
        match replies.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Reply::Status(200)),
            Some(queue) => queue.front().copied().unwrap_or(Reply::Status(200)),
            None => Reply::Status(200),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn get(&self, url: &str) -> pingwatch::Result<HttpResponse> {
        self.requests.write().await.push(url.to_string());
        match self.next_reply(url).await {
            Reply::Status(status) => Ok(HttpResponse { status }),
            Reply::Unreachable => Err(PingwatchError::Http(format!(
                "GET {} failed: connection refused",
                url
            ))),
        }
    }
}

/// A store whose every operation fails
#[derive(Debug)]
struct UnavailableStore;

#[async_trait]
impl TargetStore for UnavailableStore {
    async fn list_targets(&self) -> pingwatch::Result<Vec<Target>> {
        Err(PingwatchError::Storage("database is locked".to_string()))
    }

    async fn insert_target(&self, _new: NewTarget) -> pingwatch::Result<Target> {
        Err(PingwatchError::Storage("database is locked".to_string()))
    }

    async fn update_target(&self, _target: &Target) -> pingwatch::Result<()> {
        Err(PingwatchError::Storage("database is locked".to_string()))
    }
}

fn parse_replies(script: &str) -> Vec<Reply> {
    script.split(',')
        .map(str::trim)
        .map(|s| match s {
            "unreachable" => Reply::Unreachable,
            code => Reply::Status(
                code.parse()
                    .unwrap_or_else(|_| panic!("Unknown reply: {}", code)),
            ),
        })
        .collect()
}

// --- Given steps ---

#[given(expr = "a registered target {string} with url {string}")]
async fn registered_target(world: &mut PingwatchWorld, name: String, url: String) {
    world
        .store()
        .insert_target(NewTarget::new(name, url))
        .await
        .expect("failed to register target");
}

#[given(expr = "probes of {string} answer with {string}")]
async fn probes_answer_with(world: &mut PingwatchWorld, url: String, replies: String) {
    world.http().script(&url, parse_replies(&replies)).await;
}

#[given("the target store is unavailable")]
fn store_unavailable(world: &mut PingwatchWorld) {
    world.store = Some(Arc::new(UnavailableStore));
}

// --- When steps ---

#[when("a sweep runs")]
async fn sweep_runs(world: &mut PingwatchWorld) {
    run_sweeps(world, 1).await;
}

#[when(expr = "{int} sweeps run")]
async fn sweeps_run(world: &mut PingwatchWorld, count: u32) {
    run_sweeps(world, count).await;
}

async fn run_sweeps(world: &mut PingwatchWorld, count: u32) {
    let config = SchedulerConfig::default();
    let prober = Arc::new(HttpProber::new(world.http(), config.probe_timeout()));
    let scheduler = Scheduler::new(world.store(), prober, &config, CancellationToken::new());
    for _ in 0..count {
        world.sweep_result = Some(scheduler.sweep().await);
    }
}

// --- Then steps ---

#[then(expr = "the sweep should report {int} passed and {int} failed and {int} transport errors")]
fn sweep_report_should_be(
    world: &mut PingwatchWorld,
    passed: usize,
    failed: usize,
    transport_errors: usize,
) {
    let report = match world.sweep_result.as_ref().expect("no sweep ran") {
        Ok(report) => report,
        Err(e) => panic!("Expected sweep to succeed, got {}", e),
    };
    assert_eq!(report.passed, passed, "passed");
    assert_eq!(report.failed, failed, "failed");
    assert_eq!(report.transport_errors, transport_errors, "transport errors");
}

#[then("the sweep should fail with a storage error")]
fn sweep_should_fail(world: &mut PingwatchWorld) {
    match world.sweep_result.as_ref().expect("no sweep ran") {
        Err(PingwatchError::Storage(_)) => {}
        other => panic!("Expected storage error, got {:?}", other),
    }
}

#[then(expr = "target {string} should be {string} with {int} total checks and {int} passed checks")]
async fn stored_target_should_be(
    world: &mut PingwatchWorld,
    name: String,
    status: String,
    total: u64,
    passed: u64,
) {
    let target = world.stored_target(&name).await;
    assert_eq!(target.status.as_str(), status, "status of {}", name);
    assert_eq!(target.total_checks, total, "total checks of {}", name);
    assert_eq!(target.passed_checks, passed, "passed checks of {}", name);
    assert!(target.last_checked_at.is_some());
}

#[then(expr = "{string} should have been requested {int} times")]
async fn url_requested_times(world: &mut PingwatchWorld, url: String, times: usize) {
    let requests = world.http().requests.read().await.clone();
    let count = requests.iter().filter(|r| **r == url).count();
    assert_eq!(count, times, "requests: {:?}", requests);
}
