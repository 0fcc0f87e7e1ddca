//! Scheduler: periodic sweeps of every stored target

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{SchedulerConfig, MAX_SHUTDOWN_GRACE_SECONDS};
use crate::probe::{ProbeOutcome, Prober};
use crate::store::TargetStore;
use crate::target::Target;
use crate::tracker::{apply_outcome, Transition};

/// Tally of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Targets listed at the start of the sweep
    pub targets: usize,
    pub passed: usize,
    pub failed: usize,
    pub transport_errors: usize,
    /// Probes whose result could not be written back
    pub update_failures: usize,
    /// Targets not probed, or probes aborted, because of shutdown
    pub abandoned: usize,
}

impl SweepReport {
    /// Probes whose outcome was written to the store
    pub fn recorded(&self) -> usize {
        self.passed + self.failed + self.transport_errors
    }

    fn record(&mut self, check: &CheckResult) {
        match check {
            CheckResult::Recorded(outcome) => match outcome {
                ProbeOutcome::Success => self.passed += 1,
                ProbeOutcome::Failure { .. } => self.failed += 1,
                ProbeOutcome::TransportError { .. } => self.transport_errors += 1,
            },
            CheckResult::UpdateFailed => self.update_failures += 1,
        }
    }
}

enum CheckResult {
    Recorded(ProbeOutcome),
    UpdateFailed,
}

/// Drives fixed-rate sweeps over the target store until cancelled
#[derive(Debug)]
pub struct Scheduler {
    store: Arc<dyn TargetStore>,
    prober: Arc<dyn Prober>,
    period: Duration,
    max_concurrent_probes: usize,
    shutdown_grace: Duration,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn TargetStore>,
        prober: Arc<dyn Prober>,
        config: &SchedulerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            prober,
            period: config.period(),
            max_concurrent_probes: config.max_concurrent_probes(),
            shutdown_grace: config.shutdown_grace(),
            cancel,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sweep on every tick until the cancellation token fires.
    ///
    /// Ticks are fixed-rate, start to start, with the first sweep immediately.
    /// A sweep that overruns the period is followed at once by the next one,
    /// after which ticks realign to the first schedule; missed ticks are
    /// never replayed and two sweeps never run at once.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!("Scheduler started with period {:?}", self.period);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Scheduler cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match self.sweep().await {
                Ok(report) => tracing::debug!(
                    "Sweep done: {} targets, {} passed, {} failed, {} transport errors, {} update failures, {} abandoned",
                    report.targets,
                    report.passed,
                    report.failed,
                    report.transport_errors,
                    report.update_failures,
                    report.abandoned
                ),
                Err(e) => tracing::warn!("Skipping sweep, could not list targets: {}", e),
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Probe every stored target once.
    ///
    /// Fails only when the target list cannot be read. Per-target probe and
    /// update problems are counted in the report.
    pub async fn sweep(&self) -> crate::Result<SweepReport> {
        let targets = self.store.list_targets().await?;
        let mut report = SweepReport {
            targets: targets.len(),
            ..SweepReport::default()
        };

        let permits = Arc::new(Semaphore::new(self.max_concurrent_probes));
        let mut tasks = JoinSet::new();
        let mut pending = targets.into_iter();

        while let Some(target) = pending.next() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    report.abandoned += 1 + pending.len();
                    break;
                }
                permit = Arc::clone(&permits).acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                break;
            };

            let store = Arc::clone(&self.store);
            let prober = Arc::clone(&self.prober);
            tasks.spawn(async move {
                let result = check_target(store.as_ref(), prober.as_ref(), target).await;
                drop(permit);
                result
            });
        }

        self.drain(&mut tasks, &mut report).await;
        Ok(report)
    }

    /// Collect every spawned check. After cancellation, in-flight checks get
    /// the shutdown grace period and are aborted once it runs out.
    async fn drain(&self, tasks: &mut JoinSet<CheckResult>, report: &mut SweepReport) {
        let mut deadline: Option<Instant> = None;

        loop {
            let joined = match deadline {
                None => tokio::select! {
                    joined = tasks.join_next() => joined,
                    _ = self.cancel.cancelled() => {
                        if !tasks.is_empty() {
                            tracing::info!(
                                "Waiting up to {:?} for {} in-flight probes",
                                self.shutdown_grace,
                                tasks.len()
                            );
                        }
                        let now = Instant::now();
                        deadline = Some(
                            now.checked_add(self.shutdown_grace)
                                .unwrap_or_else(|| now + Duration::from_secs(MAX_SHUTDOWN_GRACE_SECONDS)),
                        );
                        continue;
                    }
                },
                Some(at) => match tokio::time::timeout_at(at, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        tracing::warn!("Abandoning {} in-flight probes", tasks.len());
                        report.abandoned += tasks.len();
                        tasks.abort_all();
                        while tasks.join_next().await.is_some() {}
                        break;
                    }
                },
            };

            match joined {
                Some(Ok(check)) => report.record(&check),
                Some(Err(e)) => {
                    tracing::warn!("Probe task failed: {}", e);
                    report.abandoned += 1;
                }
                None => break,
            }
        }
    }
}

/// Probe one target, fold the outcome into its record and write it back
async fn check_target(store: &dyn TargetStore, prober: &dyn Prober, target: Target) -> CheckResult {
    let outcome = prober.probe(&target.url).await;
    if let ProbeOutcome::TransportError { reason } = &outcome {
        tracing::warn!("Probe of '{}' ({}) failed: {}", target.name, target.url, reason);
    }

    let updated = apply_outcome(&target, &outcome, Utc::now());
    if let Err(e) = store.update_target(&updated).await {
        tracing::warn!("Failed to record probe of '{}': {}", target.name, e);
        return CheckResult::UpdateFailed;
    }

    let transition = Transition::between(&target, &updated);
    if transition.went_down() {
        tracing::warn!("Target '{}' ({}) went down: {}", updated.name, updated.url, outcome);
    } else if transition.recovered() {
        tracing::info!("Target '{}' ({}) recovered", updated.name, updated.url);
    } else if transition.changed() {
        tracing::info!(
            "Target '{}' is now {} (was {})",
            updated.name,
            transition.current,
            transition.previous
        );
    }
    CheckResult::Recorded(outcome)
}
