//! Status tracker: pure transition logic from probe outcomes to target records
//!
//! Nothing in here touches the network or storage. The scheduler feeds each
//! probe outcome through [`apply_outcome`] and persists the returned record.

use chrono::{DateTime, Utc};

use crate::probe::ProbeOutcome;
use crate::target::{Target, TargetStatus};

/// Status after a probe, given the status before it.
///
/// | previous  | success | failure / transport error |
/// |-----------|---------|---------------------------|
/// | unknown   | healthy | unhealthy                 |
/// | healthy   | healthy | unhealthy                 |
/// | unhealthy | healthy | unhealthy                 |
///
/// Only the latest outcome decides the new status.
pub fn next_status(previous: TargetStatus, outcome: &ProbeOutcome) -> TargetStatus {
    match (previous, outcome) {
        (_, ProbeOutcome::Success) => TargetStatus::Healthy,
        (_, ProbeOutcome::Failure { .. } | ProbeOutcome::TransportError { .. }) => {
            TargetStatus::Unhealthy
        }
    }
}

/// Apply one probe outcome to a target record.
///
/// Every call counts one check and stamps `last_checked_at`, whether or not
/// the status changes. `passed_checks` only moves on success, so it can never
/// overtake `total_checks`.
pub fn apply_outcome(target: &Target, outcome: &ProbeOutcome, now: DateTime<Utc>) -> Target {
    let passed = u64::from(outcome.is_success());
    let total_checks = target.total_checks.saturating_add(1);
    let passed_checks = target.passed_checks.saturating_add(passed).min(total_checks);

    Target {
        status: next_status(target.status, outcome),
        total_checks,
        passed_checks,
        last_checked_at: Some(now),
        ..target.clone()
    }
}

/// A status change (or non-change) produced by one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: TargetStatus,
    pub current: TargetStatus,
}

impl Transition {
    pub fn between(before: &Target, after: &Target) -> Self {
        Self {
            previous: before.status,
            current: after.status,
        }
    }

    pub fn changed(&self) -> bool {
        self.previous != self.current
    }

    /// Unhealthy after being healthy or never checked
    pub fn went_down(&self) -> bool {
        self.changed() && self.current == TargetStatus::Unhealthy
    }

    /// Healthy after being unhealthy
    pub fn recovered(&self) -> bool {
        self.previous == TargetStatus::Unhealthy && self.current == TargetStatus::Healthy
    }
}
