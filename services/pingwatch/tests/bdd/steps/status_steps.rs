//! BDD step definitions for status tracking feature

use chrono::{TimeZone, Utc};
use cucumber::{given, then, when};

use pingwatch::probe::ProbeOutcome;
use pingwatch::target::{NewTarget, Target, TargetStatus};
use pingwatch::tracker::apply_outcome;

use crate::world::PingwatchWorld;

fn parse_status(s: &str) -> TargetStatus {
    s.parse()
        .unwrap_or_else(|_| panic!("Unknown status: {}", s))
}

fn parse_outcome(s: &str) -> ProbeOutcome {
    match s {
        "success" => ProbeOutcome::Success,
        "failure" => ProbeOutcome::Failure { status: 500 },
        "transport error" => ProbeOutcome::TransportError {
            reason: "connection refused".to_string(),
        },
        other => panic!("Unknown outcome: {}", other),
    }
}

#[given(expr = "a target with status {string} and {int} total checks and {int} passed checks")]
fn target_with_counters(world: &mut PingwatchWorld, status: String, total: u64, passed: u64) {
    let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut target = Target::registered(1, NewTarget::new("web", "http://web.test"), created_at);
    target.status = parse_status(&status);
    target.total_checks = total;
    target.passed_checks = passed;
    world.target = Some(target);
}

#[when(expr = "a {string} probe outcome is applied")]
fn outcome_applied(world: &mut PingwatchWorld, outcome: String) {
    apply_n(world, &outcome, 1);
}

#[when(expr = "a {string} probe outcome is applied {int} times")]
fn outcome_applied_n(world: &mut PingwatchWorld, outcome: String, times: u32) {
    apply_n(world, &outcome, times);
}

fn apply_n(world: &mut PingwatchWorld, outcome: &str, times: u32) {
    let outcome = parse_outcome(outcome);
    let mut target = world.target.take().expect("target not set");
    for _ in 0..times {
        target = apply_outcome(&target, &outcome, Utc::now());
    }
    world.target = Some(target);
}

#[then(expr = "the target status should be {string}")]
fn target_status_should_be(world: &mut PingwatchWorld, expected: String) {
    let target = world.target.as_ref().expect("target not set");
    assert_eq!(target.status, parse_status(&expected));
}

#[then(expr = "the target should have {int} total checks and {int} passed checks")]
fn target_counters_should_be(world: &mut PingwatchWorld, total: u64, passed: u64) {
    let target = world.target.as_ref().expect("target not set");
    assert_eq!(target.total_checks, total, "total checks");
    assert_eq!(target.passed_checks, passed, "passed checks");
}

#[then("the target should have a last checked time")]
fn target_has_last_checked(world: &mut PingwatchWorld) {
    let target = world.target.as_ref().expect("target not set");
    assert!(target.last_checked_at.is_some());
}
