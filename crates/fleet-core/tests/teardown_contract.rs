//! Contract Test: Teardown
//!
//! Constraints verified:
//! - Teardown is exactly one delete-by-tag call
//! - Teardown never lists instances or touches DNS
//! - Dry-run teardown deletes nothing

mod common;

use common::*;
use fleet_core::report::{Outcome, Stage};
use fleet_core::FleetEngine;

#[tokio::test]
async fn teardown_is_a_single_delete_by_tag() {
    let compute = MockCompute::with_instances(vec![
        running("alice", "192.0.2.1"),
        running("bob", "192.0.2.2"),
    ]);
    let dns = MockDns::new();

    let engine = FleetEngine::new(
        Box::new(compute.clone()),
        Box::new(dns.clone()),
        Box::new(StubRenderer::default()),
        test_config(),
        false,
    )
    .expect("engine construction succeeds");

    let report = engine.teardown().await;

    assert_eq!(compute.delete_call_count(), 1);
    assert_eq!(compute.list_call_count(), 0);
    assert_eq!(dns.list_call_count(), 0);
    assert_eq!(dns.mutating_call_count(), 0);
    assert!(compute.instance_names().is_empty());

    assert_eq!(report.units.len(), 1);
    assert_eq!(report.units[0].stage, Stage::Teardown);
    assert_eq!(report.units[0].subject, TAG);
    assert!(matches!(report.units[0].outcome, Outcome::Success(_)));
}

#[tokio::test]
async fn dry_run_teardown_deletes_nothing() {
    let compute = MockCompute::with_instances(vec![running("alice", "192.0.2.1")]);

    let engine = FleetEngine::new(
        Box::new(compute.clone()),
        Box::new(MockDns::new()),
        Box::new(StubRenderer::default()),
        test_config(),
        true,
    )
    .expect("engine construction succeeds");

    let report = engine.teardown().await;

    assert_eq!(compute.delete_call_count(), 0);
    assert_eq!(compute.list_call_count(), 0);
    assert_eq!(compute.instance_names().len(), 1);
    assert!(matches!(report.units[0].outcome, Outcome::Skipped(_)));
}
