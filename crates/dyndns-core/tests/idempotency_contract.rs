//! Contract Test: Idempotency
//!
//! Constraints verified:
//! - Reconciling the same name with the same IP twice writes at most once
//! - An unchanged WAN IP makes zero provider calls for every domain
//! - After a restart the first cycle re-checks, but finds nothing to write

mod common;

use common::*;
use dyndns_core::reconciler::{Outcome, RecordReconciler};
use dyndns_core::traits::ResourceRecordSet;
use dyndns_core::{CycleReport, SyncOrchestrator};

#[tokio::test]
async fn repeated_synchronize_writes_once() {
    let provider = two_zone_provider().await;
    let reconciler = RecordReconciler::default();

    let first = reconciler
        .synchronize("home.example.com", "203.0.113.5", &provider)
        .await
        .expect("first synchronize succeeds");
    let second = reconciler
        .synchronize("home.example.com", "203.0.113.5", &provider)
        .await
        .expect("second synchronize succeeds");

    assert_eq!(first, Outcome::RecordAbsentCreated);
    assert_eq!(second, Outcome::NoChangeNeeded);
    assert_eq!(provider.apply_change_calls(), 1, "Expected exactly one write");
}

#[tokio::test]
async fn unchanged_ip_makes_no_provider_calls() {
    let provider = two_zone_provider().await;
    let ip_source = ScriptedIpSource::fixed(ip(203, 0, 113, 5));

    let (mut orchestrator, _events) = SyncOrchestrator::new(
        Box::new(ip_source.clone()),
        Box::new(provider.clone()),
        minimal_config(&["home.example.com", "www.example.net"]),
    )
    .expect("orchestrator construction succeeds");

    orchestrator.run_cycle().await;
    let calls_after_first_cycle = provider.total_calls();
    assert!(calls_after_first_cycle > 0);

    let report = orchestrator.run_cycle().await;

    assert!(matches!(report, CycleReport::IpUnchanged { .. }));
    assert_eq!(
        provider.total_calls(),
        calls_after_first_cycle,
        "Second cycle with the same IP must not touch the provider"
    );
    assert_eq!(ip_source.call_count(), 2, "The IP is still checked every cycle");
}

#[tokio::test]
async fn restart_rechecks_but_does_not_rewrite() {
    let provider = two_zone_provider().await;
    provider
        .put_record_set(
            "Z1",
            ResourceRecordSet::a("home.example.com.", 300, vec!["203.0.113.5".to_string()]),
        )
        .await;

    // A fresh orchestrator has no cached IP, as after a process restart
    let (mut orchestrator, _events) = SyncOrchestrator::new(
        Box::new(ScriptedIpSource::fixed(ip(203, 0, 113, 5))),
        Box::new(provider.clone()),
        minimal_config(&["home.example.com"]),
    )
    .expect("orchestrator construction succeeds");

    let report = orchestrator.run_cycle().await;

    let CycleReport::Reconciled { results, .. } = report else {
        panic!("first cycle after restart must reconcile");
    };
    assert_eq!(results[0].result.as_ref().unwrap(), &Outcome::NoChangeNeeded);
    assert_eq!(provider.list_zones_calls(), 1);
    assert_eq!(provider.apply_change_calls(), 0);
}
