//! Contract Test: Orchestrator Cycles
//!
//! Constraints verified:
//! - A failed IP lookup skips the whole cycle and keeps the cached IP
//! - One failing domain does not stop the others in the same cycle
//! - The observed IP is cached even when some domains failed
//! - Shutdown stops the loop between cycles, never mid-cycle

mod common;

use common::*;
use dyndns_core::reconciler::Outcome;
use dyndns_core::{CycleReport, Error, SyncEvent, SyncOrchestrator};
use std::time::Duration;

#[tokio::test]
async fn ip_discovery_failure_skips_cycle() {
    let provider = two_zone_provider().await;
    let ip_source = ScriptedIpSource::new([Some(ip(203, 0, 113, 5)), None, Some(ip(203, 0, 113, 5))]);

    let (mut orchestrator, _events) = SyncOrchestrator::new(
        Box::new(ip_source),
        Box::new(provider.clone()),
        minimal_config(&["home.example.com"]),
    )
    .expect("orchestrator construction succeeds");

    orchestrator.run_cycle().await;
    let calls = provider.total_calls();

    let report = orchestrator.run_cycle().await;
    assert!(matches!(
        report,
        CycleReport::IpDiscoveryFailed {
            error: Error::IpDiscovery(_)
        }
    ));
    assert_eq!(provider.total_calls(), calls, "No provider call on discovery failure");
    assert_eq!(orchestrator.last_known_ip(), Some(ip(203, 0, 113, 5)), "Cached IP retained");

    // Same IP as before the failure: still unchanged
    let report = orchestrator.run_cycle().await;
    assert!(matches!(report, CycleReport::IpUnchanged { .. }));
}

#[tokio::test]
async fn failing_domain_does_not_block_others() {
    // example.org has no hosted zone; example.net listing fails outright
    let provider = two_zone_provider().await;
    let failing = PartiallyFailingProvider::new(provider.clone(), &["Z2"]);

    let (mut orchestrator, mut events) = SyncOrchestrator::new(
        Box::new(ScriptedIpSource::fixed(ip(203, 0, 113, 5))),
        Box::new(failing),
        minimal_config(&["a.example.org", "b.example.net", "c.example.com"]),
    )
    .expect("orchestrator construction succeeds");

    let report = orchestrator.run_cycle().await;

    let CycleReport::Reconciled { results, .. } = report else {
        panic!("expected a reconciled cycle");
    };
    let domains: Vec<_> = results.iter().map(|r| r.domain.as_str()).collect();
    assert_eq!(domains, ["a.example.org", "b.example.net", "c.example.com"]);

    assert!(matches!(
        results[0].result.as_ref().unwrap(),
        Outcome::ZoneNotFound { .. }
    ));
    assert!(matches!(
        results[1].result,
        Err(Error::ProviderUnavailable { .. })
    ));
    assert_eq!(results[2].result.as_ref().unwrap(), &Outcome::RecordAbsentCreated);
    assert!(provider.address_record_set("Z1", "c.example.com.").await.is_some());

    assert_eq!(
        orchestrator.last_known_ip(),
        Some(ip(203, 0, 113, 5)),
        "Cache reflects the last observed IP, not the last fully applied one"
    );

    let mut failed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SyncEvent::RecordFailed { domain, .. } = event {
            failed.push(domain);
        }
    }
    assert_eq!(failed, ["b.example.net"]);
}

#[tokio::test]
async fn ip_change_reconciles_again() {
    let provider = two_zone_provider().await;
    let ip_source = ScriptedIpSource::new([Some(ip(203, 0, 113, 5)), Some(ip(203, 0, 113, 9))]);

    let (mut orchestrator, _events) = SyncOrchestrator::new(
        Box::new(ip_source),
        Box::new(provider.clone()),
        minimal_config(&["home.example.com"]),
    )
    .expect("orchestrator construction succeeds");

    orchestrator.run_cycle().await;
    let report = orchestrator.run_cycle().await;

    let CycleReport::Reconciled { ip: observed, results } = report else {
        panic!("changed IP must reconcile");
    };
    assert_eq!(observed, ip(203, 0, 113, 9));
    assert_eq!(results[0].result.as_ref().unwrap(), &Outcome::Updated);
    assert_eq!(provider.apply_change_calls(), 2);

    let rrs = provider.address_record_set("Z1", "home.example.com.").await.unwrap();
    assert_eq!(rrs.values, vec!["203.0.113.9".to_string()]);
}

#[tokio::test]
async fn shutdown_stops_loop_between_cycles() {
    let provider = two_zone_provider().await;
    let ip_source = ScriptedIpSource::fixed(ip(203, 0, 113, 5));

    let (orchestrator, mut events) = SyncOrchestrator::new(
        Box::new(ip_source.clone()),
        Box::new(provider.clone()),
        minimal_config(&["home.example.com"]),
    )
    .expect("orchestrator construction succeeds");
    let mut orchestrator = orchestrator.with_interval(Duration::from_millis(20));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move {
        orchestrator.run_with_shutdown(Some(shutdown_rx)).await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("orchestrator stops promptly")
        .unwrap()
        .unwrap();

    assert!(ip_source.call_count() >= 2, "Loop kept polling until shutdown");
    assert_eq!(provider.apply_change_calls(), 1, "Only the first cycle wrote");

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    assert_eq!(
        last,
        Some(SyncEvent::Stopped {
            reason: "Shutdown signal".to_string()
        })
    );
}
