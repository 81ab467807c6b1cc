//! Test doubles and common utilities for contract tests
//!
//! The in-memory provider from the library covers most needs; this module
//! adds scripted IP sources and a provider wrapper that fails for selected
//! zones.

#![allow(dead_code)]

use dyndns_core::config::{OrchestratorConfig, ProviderConfig, SyncConfig};
use dyndns_core::error::{Error, Result};
use dyndns_core::provider::MemoryDnsProvider;
use dyndns_core::traits::{ChangeInfo, ChangeRequest, DnsProvider, IpSource, ResourceRecordSet, Zone};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An IpSource that replays a script of answers
///
/// `None` entries simulate discovery failures. Once the script is exhausted
/// the last answer is repeated.
#[derive(Clone)]
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<Option<IpAddr>>>>,
    last: Arc<Mutex<Option<IpAddr>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(script: impl IntoIterator<Item = Option<IpAddr>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answer with `ip`
    pub fn fixed(ip: IpAddr) -> Self {
        Self::new([Some(ip)])
    }

    /// Number of times current() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        let answer = match next {
            Some(answer) => {
                *self.last.lock().unwrap() = answer;
                answer
            }
            None => *self.last.lock().unwrap(),
        };

        answer.ok_or_else(|| Error::ip_discovery("checkip endpoint unreachable"))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// Wraps a MemoryDnsProvider and fails record listing for selected zones
#[derive(Clone)]
pub struct PartiallyFailingProvider {
    inner: MemoryDnsProvider,
    failing_zone_ids: Vec<String>,
}

impl PartiallyFailingProvider {
    pub fn new(inner: MemoryDnsProvider, failing_zone_ids: &[&str]) -> Self {
        Self {
            inner,
            failing_zone_ids: failing_zone_ids.iter().map(|id| id.to_string()).collect(),
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for PartiallyFailingProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        self.inner.list_zones().await
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecordSet>> {
        if self.failing_zone_ids.iter().any(|id| id == zone_id) {
            return Err(Error::provider_unavailable("partial", "connection reset"));
        }
        self.inner.list_record_sets(zone_id).await
    }

    async fn apply_change(&self, zone_id: &str, change: &ChangeRequest) -> Result<ChangeInfo> {
        self.inner.apply_change(zone_id, change).await
    }

    fn provider_name(&self) -> &'static str {
        "partial"
    }
}

pub fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::from([a, b, c, d])
}

/// Provider with `example.com.` (Z1) and `example.net.` (Z2), no records
pub async fn two_zone_provider() -> MemoryDnsProvider {
    let provider = MemoryDnsProvider::new();
    provider.add_zone("Z1", "example.com.").await;
    provider.add_zone("Z2", "example.net.").await;
    provider
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config(domains: &[&str]) -> SyncConfig {
    SyncConfig {
        orchestrator: OrchestratorConfig {
            interval_secs: 1,
            event_channel_capacity: 100,
        },
        ..SyncConfig::new(
            domains.iter().map(|d| d.to_string()).collect(),
            ProviderConfig::Custom {
                factory: "memory".to_string(),
                config: serde_json::Value::Null,
            },
        )
    }
}
