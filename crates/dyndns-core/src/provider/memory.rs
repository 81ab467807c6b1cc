// # Memory DNS Provider
//
// In-memory implementation of DnsProvider.
//
// ## Purpose
//
// Holds hosted zones and their record sets in ordinary maps so that the
// reconciler and orchestrator can be exercised without any network access.
// Every operation is counted, and the provider can be switched offline or
// into a throttled state to simulate provider failures.
//
// ## Sharing
//
// Clones share the same zones, records and counters. Hand one clone to the
// code under test and keep another to inspect what happened.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::traits::dns_provider::{
    ChangeInfo, ChangeRequest, ChangeStatus, DnsProvider, ResourceRecordSet, Zone,
};
use crate::Error;

const PROVIDER_NAME: &str = "memory";

#[derive(Debug, Default)]
struct Inner {
    /// Zones in listing order
    zones: Vec<Zone>,
    /// Record sets per zone id
    records: HashMap<String, Vec<ResourceRecordSet>>,
    /// Every change applied so far
    changes: Vec<ChangeRequest>,
}

#[derive(Debug, Default)]
struct Counters {
    list_zones: AtomicUsize,
    list_record_sets: AtomicUsize,
    apply_change: AtomicUsize,
}

/// In-memory DNS provider
///
/// # Example
///
/// ```rust
/// use dyndns_core::provider::MemoryDnsProvider;
/// use dyndns_core::traits::{DnsProvider, ResourceRecordSet};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let provider = MemoryDnsProvider::new();
///     provider.add_zone("Z1", "example.com.").await;
///     provider
///         .put_record_set("Z1", ResourceRecordSet::a("home.example.com.", 300, vec!["203.0.113.1".into()]))
///         .await;
///
///     let zones = provider.list_zones().await?;
///     assert_eq!(zones[0].name, "example.com.");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDnsProvider {
    inner: Arc<RwLock<Inner>>,
    counters: Arc<Counters>,
    offline: Arc<AtomicBool>,
    throttled: Arc<AtomicBool>,
}

impl MemoryDnsProvider {
    /// Create a provider with no zones
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hosted zone
    pub async fn add_zone(&self, id: impl Into<String>, name: impl Into<String>) {
        let zone = Zone::new(id, name);
        let mut guard = self.inner.write().await;
        guard.records.entry(zone.id.clone()).or_default();
        guard.zones.push(zone);
    }

    /// Insert or replace a record set (matched on name and type)
    ///
    /// Does not count as a change.
    pub async fn put_record_set(&self, zone_id: &str, record_set: ResourceRecordSet) {
        let mut guard = self.inner.write().await;
        upsert(guard.records.entry(zone_id.to_string()).or_default(), record_set);
    }

    /// Look up the address record set for an exact name
    pub async fn address_record_set(&self, zone_id: &str, name: &str) -> Option<ResourceRecordSet> {
        let guard = self.inner.read().await;
        guard
            .records
            .get(zone_id)?
            .iter()
            .find(|rrs| rrs.is_address_record_for(name))
            .cloned()
    }

    /// All changes applied so far, in order
    pub async fn changes(&self) -> Vec<ChangeRequest> {
        self.inner.read().await.changes.clone()
    }

    /// Make every operation fail with `ProviderUnavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make `apply_change` fail with `RateLimited`
    pub fn set_throttled(&self, throttled: bool) {
        self.throttled.store(throttled, Ordering::SeqCst);
    }

    /// Number of `list_zones` calls
    pub fn list_zones_calls(&self) -> usize {
        self.counters.list_zones.load(Ordering::SeqCst)
    }

    /// Number of `list_record_sets` calls
    pub fn list_record_sets_calls(&self) -> usize {
        self.counters.list_record_sets.load(Ordering::SeqCst)
    }

    /// Number of `apply_change` calls, including rejected ones
    pub fn apply_change_calls(&self) -> usize {
        self.counters.apply_change.load(Ordering::SeqCst)
    }

    /// Total number of provider calls
    pub fn total_calls(&self) -> usize {
        self.list_zones_calls() + self.list_record_sets_calls() + self.apply_change_calls()
    }

    fn check_online(&self) -> Result<(), Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::provider_unavailable(PROVIDER_NAME, "provider is offline"));
        }
        Ok(())
    }
}

fn upsert(sets: &mut Vec<ResourceRecordSet>, record_set: ResourceRecordSet) {
    match sets
        .iter_mut()
        .find(|rrs| rrs.name == record_set.name && rrs.record_type == record_set.record_type)
    {
        Some(existing) => *existing = record_set,
        None => sets.push(record_set),
    }
}

#[async_trait]
impl DnsProvider for MemoryDnsProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>, Error> {
        self.counters.list_zones.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        Ok(self.inner.read().await.zones.clone())
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecordSet>, Error> {
        self.counters.list_record_sets.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let guard = self.inner.read().await;
        guard
            .records
            .get(zone_id)
            .cloned()
            .ok_or_else(|| Error::zone_not_found(zone_id))
    }

    async fn apply_change(
        &self,
        zone_id: &str,
        change: &ChangeRequest,
    ) -> Result<ChangeInfo, Error> {
        self.counters.apply_change.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        if self.throttled.load(Ordering::SeqCst) {
            return Err(Error::rate_limited(PROVIDER_NAME, "too many changes"));
        }

        if change.zone_id != zone_id {
            return Err(Error::invalid_change(
                PROVIDER_NAME,
                format!("change targets zone {} but was sent to {}", change.zone_id, zone_id),
            ));
        }

        let record_set = &change.record_set;
        if record_set.values.is_empty() || record_set.values.iter().any(|v| v.is_empty()) {
            return Err(Error::invalid_change(
                PROVIDER_NAME,
                format!("record set {} has empty values", record_set.name),
            ));
        }

        let mut guard = self.inner.write().await;
        let sets = guard.records.get_mut(zone_id).ok_or_else(|| {
            Error::invalid_change(PROVIDER_NAME, format!("no such hosted zone: {}", zone_id))
        })?;
        upsert(sets, record_set.clone());
        guard.changes.push(change.clone());

        Ok(ChangeInfo {
            id: format!("C{}", guard.changes.len()),
            status: ChangeStatus::Insync,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
