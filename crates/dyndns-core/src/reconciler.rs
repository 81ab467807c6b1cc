//! Record reconciliation
//!
//! [`RecordReconciler::synchronize`] brings the address record of one name in
//! line with a desired IP:
//!
//! ```text
//! record name ──► resolve_zone ──► list_zones ──► zone?
//!                                                  │ no ──► ZoneNotFound
//!                                                  ▼
//!                                  list_record_sets ──► A record set (or a new one)
//!                                                  │
//!                          value already present? ─┼─ yes ──► NoChangeNeeded
//!                                                  ▼
//!                                  apply_change(UPSERT) ──► Updated / RecordAbsentCreated
//! ```
//!
//! Zones are resolved on every call and never cached. Nothing is retried;
//! provider errors are returned unchanged.

use crate::config::{MultiValuePolicy, ReconcilerConfig};
use crate::error::Result;
use crate::traits::{ChangeRequest, DnsProvider, ResourceRecordSet, DEFAULT_TTL};
use crate::zone::{normalize_name, resolve_zone};
use std::fmt;
use std::net::Ipv4Addr;
use tracing::{debug, info, warn};

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The record already holds the desired IP; nothing was written
    NoChangeNeeded,
    /// An existing value was replaced
    Updated,
    /// The record set was missing or empty and now holds the desired IP
    RecordAbsentCreated,
    /// No hosted zone matches the derived zone name; nothing was written
    ZoneNotFound {
        /// The zone name that was looked up
        zone: String,
    },
    /// The inputs were unusable; no provider call was made
    Rejected {
        /// Why the inputs were rejected
        reason: String,
    },
    /// The record set holds several values and the policy forbids touching it
    MultiValueSkipped {
        /// Number of values found
        values: usize,
    },
}

impl Outcome {
    /// Whether a change was submitted to the provider
    pub fn wrote(&self) -> bool {
        matches!(self, Outcome::Updated | Outcome::RecordAbsentCreated)
    }

    /// Whether the outcome should be reported at warning level
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Outcome::ZoneNotFound { .. } | Outcome::Rejected { .. } | Outcome::MultiValueSkipped { .. }
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NoChangeNeeded => write!(f, "no change needed"),
            Outcome::Updated => write!(f, "updated"),
            Outcome::RecordAbsentCreated => write!(f, "created"),
            Outcome::ZoneNotFound { zone } => write!(f, "hosted zone {} not found", zone),
            Outcome::Rejected { reason } => write!(f, "rejected: {}", reason),
            Outcome::MultiValueSkipped { values } => {
                write!(f, "skipped record set with {} values", values)
            }
        }
    }
}

/// Decides whether an address record needs updating and issues the upsert
#[derive(Debug, Clone)]
pub struct RecordReconciler {
    /// TTL for record sets that have to be created
    default_ttl: u32,
    /// Handling of record sets holding more than one value
    multi_value_policy: MultiValuePolicy,
}

impl Default for RecordReconciler {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            multi_value_policy: MultiValuePolicy::default(),
        }
    }
}

impl RecordReconciler {
    /// Create a reconciler from configuration
    pub fn new(config: &ReconcilerConfig) -> Self {
        Self {
            default_ttl: config.default_ttl,
            multi_value_policy: config.multi_value_policy,
        }
    }

    /// Point the address record of `record_name` at `desired_ip`
    ///
    /// # Parameters
    ///
    /// - `record_name`: Record name, with or without the trailing root separator
    /// - `desired_ip`: IPv4 address in dotted-quad form
    /// - `provider`: Provider holding the hosted zone
    ///
    /// # Returns
    ///
    /// - `Ok(Outcome)`: What was decided (and written, if anything)
    /// - `Err(Error)`: A provider call failed; the error is passed through as-is
    pub async fn synchronize(
        &self,
        record_name: &str,
        desired_ip: &str,
        provider: &dyn DnsProvider,
    ) -> Result<Outcome> {
        if record_name.is_empty() {
            return Ok(Outcome::Rejected {
                reason: "record name is empty".to_string(),
            });
        }
        if desired_ip.is_empty() {
            return Ok(Outcome::Rejected {
                reason: "desired IP is empty".to_string(),
            });
        }
        if desired_ip.parse::<Ipv4Addr>().is_err() {
            return Ok(Outcome::Rejected {
                reason: format!("{} is not an IPv4 address", desired_ip),
            });
        }

        let record_name = normalize_name(record_name);
        let zone_name = resolve_zone(&record_name);

        let zones = provider.list_zones().await?;
        let Some(zone) = zones.into_iter().find(|zone| zone.name == zone_name) else {
            // Hosted zones are never created here
            warn!(record = %record_name, zone = %zone_name, "Hosted zone not found");
            return Ok(Outcome::ZoneNotFound { zone: zone_name });
        };
        debug!(zone = %zone.name, zone_id = %zone.id, "Hosted zone found");

        let record_sets = provider.list_record_sets(&zone.id).await?;
        let mut record_set = match record_sets
            .into_iter()
            .find(|rrs| rrs.is_address_record_for(&record_name))
        {
            Some(rrs) => rrs,
            None => {
                warn!(record = %record_name, zone = %zone.name, "Address record set not found");
                ResourceRecordSet::a(record_name.clone(), self.default_ttl, Vec::new())
            }
        };

        if record_set.values.iter().any(|value| value == desired_ip) {
            info!(record = %record_name, ip = %desired_ip, "Address record already set, no update necessary");
            return Ok(Outcome::NoChangeNeeded);
        }

        let outcome = match record_set.values.len() {
            0 => {
                record_set.values.push(desired_ip.to_string());
                Outcome::RecordAbsentCreated
            }
            1 => {
                info!(record = %record_name, from = %record_set.values[0], to = %desired_ip, "WAN IP change detected");
                record_set.values[0] = desired_ip.to_string();
                Outcome::Updated
            }
            count => match self.multi_value_policy {
                MultiValuePolicy::OverwriteFirst => {
                    warn!(record = %record_name, values = count, "Record set holds several values, overwriting the first");
                    record_set.values[0] = desired_ip.to_string();
                    Outcome::Updated
                }
                MultiValuePolicy::ReplaceAll => {
                    warn!(record = %record_name, values = count, "Record set holds several values, replacing all of them");
                    record_set.values = vec![desired_ip.to_string()];
                    Outcome::Updated
                }
                MultiValuePolicy::Refuse => {
                    warn!(record = %record_name, values = count, "Record set holds several values, leaving it alone");
                    return Ok(Outcome::MultiValueSkipped { values: count });
                }
            },
        };

        let change = ChangeRequest::upsert(zone.id.clone(), record_set);
        debug!(?change, "Submitting change");

        let info = provider.apply_change(&zone.id, &change).await?;
        info!(
            record = %record_name,
            ip = %desired_ip,
            change_id = %info.id,
            status = ?info.status,
            "Address record {}",
            outcome
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryDnsProvider;
    use crate::Error;

    fn values(ips: &[&str]) -> Vec<String> {
        ips.iter().map(|ip| ip.to_string()).collect()
    }

    async fn provider_with(record_values: Option<Vec<String>>, ttl: u32) -> MemoryDnsProvider {
        let provider = MemoryDnsProvider::new();
        provider.add_zone("Z1", "example.com.").await;
        if let Some(record_values) = record_values {
            provider
                .put_record_set("Z1", ResourceRecordSet::a("home.example.com.", ttl, record_values))
                .await;
        }
        provider
    }

    #[tokio::test]
    async fn overwrites_single_value_and_keeps_ttl() {
        let provider = provider_with(Some(values(&["203.0.113.1"])), 3600).await;
        let reconciler = RecordReconciler::default();

        let outcome = reconciler
            .synchronize("home.example.com", "203.0.113.5", &provider)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Updated);
        let rrs = provider.address_record_set("Z1", "home.example.com.").await.unwrap();
        assert_eq!(rrs.values, values(&["203.0.113.5"]));
        assert_eq!(rrs.ttl, 3600);
    }

    #[tokio::test]
    async fn second_call_with_same_ip_does_not_write() {
        let provider = provider_with(Some(values(&["203.0.113.1"])), 300).await;
        let reconciler = RecordReconciler::default();

        let first = reconciler.synchronize("home.example.com.", "203.0.113.5", &provider).await.unwrap();
        let second = reconciler.synchronize("home.example.com.", "203.0.113.5", &provider).await.unwrap();

        assert_eq!(first, Outcome::Updated);
        assert_eq!(second, Outcome::NoChangeNeeded);
        assert_eq!(provider.apply_change_calls(), 1);
    }

    #[tokio::test]
    async fn creates_missing_record_with_default_ttl() {
        let provider = provider_with(None, 0).await;
        let reconciler = RecordReconciler::default();

        let outcome = reconciler
            .synchronize("home.example.com", "203.0.113.5", &provider)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::RecordAbsentCreated);
        let rrs = provider.address_record_set("Z1", "home.example.com.").await.unwrap();
        assert_eq!(rrs.ttl, 300);
        assert_eq!(rrs.values, values(&["203.0.113.5"]));
    }

    #[tokio::test]
    async fn empty_existing_record_counts_as_created() {
        let provider = provider_with(Some(Vec::new()), 120).await;

        let outcome = RecordReconciler::default()
            .synchronize("home.example.com", "203.0.113.5", &provider)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::RecordAbsentCreated);
        let rrs = provider.address_record_set("Z1", "home.example.com.").await.unwrap();
        assert_eq!(rrs.ttl, 120);
    }

    #[tokio::test]
    async fn missing_zone_stops_before_record_listing() {
        let provider = MemoryDnsProvider::new();
        provider.add_zone("Z9", "example.org.").await;

        let outcome = RecordReconciler::default()
            .synchronize("home.example.com", "203.0.113.5", &provider)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::ZoneNotFound {
                zone: "example.com.".to_string()
            }
        );
        assert_eq!(provider.list_record_sets_calls(), 0);
        assert_eq!(provider.apply_change_calls(), 0);
    }

    #[tokio::test]
    async fn zone_match_is_case_sensitive() {
        let provider = MemoryDnsProvider::new();
        provider.add_zone("Z1", "Example.com.").await;

        let outcome = RecordReconciler::default()
            .synchronize("home.example.com", "203.0.113.5", &provider)
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::ZoneNotFound { .. }));
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected_without_provider_calls() {
        let provider = provider_with(None, 0).await;
        let reconciler = RecordReconciler::default();

        for (name, ip) in [("", "203.0.113.5"), ("home.example.com", ""), ("home.example.com", "2001:db8::1")] {
            let outcome = reconciler.synchronize(name, ip, &provider).await.unwrap();
            assert!(matches!(outcome, Outcome::Rejected { .. }), "{name:?} {ip:?}");
        }
        assert_eq!(provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn value_anywhere_in_set_means_no_change() {
        let provider = provider_with(Some(values(&["198.51.100.7", "203.0.113.5"])), 300).await;

        let outcome = RecordReconciler::default()
            .synchronize("home.example.com", "203.0.113.5", &provider)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::NoChangeNeeded);
        assert_eq!(provider.apply_change_calls(), 0);
    }

    #[tokio::test]
    async fn multi_value_policies() {
        let existing = values(&["198.51.100.7", "198.51.100.8"]);
        let cases = [
            (MultiValuePolicy::OverwriteFirst, Outcome::Updated, values(&["203.0.113.5", "198.51.100.8"])),
            (MultiValuePolicy::ReplaceAll, Outcome::Updated, values(&["203.0.113.5"])),
            (MultiValuePolicy::Refuse, Outcome::MultiValueSkipped { values: 2 }, existing.clone()),
        ];

        for (policy, expected, stored) in cases {
            let provider = provider_with(Some(existing.clone()), 300).await;
            let reconciler = RecordReconciler::new(&ReconcilerConfig {
                default_ttl: 300,
                multi_value_policy: policy,
            });

            let outcome = reconciler
                .synchronize("home.example.com", "203.0.113.5", &provider)
                .await
                .unwrap();

            assert_eq!(outcome, expected, "{policy:?}");
            let rrs = provider.address_record_set("Z1", "home.example.com.").await.unwrap();
            assert_eq!(rrs.values, stored, "{policy:?}");
        }
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let provider = provider_with(Some(values(&["203.0.113.1"])), 300).await;
        provider.set_throttled(true);

        let err = RecordReconciler::default()
            .synchronize("home.example.com", "203.0.113.5", &provider)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RateLimited { .. }));
        assert_eq!(provider.apply_change_calls(), 1);
    }

    #[test]
    fn only_writes_are_flagged_as_writes() {
        assert!(Outcome::Updated.wrote());
        assert!(Outcome::RecordAbsentCreated.wrote());
        assert!(!Outcome::NoChangeNeeded.wrote());
        assert!(Outcome::ZoneNotFound { zone: "example.com.".into() }.is_warning());
    }

    #[test]
    fn blocking_reconcile_of_apex_record() {
        let provider = tokio_test::block_on(async {
            let provider = MemoryDnsProvider::new();
            provider.add_zone("Z1", "example.com.").await;
            provider
        });

        let outcome = tokio_test::block_on(RecordReconciler::default().synchronize(
            "example.com",
            "203.0.113.5",
            &provider,
        ))
        .unwrap();

        assert_eq!(outcome, Outcome::RecordAbsentCreated);
    }
}
