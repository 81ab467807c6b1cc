// # DNS Provider Trait
//
// Defines the interface the reconciler uses to read and mutate hosted zones.
//
// ## Implementations
//
// - Cloudflare: `dyndns-provider-cloudflare` crate
// - In-memory: `dyndns_core::provider::MemoryDnsProvider` (tests, dry runs)
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     for zone in provider.list_zones().await? {
//         let record_sets = provider.list_record_sets(&zone.id).await?;
//         println!("{}: {} record set(s)", zone.name, record_sets.len());
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// TTL given to address record sets that the reconciler creates
pub const DEFAULT_TTL: u32 = 300;

/// A hosted zone as listed by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-assigned identifier
    pub id: String,
    /// Fully-qualified zone apex, e.g. `example.com.`
    pub name: String,
}

impl Zone {
    /// Create a zone handle
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// DNS record type
///
/// Only [`RecordType::A`] is ever written. Other types are carried so that
/// providers can report complete zone contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    #[serde(rename = "AAAA")]
    Aaaa,
    /// Canonical name
    #[serde(rename = "CNAME")]
    Cname,
    /// Any other record type, by its textual name
    Other(String),
}

impl RecordType {
    /// Parse a textual record type as providers report it
    pub fn parse(value: &str) -> Self {
        match value {
            "A" => Self::A,
            "AAAA" => Self::Aaaa,
            "CNAME" => Self::Cname,
            other => Self::Other(other.to_string()),
        }
    }

    /// Textual name of the record type
    pub fn as_str(&self) -> &str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed collection of record values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    /// Fully-qualified record name, ending with the root separator
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Record values in provider order
    pub values: Vec<String>,
}

impl ResourceRecordSet {
    /// Create an address record set
    pub fn a(name: impl Into<String>, ttl: u32, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::A,
            ttl,
            values,
        }
    }

    /// Whether this set is the address record for `name`
    pub fn is_address_record_for(&self, name: &str) -> bool {
        self.record_type == RecordType::A && self.name == name
    }
}

/// Change action
///
/// Only upserts are issued; the provider creates the record set if it does
/// not exist and replaces it otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    /// Update-or-insert
    Upsert,
}

/// A single-record-set mutation submitted to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Zone the change applies to
    pub zone_id: String,
    /// Action to apply
    pub action: ChangeAction,
    /// Desired state of the record set
    pub record_set: ResourceRecordSet,
}

impl ChangeRequest {
    /// Build an upsert for `record_set` in `zone_id`
    pub fn upsert(zone_id: impl Into<String>, record_set: ResourceRecordSet) -> Self {
        Self {
            zone_id: zone_id.into(),
            action: ChangeAction::Upsert,
            record_set,
        }
    }
}

/// Propagation state of an applied change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// Accepted, not yet visible on all name servers
    Pending,
    /// Visible on all name servers
    Insync,
}

/// Acknowledgement returned by [`DnsProvider::apply_change`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// Provider-assigned change identifier
    pub id: String,
    /// Propagation state
    pub status: ChangeStatus,
}

/// Trait for DNS provider implementations
///
/// Providers expose three primitive operations and leave every decision
/// (which zone, which record, whether a write is needed) to
/// [`crate::reconciler::RecordReconciler`].
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Follow pagination and return fully materialized listings
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Implement retry logic or backoff
/// - ❌ Cache zones or record sets between calls
/// - ❌ Decide whether an update is needed
/// - ❌ Create hosted zones
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List all hosted zones visible to the configured credentials
    ///
    /// # Errors
    ///
    /// - [`crate::Error::ProviderUnavailable`] on transport or auth failure
    async fn list_zones(&self) -> Result<Vec<Zone>, crate::Error>;

    /// List every record set in a zone
    ///
    /// Record set names are fully qualified and end with the root separator.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::ProviderUnavailable`] on transport or auth failure
    /// - [`crate::Error::ZoneNotFound`] if `zone_id` is unknown
    async fn list_record_sets(&self, zone_id: &str)
    -> Result<Vec<ResourceRecordSet>, crate::Error>;

    /// Apply a single change
    ///
    /// # Errors
    ///
    /// - [`crate::Error::ProviderUnavailable`] on transport or auth failure
    /// - [`crate::Error::InvalidChangeRequest`] if the provider rejects it
    /// - [`crate::Error::RateLimited`] if the provider throttles the call
    async fn apply_change(
        &self,
        zone_id: &str,
        change: &ChangeRequest,
    ) -> Result<ChangeInfo, crate::Error>;

    /// Get the provider name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "cloudflare", "memory")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed DnsProvider trait object
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
