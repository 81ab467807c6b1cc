// # AWS Route53 DNS Provider
//
// This crate provides an AWS Route53 DNS provider implementation for dyndns.
//
// ## Implementation Status
//
// - ✅ Hosted zone and record set listings follow pagination
// - ✅ One upsert maps onto a single-change UPSERT batch
// - ✅ Default AWS credential chain, or an explicit access key pair
// - ✅ Operation timeout configured (30 seconds)
// - ✅ Error mapping for Route53 error codes
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (SDK retries are disabled)
// - ❌ NO hosted zone creation
//
// ## Identifiers
//
// Route53 returns hosted zone ids as `/hostedzone/Z123` and change ids as
// `/change/C123`. Both prefixes are stripped before ids leave this crate.
//
// ## Security Requirements
//
// - The secret access key NEVER appears in logs or Debug output
//
// ## API Reference
//
// - ListHostedZones: GET `/2013-04-01/hostedzone`
// - ListResourceRecordSets: GET `/2013-04-01/hostedzone/:id/rrset`
// - ChangeResourceRecordSets: POST `/2013-04-01/hostedzone/:id/rrset/`

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_route53::Client;
use aws_sdk_route53::config::{Credentials, Region};
use aws_sdk_route53::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_route53::types as r53;
use dyndns_core::config::ProviderConfig;
use dyndns_core::traits::{
    ChangeAction, ChangeInfo, ChangeRequest, ChangeStatus, DEFAULT_TTL, DnsProvider,
    DnsProviderFactory, RecordType, ResourceRecordSet, Zone,
};
use dyndns_core::zone::normalize_name;
use dyndns_core::{Error, ProviderRegistry, Result};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Route53 is a global service signed against us-east-1
const ROUTE53_REGION: &str = "us-east-1";

/// Default timeout for a whole API operation (30 seconds)
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";
const CHANGE_PREFIX: &str = "/change/";

const PROVIDER_NAME: &str = "route53";

/// AWS Route53 DNS provider
///
/// The SDK client is built on first use, which is where the default
/// credential chain is resolved.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - List hosted zones and record sets
/// - Log the intended change batch
/// - **NOT** submit it
pub struct Route53Provider {
    /// Explicit credentials; `None` selects the default chain
    /// ⚠️ NEVER log the secret
    credentials: Option<Credentials>,

    /// API endpoint override
    endpoint_url: Option<String>,

    /// Dry-run mode: if true, read but never submit changes
    dry_run: bool,

    client: OnceCell<Client>,
}

// Custom Debug implementation that hides the secret access key
impl std::fmt::Debug for Route53Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Provider")
            .field(
                "credentials",
                &if self.credentials.is_some() {
                    "explicit"
                } else {
                    "default chain"
                },
            )
            .field("endpoint_url", &self.endpoint_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53Provider {
    /// Create a provider that uses the AWS default credential chain
    pub fn new(dry_run: bool) -> Self {
        Self {
            credentials: None,
            endpoint_url: None,
            dry_run,
            client: OnceCell::new(),
        }
    }

    /// Create a provider with an explicit access key pair
    ///
    /// # Errors
    ///
    /// - `Error::Config` if either key is empty
    pub fn with_credentials(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(Error::config(
                "Route53 access key id and secret access key cannot be empty",
            ));
        }

        Ok(Self {
            credentials: Some(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "dyndns",
            )),
            ..Self::new(dry_run)
        })
    }

    /// Use a different API endpoint (proxies, tests)
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Whether changes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(ROUTE53_REGION))
                    .retry_config(RetryConfig::disabled())
                    .timeout_config(
                        TimeoutConfig::builder()
                            .operation_timeout(DEFAULT_OPERATION_TIMEOUT)
                            .build(),
                    );
                if let Some(credentials) = &self.credentials {
                    loader = loader.credentials_provider(credentials.clone());
                }
                if let Some(endpoint_url) = &self.endpoint_url {
                    loader = loader.endpoint_url(endpoint_url.clone());
                }

                Client::new(&loader.load().await)
            })
            .await
    }
}

/// Read a string member whether the SDK models it as required or optional
fn text<'a>(value: impl Into<Option<&'a str>>) -> &'a str {
    value.into().unwrap_or_default()
}

fn strip_id_prefix<'a>(id: &'a str, prefix: &str) -> &'a str {
    id.strip_prefix(prefix).unwrap_or(id)
}

/// Map a Route53 error code onto the provider error taxonomy
fn error_for_code(code: Option<&str>, message: String) -> Error {
    match code {
        Some("NoSuchHostedZone") => Error::zone_not_found(message),
        Some("InvalidChangeBatch" | "InvalidInput" | "InvalidArgument") => {
            Error::invalid_change(PROVIDER_NAME, message)
        }
        Some("Throttling" | "ThrottlingException" | "PriorRequestNotComplete") => {
            Error::rate_limited(PROVIDER_NAME, message)
        }
        _ => Error::provider_unavailable(PROVIDER_NAME, message),
    }
}

fn map_sdk_error<E, R>(err: SdkError<E, R>, context: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = format!("{} failed: {}", context, DisplayErrorContext(&err));
    error_for_code(code.as_deref(), message)
}

fn build_error(e: impl std::fmt::Display) -> Error {
    Error::invalid_change(PROVIDER_NAME, format!("Failed to build change batch: {}", e))
}

fn record_set_from_sdk(rrs: &r53::ResourceRecordSet) -> Result<ResourceRecordSet> {
    let record_type: Option<&r53::RrType> = rrs.r#type().into();
    // Alias records carry no TTL
    let ttl = match rrs.ttl() {
        Some(ttl) => u32::try_from(ttl).map_err(|_| {
            Error::provider_unavailable(
                PROVIDER_NAME,
                format!("Invalid response format: TTL {} out of range", ttl),
            )
        })?,
        None => DEFAULT_TTL,
    };

    Ok(ResourceRecordSet {
        name: normalize_name(text(rrs.name())),
        record_type: RecordType::parse(record_type.map(r53::RrType::as_str).unwrap_or_default()),
        ttl,
        values: rrs
            .resource_records()
            .iter()
            .map(|record| text(record.value()).to_string())
            .collect(),
    })
}

#[async_trait]
impl DnsProvider for Route53Provider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let client = self.client().await;
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = client
                .list_hosted_zones()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, "Zone lookup"))?;

            for zone in output.hosted_zones() {
                zones.push(Zone::new(
                    strip_id_prefix(text(zone.id()), HOSTED_ZONE_PREFIX),
                    normalize_name(text(zone.name())),
                ));
            }

            match (output.is_truncated(), output.next_marker()) {
                (true, Some(next)) => marker = Some(next.to_string()),
                _ => break,
            }
        }

        tracing::debug!("Route53 hosted zones: {}", zones.len());
        Ok(zones)
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecordSet>> {
        let client = self.client().await;
        let mut sets = Vec::new();
        let mut start: Option<(String, r53::RrType)> = None;

        loop {
            let mut request = client.list_resource_record_sets().hosted_zone_id(zone_id);
            if let Some((name, record_type)) = start.take() {
                request = request
                    .start_record_name(name)
                    .start_record_type(record_type);
            }

            let output = request
                .send()
                .await
                .map_err(|e| map_sdk_error(e, "Record lookup"))?;

            for rrs in output.resource_record_sets() {
                sets.push(record_set_from_sdk(rrs)?);
            }

            match (
                output.is_truncated(),
                output.next_record_name(),
                output.next_record_type(),
            ) {
                (true, Some(name), Some(record_type)) => {
                    start = Some((name.to_string(), record_type.clone()))
                }
                _ => break,
            }
        }

        tracing::debug!("Route53 record sets in {}: {}", zone_id, sets.len());
        Ok(sets)
    }

    async fn apply_change(&self, zone_id: &str, change: &ChangeRequest) -> Result<ChangeInfo> {
        let record_set = &change.record_set;
        if record_set.values.is_empty() {
            return Err(Error::invalid_change(
                PROVIDER_NAME,
                format!("Record set {} has no values", record_set.name),
            ));
        }

        tracing::info!(
            "Upserting Route53 record set: {} {} -> {:?} [mode: {}]",
            record_set.name,
            record_set.record_type,
            record_set.values,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would submit UPSERT batch to hosted zone {} (ttl {})",
                zone_id,
                record_set.ttl
            );
            return Ok(ChangeInfo {
                id: "dry-run".to_string(),
                status: ChangeStatus::Pending,
            });
        }

        let records = record_set
            .values
            .iter()
            .map(|value| r53::ResourceRecord::builder().value(value).build().map_err(build_error))
            .collect::<Result<Vec<_>>>()?;

        let sdk_record_set = r53::ResourceRecordSet::builder()
            .name(&record_set.name)
            .r#type(r53::RrType::from(record_set.record_type.as_str()))
            .ttl(i64::from(record_set.ttl))
            .set_resource_records(Some(records))
            .build()
            .map_err(build_error)?;

        let action = match change.action {
            ChangeAction::Upsert => r53::ChangeAction::Upsert,
        };
        let batch = r53::ChangeBatch::builder()
            .changes(
                r53::Change::builder()
                    .action(action)
                    .resource_record_set(sdk_record_set)
                    .build()
                    .map_err(build_error)?,
            )
            .build()
            .map_err(build_error)?;

        let output = self
            .client()
            .await
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "Record update"))?;

        let info: Option<&r53::ChangeInfo> = output.change_info().into();
        let info = info.ok_or_else(|| {
            Error::provider_unavailable(PROVIDER_NAME, "Invalid response format: no ChangeInfo")
        })?;
        let status: Option<&r53::ChangeStatus> = info.status().into();

        let change_info = ChangeInfo {
            id: strip_id_prefix(text(info.id()), CHANGE_PREFIX).to_string(),
            status: match status {
                Some(r53::ChangeStatus::Insync) => ChangeStatus::Insync,
                _ => ChangeStatus::Pending,
            },
        };
        tracing::info!(
            "Route53 change submitted: {} ({:?})",
            change_info.id,
            change_info.status
        );
        Ok(change_info)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating Route53 providers
pub struct Route53Factory;

impl DnsProviderFactory for Route53Factory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Route53 {
                access_key_id,
                secret_access_key,
                endpoint_url,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!("Route53 provider running in DRY-RUN mode - no changes will be made");
                }

                let mut provider = match (access_key_id, secret_access_key) {
                    (Some(key), Some(secret)) => {
                        Route53Provider::with_credentials(key.clone(), secret.clone(), *dry_run)?
                    }
                    (None, None) => Route53Provider::new(*dry_run),
                    _ => {
                        return Err(Error::config(
                            "Route53 access key id and secret access key must be given together",
                        ));
                    }
                };
                if let Some(endpoint_url) = endpoint_url {
                    provider = provider.with_endpoint_url(endpoint_url.clone());
                }
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for Route53 provider")),
        }
    }
}

/// Register the Route53 provider with a registry
///
/// # Example
///
/// ```rust
/// use dyndns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dyndns_provider_route53::register(&registry);
/// assert!(registry.has_provider("route53"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(Route53Factory));
}
