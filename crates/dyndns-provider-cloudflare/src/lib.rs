// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for dyndns.
//
// ## Implementation Status
//
// - ✅ Zone and record listings follow pagination and are fully materialized
// - ✅ One upsert maps onto PUT/POST/DELETE of individual Cloudflare records
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error mapping for HTTP status codes (400, 401, 403, 404, 409, 422, 429, 5xx)
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (intentionally omitted)
// - ❌ NO caching (zones and records are read fresh on every call)
// - ❌ NO zone creation
//
// ## Record Model
//
// Cloudflare stores one record per value, and names carry no trailing root
// separator. Listings are grouped by (name, type) into record sets with
// fully-qualified names; the TTL of a set is the TTL of its first record.
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider construction fails if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones`
// - List DNS Records: GET `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dyndns_core::config::ProviderConfig;
use dyndns_core::traits::{
    ChangeInfo, ChangeRequest, ChangeStatus, DnsProvider, DnsProviderFactory, RecordType,
    ResourceRecordSet, Zone,
};
use dyndns_core::zone::{normalize_name, ROOT};
use dyndns_core::{Error, ProviderRegistry, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for zone listings (API maximum is 50)
const ZONES_PER_PAGE: u32 = 50;

/// Page size for record listings
const RECORDS_PER_PAGE: u32 = 100;

const PROVIDER_NAME: &str = "cloudflare";

/// Context label of PUT/POST/DELETE requests
const WRITE_CONTEXT: &str = "Record update";

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone listing, record listing)
/// - Log the intended PUT/POST/DELETE requests
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// One Cloudflare DNS record, as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
struct CloudflareRecord {
    id: String,
    name: String,
    record_type: String,
    content: String,
    ttl: u32,
}

impl CloudflareRecord {
    fn from_json(value: &Value) -> Result<Self> {
        let field = |key: &str| {
            value[key].as_str().map(str::to_string).ok_or_else(|| {
                Error::provider_unavailable(
                    PROVIDER_NAME,
                    format!("Invalid response format: record.{} is not a string", key),
                )
            })
        };

        // Cloudflare uses ttl = 1 for "automatic"
        let ttl = match value["ttl"].as_u64() {
            Some(ttl) => u32::try_from(ttl).map_err(|_| {
                Error::provider_unavailable(
                    PROVIDER_NAME,
                    format!("Invalid response format: record.ttl {} out of range", ttl),
                )
            })?,
            None => 1,
        };

        Ok(Self {
            id: field("id")?,
            name: field("name")?,
            record_type: field("type")?,
            content: field("content")?,
            ttl,
        })
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `dry_run`: If true, perform GET requests but skip writes
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the token is empty or the HTTP client cannot be built
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Use a different API base URL (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
    }

    /// Send a request and return the parsed JSON body
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            Error::provider_unavailable(PROVIDER_NAME, format!("HTTP request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(map_status(status, &error_text, context));
        }

        let json: Value = response.json().await.map_err(|e| {
            Error::provider_unavailable(PROVIDER_NAME, format!("Failed to parse response: {}", e))
        })?;

        if json["success"].as_bool() == Some(false) {
            return Err(Error::invalid_change(
                PROVIDER_NAME,
                format!("{} rejected: {}", context, json["errors"]),
            ));
        }

        Ok(json)
    }

    /// GET every page of a listing endpoint
    async fn get_all(&self, path: &str, query: &[(&str, String)], per_page: u32, context: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut page: u64 = 1;

        loop {
            let mut params: Vec<(&str, String)> = query.to_vec();
            params.push(("page", page.to_string()));
            params.push(("per_page", per_page.to_string()));

            let json = self
                .send(self.request(Method::GET, path).query(&params), context)
                .await?;

            let result = json["result"].as_array().ok_or_else(|| {
                Error::provider_unavailable(
                    PROVIDER_NAME,
                    "Invalid response format: result is not an array",
                )
            })?;
            items.extend(result.iter().cloned());

            let total_pages = json["result_info"]["total_pages"].as_u64().unwrap_or(1);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("{}: {} item(s)", context, items.len());
        Ok(items)
    }

    /// List raw records of a zone, optionally filtered by name and type
    async fn list_records(
        &self,
        zone_id: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<CloudflareRecord>> {
        let query: Vec<(&str, String)> = match filter {
            Some((name, record_type)) => vec![
                ("name", name.to_string()),
                ("type", record_type.to_string()),
            ],
            None => Vec::new(),
        };

        self.get_all(
            &format!("/zones/{}/dns_records", zone_id),
            &query,
            RECORDS_PER_PAGE,
            "Record lookup",
        )
        .await?
        .iter()
        .map(CloudflareRecord::from_json)
        .collect()
    }

    /// Send a write, or only log it in dry-run mode
    async fn write(&self, method: Method, path: &str, payload: Option<Value>) -> Result<Option<Value>> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send {} request to {}{} with payload: {}",
                method,
                self.base_url,
                path,
                payload.as_ref().map(|p| p.to_string()).unwrap_or_default()
            );
            return Ok(None);
        }

        let mut request = self.request(method, path);
        if let Some(payload) = payload {
            request = request.json(&payload);
        }
        self.send(request, WRITE_CONTEXT).await.map(Some)
    }
}

/// Map a non-success HTTP status onto the provider error taxonomy
fn map_status(status: StatusCode, error_text: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::provider_unavailable(
            PROVIDER_NAME,
            format!(
                "Authentication failed: Invalid API token or insufficient permissions. Status: {}",
                status
            ),
        ),
        // The record id vanished between listing and write
        404 if context == WRITE_CONTEXT => Error::invalid_change(
            PROVIDER_NAME,
            format!("{} failed: record no longer exists - {}", context, error_text),
        ),
        404 => Error::zone_not_found(format!("{} failed: {}", context, error_text)),
        400 | 409 | 422 => Error::invalid_change(
            PROVIDER_NAME,
            format!("{} failed: {} - {}", context, status, error_text),
        ),
        429 => Error::rate_limited(
            PROVIDER_NAME,
            format!("Rate limit exceeded. Please retry later. Status: {}", status),
        ),
        500..=599 => Error::provider_unavailable(
            PROVIDER_NAME,
            format!("Cloudflare server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider_unavailable(
            PROVIDER_NAME,
            format!("{} failed: {} - {}", context, status, error_text),
        ),
    }
}

/// Strip the root separator; Cloudflare names are not fully qualified
fn api_name(name: &str) -> &str {
    name.strip_suffix(ROOT).unwrap_or(name)
}

/// Group individual records into record sets, in first-seen order
fn group_records(records: Vec<CloudflareRecord>) -> Vec<ResourceRecordSet> {
    let mut sets: Vec<ResourceRecordSet> = Vec::new();

    for record in records {
        let name = normalize_name(&record.name);
        let record_type = RecordType::parse(&record.record_type);

        match sets
            .iter_mut()
            .find(|rrs| rrs.name == name && rrs.record_type == record_type)
        {
            Some(rrs) => rrs.values.push(record.content),
            None => sets.push(ResourceRecordSet {
                name,
                record_type,
                ttl: record.ttl,
                values: vec![record.content],
            }),
        }
    }

    sets
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// List all zones visible to the token
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?page=1&per_page=50
    /// Authorization: Bearer <token>
    /// ```
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let zones = self
            .get_all("/zones", &[], ZONES_PER_PAGE, "Zone lookup")
            .await?;

        zones
            .iter()
            .map(|zone| {
                let id = zone["id"].as_str();
                let name = zone["name"].as_str();
                match (id, name) {
                    (Some(id), Some(name)) => Ok(Zone::new(id, normalize_name(name))),
                    _ => Err(Error::provider_unavailable(
                        PROVIDER_NAME,
                        "Invalid response format: zone.id or zone.name is not a string",
                    )),
                }
            })
            .collect()
    }

    /// List every record set in a zone
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?page=1&per_page=100
    /// Authorization: Bearer <token>
    /// ```
    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecordSet>> {
        let records = self.list_records(zone_id, None).await?;
        Ok(group_records(records))
    }

    /// Apply an upsert
    ///
    /// Existing records of the same name and type are overwritten in order
    /// (PUT), extra values are created (POST) and surplus records are
    /// removed (DELETE).
    async fn apply_change(&self, zone_id: &str, change: &ChangeRequest) -> Result<ChangeInfo> {
        let record_set = &change.record_set;
        if record_set.values.is_empty() {
            return Err(Error::invalid_change(
                PROVIDER_NAME,
                format!("Record set {} has no values", record_set.name),
            ));
        }

        let name = api_name(&record_set.name);
        let record_type = record_set.record_type.as_str();

        tracing::info!(
            "Upserting Cloudflare record set: {} {} -> {:?} [mode: {}]",
            name,
            record_type,
            record_set.values,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let existing = self
            .list_records(zone_id, Some((name, record_type)))
            .await?;

        let mut change_id = None;
        for (index, value) in record_set.values.iter().enumerate() {
            let payload = json!({
                "type": record_type,
                "name": name,
                "content": value,
                "ttl": record_set.ttl,
            });

            let response = match existing.get(index) {
                Some(record) if record.content == *value && record.ttl == record_set.ttl => {
                    change_id.get_or_insert_with(|| record.id.clone());
                    continue;
                }
                Some(record) => {
                    let path = format!("/zones/{}/dns_records/{}", zone_id, record.id);
                    self.write(Method::PUT, &path, Some(payload)).await?
                }
                None => {
                    let path = format!("/zones/{}/dns_records", zone_id);
                    self.write(Method::POST, &path, Some(payload)).await?
                }
            };

            if let Some(id) = response.as_ref().and_then(|json| json["result"]["id"].as_str()) {
                change_id.get_or_insert_with(|| id.to_string());
            }
        }

        for surplus in existing.iter().skip(record_set.values.len()) {
            let path = format!("/zones/{}/dns_records/{}", zone_id, surplus.id);
            self.write(Method::DELETE, &path, None).await?;
        }

        if self.dry_run {
            return Ok(ChangeInfo {
                id: "dry-run".to_string(),
                status: ChangeStatus::Pending,
            });
        }

        tracing::info!("Cloudflare record set updated successfully: {}", name);
        Ok(ChangeInfo {
            id: change_id.unwrap_or_default(),
            // Cloudflare applies record changes immediately
            status: ChangeStatus::Insync,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                base_url,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
                }

                let mut provider = CloudflareProvider::new(api_token.clone(), *dry_run)?;
                if let Some(base_url) = base_url {
                    provider = provider.with_base_url(base_url.clone());
                }
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use dyndns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dyndns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(CloudflareFactory));
}
