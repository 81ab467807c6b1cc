//! Configuration types for the dyndns system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Default WAN IP lookup endpoint
pub const DEFAULT_IP_URL: &str = "https://checkip.amazonaws.com";

/// Main dyndns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Domain names to keep pointed at the WAN IP, in reconciliation order
    pub domains: Vec<String>,

    /// IP source configuration
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Record reconciliation settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Polling loop settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl SyncConfig {
    /// Create a configuration for `domains` with default settings
    pub fn new(domains: Vec<String>, provider: ProviderConfig) -> Self {
        Self {
            domains,
            ip_source: IpSourceConfig::default(),
            provider,
            reconciler: ReconcilerConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domains.is_empty() {
            return Err(crate::Error::config("No domains configured"));
        }

        if self.domains.iter().any(|d| d.trim().is_empty()) {
            return Err(crate::Error::config("Domain names cannot be empty"));
        }

        self.provider.validate()?;
        self.ip_source.validate()?;
        self.reconciler.validate()?;
        self.orchestrator.validate()?;

        Ok(())
    }
}

/// IP source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpSourceConfig {
    /// HTTP-based IP source (plain-text "what is my IP" endpoint)
    Http {
        /// URL to fetch IP from
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_ip_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom IP source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            IpSourceConfig::Http { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(crate::Error::config("HTTP IP source URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "HTTP IP source URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("HTTP IP source timeout must be > 0"));
                }
                Ok(())
            }
            IpSourceConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom IP source factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the IP source type name
    pub fn type_name(&self) -> &str {
        match self {
            IpSourceConfig::Http { .. } => "http",
            IpSourceConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        IpSourceConfig::Http {
            url: DEFAULT_IP_URL.to_string(),
            timeout_secs: default_ip_timeout_secs(),
        }
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// API base URL override (testing, proxies)
        #[serde(default)]
        base_url: Option<String>,
        /// Read zones and records but only log writes
        #[serde(default)]
        dry_run: bool,
    },

    /// AWS Route53 provider
    ///
    /// Without explicit keys the AWS default credential chain is used
    /// (environment, profile files, instance metadata).
    Route53 {
        /// Access key id; must be given together with `secret_access_key`
        #[serde(default)]
        access_key_id: Option<String>,
        /// Secret access key
        #[serde(default)]
        secret_access_key: Option<String>,
        /// API endpoint override (testing, proxies)
        #[serde(default)]
        endpoint_url: Option<String>,
        /// Read zones and records but only log writes
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Route53 {
                access_key_id,
                secret_access_key,
                ..
            } => match (access_key_id, secret_access_key) {
                (Some(key), Some(secret)) if key.is_empty() || secret.is_empty() => Err(
                    crate::Error::config("Route53 access key id and secret cannot be empty"),
                ),
                (Some(_), None) | (None, Some(_)) => Err(crate::Error::config(
                    "Route53 access key id and secret access key must be given together",
                )),
                _ => Ok(()),
            },
            ProviderConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Route53 { .. } => "route53",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

// Keeps API tokens out of logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                base_url, dry_run, ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("base_url", base_url)
                .field("dry_run", dry_run)
                .finish(),
            ProviderConfig::Route53 {
                access_key_id,
                endpoint_url,
                dry_run,
                ..
            } => f
                .debug_struct("Route53")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<REDACTED>")
                .field("endpoint_url", endpoint_url)
                .field("dry_run", dry_run)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

/// What to do with an address record set that already holds several values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiValuePolicy {
    /// Overwrite the first value, keep the others
    #[default]
    OverwriteFirst,
    /// Replace the whole value list with the desired IP
    ReplaceAll,
    /// Leave the record set alone
    Refuse,
}

impl std::str::FromStr for MultiValuePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "overwrite_first" => Ok(Self::OverwriteFirst),
            "replace_all" => Ok(Self::ReplaceAll),
            "refuse" => Ok(Self::Refuse),
            other => Err(crate::Error::config(format!(
                "Unknown multi-value policy '{}'. Valid: overwrite_first, replace_all, refuse",
                other
            ))),
        }
    }
}

/// Record reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// TTL (seconds) for address records that have to be created
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Handling of record sets with more than one value
    #[serde(default)]
    pub multi_value_policy: MultiValuePolicy,
}

impl ReconcilerConfig {
    /// Validate the reconciler settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.default_ttl == 0 {
            return Err(crate::Error::config("Default TTL must be > 0"));
        }
        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            multi_value_policy: MultiValuePolicy::default(),
        }
    }
}

/// Polling loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds between the end of one cycle and the start of the next
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl OrchestratorConfig {
    /// Validate the loop settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Polling interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ip_timeout_secs() -> u64 {
    10
}

fn default_ttl() -> u32 {
    crate::traits::DEFAULT_TTL
}

fn default_interval_secs() -> u64 {
    30 * 60
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloudflare() -> ProviderConfig {
        ProviderConfig::Cloudflare {
            api_token: "secret-token".to_string(),
            base_url: None,
            dry_run: false,
        }
    }

    #[test]
    fn defaults_follow_the_classic_updater() {
        let config = SyncConfig::new(vec!["home.example.com".into()], cloudflare());
        assert_eq!(config.orchestrator.interval_secs, 1800);
        assert_eq!(config.reconciler.default_ttl, 300);
        assert_eq!(config.reconciler.multi_value_policy, MultiValuePolicy::OverwriteFirst);
        assert!(matches!(
            config.ip_source,
            IpSourceConfig::Http { ref url, .. } if url == DEFAULT_IP_URL
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_domain_list_is_rejected() {
        let config = SyncConfig::new(vec![], cloudflare());
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));

        let config = SyncConfig::new(vec!["  ".into()], cloudflare());
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = serde_json::json!({
            "domains": ["home.example.com"],
            "provider": { "type": "cloudflare", "api_token": "t0k3n" },
            "reconciler": { "multi_value_policy": "replace_all" }
        });

        let config: SyncConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.reconciler.multi_value_policy, MultiValuePolicy::ReplaceAll);
        assert_eq!(config.reconciler.default_ttl, 300);
        assert_eq!(config.provider.type_name(), "cloudflare");
        assert_eq!(config.ip_source.type_name(), "http");
    }

    #[test]
    fn policy_parses_from_cli_spelling() {
        assert_eq!("replace-all".parse::<MultiValuePolicy>().unwrap(), MultiValuePolicy::ReplaceAll);
        assert_eq!("REFUSE".parse::<MultiValuePolicy>().unwrap(), MultiValuePolicy::Refuse);
        assert!("round-robin".parse::<MultiValuePolicy>().is_err());
    }

    #[test]
    fn route53_keys_come_in_pairs() {
        let route53 = |key: Option<&str>, secret: Option<&str>| ProviderConfig::Route53 {
            access_key_id: key.map(str::to_string),
            secret_access_key: secret.map(str::to_string),
            endpoint_url: None,
            dry_run: false,
        };

        assert!(route53(None, None).validate().is_ok());
        assert!(route53(Some("AKIDEXAMPLE"), Some("s3cr3t")).validate().is_ok());
        assert!(route53(Some("AKIDEXAMPLE"), None).validate().is_err());
        assert!(route53(None, Some("s3cr3t")).validate().is_err());
        assert!(route53(Some(""), Some("s3cr3t")).validate().is_err());

        let rendered = format!("{:?}", route53(Some("AKIDEXAMPLE"), Some("s3cr3t")));
        assert!(!rendered.contains("s3cr3t"));
        assert_eq!(route53(None, None).type_name(), "route53");
    }

    #[test]
    fn debug_output_redacts_token() {
        let rendered = format!("{:?}", cloudflare());
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("REDACTED"));
    }
}
