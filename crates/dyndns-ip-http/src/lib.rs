// # HTTP IP Source
//
// This crate provides an HTTP-based IP source for dyndns.
//
// ## Architecture
//
// Fetches the current WAN IP from a plain-text "what is my IP" service
// (default: https://checkip.amazonaws.com). The body is trimmed and its
// first line parsed as an IP address.
//
// Every call to `current()` performs exactly one GET request. There is no
// caching and no background polling; the orchestrator owns scheduling.

use dyndns_core::ProviderRegistry;
use dyndns_core::config::IpSourceConfig;
use dyndns_core::traits::{IpSource, IpSourceFactory};
use dyndns_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const SOURCE_NAME: &str = "http";

/// HTTP-based IP source
#[derive(Debug)]
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source with the default 10 second timeout
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://checkip.amazonaws.com")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// The endpoint queried by this source
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Parse the first non-empty line of a response body
fn parse_ip(body: &str) -> Result<IpAddr> {
    let line = body.trim().lines().next().unwrap_or_default().trim();
    line.parse()
        .map_err(|_| Error::ip_discovery(format!("Invalid IP address: {:?}", line)))
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_discovery(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_discovery(format!(
                "HTTP error from {}: {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_discovery(format!("Failed to read response: {}", e)))?;

        let ip = parse_ip(&body)?;
        tracing::debug!("WAN IP reported by {}: {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}

/// Factory for creating HTTP IP sources
pub struct HttpFactory;

impl IpSourceFactory for HttpFactory {
    fn create(&self, config: &IpSourceConfig) -> Result<Box<dyn IpSource>> {
        match config {
            IpSourceConfig::Http { url, timeout_secs } => Ok(Box::new(
                HttpIpSource::with_timeout(url.clone(), Duration::from_secs(*timeout_secs))?,
            )),
            _ => Err(Error::config("Invalid config for HTTP IP source")),
        }
    }
}

/// Register the HTTP IP source with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_ip_source(SOURCE_NAME, Box::new(HttpFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_factory_creation() {
        let factory = HttpFactory;

        let source = factory.create(&IpSourceConfig::default()).unwrap();
        assert_eq!(source.source_name(), "http");
    }

    #[test]
    fn test_factory_rejects_foreign_config() {
        let config = IpSourceConfig::Custom {
            factory: "static".to_string(),
            config: serde_json::Value::Null,
        };
        assert!(HttpFactory.create(&config).is_err());
    }

    #[test]
    fn test_register() {
        let registry = ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_ip_source("http"));
    }

    #[test]
    fn test_parse_ip() {
        assert_eq!(
            parse_ip("198.51.100.7\n").unwrap(),
            IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))
        );
        assert_eq!(
            parse_ip("  198.51.100.7\nextra\n").unwrap(),
            IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))
        );
        assert!(matches!(parse_ip(""), Err(Error::IpDiscovery(_))));
        assert!(matches!(parse_ip("<html>"), Err(Error::IpDiscovery(_))));
    }

    #[tokio::test]
    async fn test_each_call_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.9\n"))
            .expect(2)
            .mount(&server)
            .await;

        let source = HttpIpSource::new(server.uri()).unwrap();
        let first = source.current().await.unwrap();
        let second = source.current().await.unwrap();

        assert_eq!(first, IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_http_error_is_discovery_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpIpSource::new(server.uri()).unwrap();
        assert!(matches!(source.current().await, Err(Error::IpDiscovery(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_discovery_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("203.0.113.9")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let source = HttpIpSource::with_timeout(server.uri(), Duration::from_millis(50)).unwrap();
        assert!(matches!(source.current().await, Err(Error::IpDiscovery(_))));
    }
}
