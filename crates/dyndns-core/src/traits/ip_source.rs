// # IP Source Trait
//
// Defines the interface for discovering the host's WAN IP address.
//
// ## Implementations
//
// - HTTP-based: `dyndns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current_ip = source.current().await?;
//     println!("WAN IP: {}", current_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP source implementations
///
/// The orchestrator calls [`IpSource::current`] once per cycle and compares
/// the answer against the IP it observed on the previous cycle. Sources
/// therefore do not need to detect changes themselves.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform the I/O needed to learn the address (HTTP, sockets)
/// - ✅ Apply their own request timeout
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `DnsProvider`)
/// - ❌ Implement retry logic
/// - ❌ Cache the answer between calls
/// - ❌ Spawn polling loops (the orchestrator owns scheduling)
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current IP address
    /// - `Err(Error)`: If unable to determine the current IP; the
    ///   orchestrator skips the cycle
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Short name of the source (for logging/debugging)
    fn source_name(&self) -> &'static str {
        "unknown"
    }
}

/// Helper trait for constructing IP sources from configuration
pub trait IpSourceFactory: Send + Sync {
    /// Create an IpSource instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this IP source type
    ///
    /// # Returns
    ///
    /// A boxed IpSource trait object
    fn create(
        &self,
        config: &crate::config::IpSourceConfig,
    ) -> Result<Box<dyn IpSource>, crate::Error>;
}
