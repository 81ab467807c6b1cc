//! Error types for the dyndns system
//!
//! This module defines all error types used throughout the crate.
//!
//! "Not found" situations that are part of normal reconciliation (a hosted
//! zone that does not exist, an address record that has not been created
//! yet) are reported through [`crate::reconciler::Outcome`], not through
//! this type. [`Error::ZoneNotFound`] is reserved for providers that are
//! asked about a zone id they do not know.

use thiserror::Error;

/// Result type alias for dyndns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dyndns system
#[derive(Error, Debug)]
pub enum Error {
    /// Transport or authentication failure talking to a DNS provider
    #[error("Provider unavailable ({provider}): {message}")]
    ProviderUnavailable {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The provider does not know the requested zone id
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// The provider rejected a change request as malformed or conflicting
    #[error("Invalid change request ({provider}): {message}")]
    InvalidChangeRequest {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The provider throttled the request
    #[error("Rate limited ({provider}): {message}")]
    RateLimited {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The WAN IP could not be determined
    #[error("IP discovery failed: {0}")]
    IpDiscovery(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

}

impl Error {
    /// Create a provider-unavailable error
    pub fn provider_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a zone-not-found error
    pub fn zone_not_found(zone: impl Into<String>) -> Self {
        Self::ZoneNotFound(zone.into())
    }

    /// Create an invalid-change-request error
    pub fn invalid_change(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidChangeRequest {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an IP discovery error
    pub fn ip_discovery(msg: impl Into<String>) -> Self {
        Self::IpDiscovery(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short, stable name of the error kind, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::ZoneNotFound(_) => "zone_not_found",
            Self::InvalidChangeRequest { .. } => "invalid_change_request",
            Self::RateLimited { .. } => "rate_limited",
            Self::IpDiscovery(_) => "ip_discovery",
            Self::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_carry_provider_name() {
        let err = Error::rate_limited("cloudflare", "slow down");
        assert_eq!(err.to_string(), "Rate limited (cloudflare): slow down");
        assert_eq!(err.kind(), "rate_limited");
    }

    #[test]
    fn kinds_are_stable_log_labels() {
        assert_eq!(Error::zone_not_found("Z9").kind(), "zone_not_found");
        assert_eq!(Error::ip_discovery("timeout").kind(), "ip_discovery");
        assert_eq!(
            Error::provider_unavailable("cloudflare", "502").to_string(),
            "Provider unavailable (cloudflare): 502"
        );
    }
}
