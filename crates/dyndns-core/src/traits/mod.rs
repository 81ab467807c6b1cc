//! Core traits for the dyndns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover the current WAN IP address
//! - [`DnsProvider`]: List and mutate hosted zones via provider APIs

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::{IpSource, IpSourceFactory};
pub use dns_provider::{
    ChangeAction, ChangeInfo, ChangeRequest, ChangeStatus, DnsProvider, DnsProviderFactory,
    RecordType, ResourceRecordSet, Zone, DEFAULT_TTL,
};
