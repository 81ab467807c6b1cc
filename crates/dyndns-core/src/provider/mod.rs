//! Built-in DNS provider implementations
//!
//! - [`MemoryDnsProvider`]: Zones and record sets in memory (tests, dry runs)

pub mod memory;

pub use memory::MemoryDnsProvider;
