// # dyndns-core
//
// Core library for the dyndns record synchronizer.
//
// ## Architecture Overview
//
// This library keeps DNS address records pointed at the host's WAN IP:
// - **zone**: Derives the hosted zone name for a record name
// - **DnsProvider**: Trait for listing zones/record sets and applying changes
// - **IpSource**: Trait for discovering the current WAN IP
// - **RecordReconciler**: Decides whether a record needs an update and issues it
// - **SyncOrchestrator**: Polling loop that drives the reconciler per domain
// - **ProviderRegistry**: Plugin-based registry for providers and IP sources
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decisions live here, wire protocols in provider crates
// 2. **Idempotency**: An unchanged IP never produces a DNS write
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Manual Zones**: Hosted zones are never created automatically

pub mod traits;
pub mod zone;
pub mod reconciler;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsProvider, IpSource};
pub use reconciler::{Outcome, RecordReconciler};
pub use orchestrator::{CycleReport, SyncEvent, SyncOrchestrator};
pub use provider::MemoryDnsProvider;
pub use registry::ProviderRegistry;
pub use config::{IpSourceConfig, ProviderConfig, SyncConfig};
pub use error::{Error, Result};
