//! Polling orchestrator
//!
//! The SyncOrchestrator is responsible for:
//! - Asking the IpSource for the WAN IP once per cycle
//! - Skipping the cycle when the IP matches the one seen last cycle
//! - Reconciling every configured domain, in order, when it changed
//! - Sleeping for the configured interval between cycles
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  IpSource   │─── current() ───┐
//! └─────────────┘                 │
//!                                 ▼
//!                      ┌───────────────────┐
//!                      │ SyncOrchestrator  │  last_known_ip
//!                      └───────────────────┘
//!                                 │  (only when the IP changed)
//!             ┌───────────────────┼───────────────────┐
//!             ▼                   ▼                   ▼
//!   ┌──────────────────┐  ┌──────────────┐    ┌─────────────┐
//!   │ RecordReconciler │─►│ DnsProvider  │    │   Events    │
//!   │ (per domain)     │  │              │    │  (notify)   │
//!   └──────────────────┘  └──────────────┘    └─────────────┘
//! ```
//!
//! ## Cycle Rules
//!
//! 1. IP discovery failure skips the whole cycle; the cached IP is kept
//! 2. An unchanged IP skips every domain; the provider is not called
//! 3. One domain failing never stops the others
//! 4. The observed IP is cached after all domains were attempted, whatever
//!    their individual results
//! 5. The interval sleep starts after the cycle completes; cycles never overlap

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::reconciler::{Outcome, RecordReconciler};
use crate::traits::{DnsProvider, IpSource};
use crate::zone::resolve_zone;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncOrchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Orchestrator started
    Started {
        domains_count: usize,
    },

    /// The WAN IP could not be determined; cycle skipped
    IpDiscoveryFailed {
        error: String,
    },

    /// Same WAN IP as last cycle; cycle skipped
    IpUnchanged {
        ip: IpAddr,
    },

    /// WAN IP differs from last cycle (or this is the first cycle)
    IpChanged {
        previous_ip: Option<IpAddr>,
        new_ip: IpAddr,
    },

    /// A domain was reconciled
    RecordSynced {
        domain: String,
        outcome: Outcome,
    },

    /// A provider call failed while reconciling a domain
    RecordFailed {
        domain: String,
        error: String,
    },

    /// Orchestrator stopped
    Stopped {
        reason: String,
    },
}

/// Result of reconciling one domain during a cycle
#[derive(Debug)]
pub struct DomainResult {
    /// Domain name as configured
    pub domain: String,
    /// Reconciliation outcome or provider error
    pub result: Result<Outcome>,
}

/// What a single cycle did
#[derive(Debug)]
pub enum CycleReport {
    /// The IP source failed; nothing else happened
    IpDiscoveryFailed {
        error: Error,
    },
    /// The IP matched the cached one; no domain was touched
    IpUnchanged {
        ip: IpAddr,
    },
    /// Every domain was attempted with the new IP
    Reconciled {
        ip: IpAddr,
        results: Vec<DomainResult>,
    },
}

/// Polling loop that keeps a list of domains pointed at the WAN IP
///
/// ## Lifecycle
///
/// 1. Create with [`SyncOrchestrator::new()`]
/// 2. Start with [`SyncOrchestrator::run()`]
/// 3. Runs until Ctrl-C (or the test shutdown signal)
///
/// ## Threading
///
/// One cooperative loop. The last-known IP is owned by the orchestrator and
/// only touched between provider calls, through `&mut self`.
pub struct SyncOrchestrator {
    /// Source of the WAN IP
    ip_source: Box<dyn IpSource>,

    /// DNS provider holding the hosted zones
    provider: Box<dyn DnsProvider>,

    /// Per-domain reconciliation
    reconciler: RecordReconciler,

    /// Domains to manage, in reconciliation order
    domains: Vec<String>,

    /// Pause between cycles
    interval: Duration,

    /// IP observed on the previous cycle
    last_known_ip: Option<IpAddr>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP source implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: dyndns configuration
    ///
    /// # Returns
    ///
    /// A tuple of (orchestrator, event_receiver) where event_receiver yields sync events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.orchestrator.event_channel_capacity);

        let orchestrator = Self {
            ip_source,
            provider,
            reconciler: RecordReconciler::new(&config.reconciler),
            domains: config.domains,
            interval: Duration::from_secs(config.orchestrator.interval_secs),
            last_known_ip: None,
            event_tx: tx,
        };

        Ok((orchestrator, rx))
    }

    /// Override the pause between cycles
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// IP observed on the previous cycle, if any
    pub fn last_known_ip(&self) -> Option<IpAddr> {
        self.last_known_ip
    }

    /// Run until Ctrl-C
    ///
    /// A cycle in progress is always finished; the signal only cuts the
    /// sleep between cycles short.
    pub async fn run(&mut self) -> Result<()> {
        // The listener must be armed before the first cycle starts
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    let _ = tx.send(());
                }
                Err(e) => {
                    error!("Failed to listen for Ctrl-C: {}", e);
                    // Keep the sender alive so the loop keeps running
                    std::future::pending::<()>().await;
                    drop(tx);
                }
            }
        });
        tokio::task::yield_now().await;

        self.run_until(async {
            let _ = rx.await;
        })
        .await
    }

    /// Run with a controlled shutdown signal
    ///
    /// `None` behaves like [`SyncOrchestrator::run()`]. Dropping the sender
    /// counts as a shutdown request.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        match shutdown_rx {
            Some(rx) => {
                self.run_until(async {
                    let _ = rx.await;
                })
                .await
            }
            None => self.run().await,
        }
    }

    async fn run_until(&mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);

        self.emit_event(SyncEvent::Started {
            domains_count: self.domains.len(),
        });
        info!(
            domains = self.domains.len(),
            interval_secs = self.interval.as_secs(),
            provider = self.provider.provider_name(),
            "Orchestrator started"
        );

        loop {
            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(SyncEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    /// Run exactly one cycle
    pub async fn run_cycle(&mut self) -> CycleReport {
        let ip = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                error!(source = self.ip_source.source_name(), error = %e, "Failed to retrieve WAN IP, skipping cycle");
                self.emit_event(SyncEvent::IpDiscoveryFailed {
                    error: e.to_string(),
                });
                return CycleReport::IpDiscoveryFailed { error: e };
            }
        };

        if self.last_known_ip == Some(ip) {
            debug!(ip = %ip, "WAN IP unchanged, nothing to do");
            self.emit_event(SyncEvent::IpUnchanged { ip });
            return CycleReport::IpUnchanged { ip };
        }

        info!(previous = ?self.last_known_ip, new = %ip, "WAN IP observed");
        self.emit_event(SyncEvent::IpChanged {
            previous_ip: self.last_known_ip,
            new_ip: ip,
        });

        let desired_ip = ip.to_string();
        let mut results = Vec::with_capacity(self.domains.len());

        for domain in &self.domains {
            let result = self
                .reconciler
                .synchronize(domain, &desired_ip, self.provider.as_ref())
                .await;

            match &result {
                Ok(outcome) => {
                    if outcome.is_warning() {
                        warn!(domain = %domain, ip = %desired_ip, "Domain not synchronized: {}", outcome);
                    } else {
                        debug!(domain = %domain, "Domain synchronized: {}", outcome);
                    }
                    self.emit_event(SyncEvent::RecordSynced {
                        domain: domain.clone(),
                        outcome: outcome.clone(),
                    });
                }
                Err(e) => {
                    // Continue with other domains
                    error!(
                        domain = %domain,
                        zone = %resolve_zone(domain),
                        provider = self.provider.provider_name(),
                        kind = e.kind(),
                        error = %e,
                        "Failed to synchronize domain"
                    );
                    self.emit_event(SyncEvent::RecordFailed {
                        domain: domain.clone(),
                        error: e.to_string(),
                    });
                }
            }

            results.push(DomainResult {
                domain: domain.clone(),
                result,
            });
        }

        self.last_known_ip = Some(ip);

        CycleReport::Reconciled { ip, results }
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        // Never block the loop on a slow consumer
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
