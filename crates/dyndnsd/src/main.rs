// # dyndnsd - dyndns Daemon
//
// This daemon is a THIN integration layer:
// - All record and zone logic lives in dyndns-core
// - No retry logic here; the next cycle is the retry
//
// The dyndnsd daemon is responsible for:
// 1. Parsing command-line arguments (each one has an environment fallback)
// 2. Initializing logging and the runtime
// 3. Registering providers and IP sources
// 4. Running the sync orchestrator until SIGTERM/SIGINT
//
// ## Configuration
//
// - `-d, --domains` / `DDNS_DOMAINS`: Semicolon-separated domain list (required)
// - `-f, --frequency` / `DDNS_FREQUENCY_MINS`: Minutes between cycles (default 30)
// - `--provider` / `DDNS_PROVIDER_TYPE`: `cloudflare` (default) or `route53`
// - `--api-token` / `DDNS_PROVIDER_API_TOKEN`: Cloudflare API token (required for cloudflare)
// - `--aws-access-key-id` / `DDNS_AWS_ACCESS_KEY_ID`: Route53 access key (optional)
// - `--aws-secret-access-key` / `DDNS_AWS_SECRET_ACCESS_KEY`: Route53 secret key (optional)
// - `--provider-base-url` / `DDNS_PROVIDER_BASE_URL`: API endpoint override
// - `--ip-source-url` / `DDNS_IP_SOURCE_URL`: WAN IP lookup endpoint
// - `--mode` / `DDNS_MODE`: `live` or `dry-run`
// - `--multi-value-policy` / `DDNS_MULTI_VALUE_POLICY`: overwrite-first, replace-all, refuse
// - `--log-level` / `DDNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DDNS_PROVIDER_API_TOKEN=your_token
// dyndnsd -d "home.example.com;nas.example.net" -f 15
//
// # Route53 with the default AWS credential chain
// dyndnsd --provider route53 -d home.example.com
// ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use dyndns_core::config::{
    DEFAULT_IP_URL, IpSourceConfig, MultiValuePolicy, OrchestratorConfig, ProviderConfig,
    ReconcilerConfig, SyncConfig,
};
use dyndns_core::{ProviderRegistry, SyncEvent, SyncOrchestrator};
use std::process::ExitCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Usage, configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Usage or configuration error, startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Longest accepted pause between cycles (one year)
const MAX_FREQUENCY_MINS: u64 = 365 * 24 * 60;

/// DNS hosting backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Provider {
    Cloudflare,
    Route53,
}

/// Whether DNS writes are performed or only logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Live,
    DryRun,
}

/// Keep DNS address records pointed at this host's WAN IP
///
/// Hosted zones must already exist at the provider; only A records are
/// created or updated.
#[derive(Parser, Debug)]
#[command(name = "dyndnsd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Domains to keep updated, separated by ';'
    #[arg(short = 'd', long, env = "DDNS_DOMAINS", value_delimiter = ';', required = true)]
    domains: Vec<String>,

    /// Minutes between update cycles
    #[arg(
        short = 'f',
        long = "frequency",
        env = "DDNS_FREQUENCY_MINS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..=MAX_FREQUENCY_MINS)
    )]
    frequency_mins: u64,

    /// DNS hosting backend
    #[arg(long, env = "DDNS_PROVIDER_TYPE", value_enum, default_value_t = Provider::Cloudflare)]
    provider: Provider,

    /// Cloudflare API token
    #[arg(long, env = "DDNS_PROVIDER_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// AWS access key id; the default credential chain is used when absent
    #[arg(long, env = "DDNS_AWS_ACCESS_KEY_ID", requires = "aws_secret_access_key")]
    aws_access_key_id: Option<String>,

    /// AWS secret access key
    #[arg(
        long,
        env = "DDNS_AWS_SECRET_ACCESS_KEY",
        hide_env_values = true,
        requires = "aws_access_key_id"
    )]
    aws_secret_access_key: Option<String>,

    /// DNS provider API base URL override
    #[arg(long, env = "DDNS_PROVIDER_BASE_URL")]
    provider_base_url: Option<String>,

    /// Plain-text endpoint that answers with the caller's IP
    #[arg(long, env = "DDNS_IP_SOURCE_URL", default_value = DEFAULT_IP_URL)]
    ip_source_url: String,

    /// `dry-run` reads zones and records but never writes
    #[arg(long, env = "DDNS_MODE", value_enum, default_value_t = Mode::Live)]
    mode: Mode,

    /// Handling of address records that already hold several values
    #[arg(long, env = "DDNS_MULTI_VALUE_POLICY", default_value = "overwrite-first")]
    multi_value_policy: MultiValuePolicy,

    /// Log verbosity
    #[arg(long, env = "DDNS_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Validate arguments that clap cannot check on its own
    fn validate(&self) -> Result<()> {
        if self.domains().is_empty() {
            anyhow::bail!(
                "At least one domain is required. \
                Pass it via: dyndnsd -d home.example.com (or DDNS_DOMAINS)"
            );
        }

        for domain in self.domains() {
            validate_domain_name(&domain)?;
        }

        match self.provider {
            Provider::Cloudflare => {
                if self.api_token.as_deref().is_none_or(|t| t.trim().is_empty()) {
                    anyhow::bail!(
                        "DDNS_PROVIDER_API_TOKEN is required for cloudflare. \
                        Set it via: export DDNS_PROVIDER_API_TOKEN=your_token"
                    );
                }
            }
            Provider::Route53 => {
                let blank = |key: &Option<String>| key.as_deref().is_some_and(|k| k.trim().is_empty());
                if blank(&self.aws_access_key_id) || blank(&self.aws_secret_access_key) {
                    anyhow::bail!("DDNS_AWS_ACCESS_KEY_ID and DDNS_AWS_SECRET_ACCESS_KEY cannot be empty");
                }
            }
        }

        if !self.ip_source_url.starts_with("https://") && !self.ip_source_url.starts_with("http://") {
            anyhow::bail!(
                "DDNS_IP_SOURCE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.ip_source_url
            );
        }

        parse_log_level(&self.log_level)?;

        Ok(())
    }

    /// Domains with surrounding whitespace and empty entries removed
    fn domains(&self) -> Vec<String> {
        self.domains
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect()
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            domains: self.domains(),
            ip_source: IpSourceConfig::Http {
                url: self.ip_source_url.clone(),
                timeout_secs: 10,
            },
            provider: self.provider_config(),
            reconciler: ReconcilerConfig {
                multi_value_policy: self.multi_value_policy,
                ..ReconcilerConfig::default()
            },
            orchestrator: OrchestratorConfig {
                interval_secs: self.frequency_mins * 60,
                ..OrchestratorConfig::default()
            },
        }
    }

    fn provider_config(&self) -> ProviderConfig {
        let dry_run = self.mode == Mode::DryRun;
        match self.provider {
            Provider::Cloudflare => ProviderConfig::Cloudflare {
                api_token: self.api_token.clone().unwrap_or_default(),
                base_url: self.provider_base_url.clone(),
                dry_run,
            },
            Provider::Route53 => ProviderConfig::Route53 {
                access_key_id: self.aws_access_key_id.clone(),
                secret_access_key: self.aws_secret_access_key.clone(),
                endpoint_url: self.provider_base_url.clone(),
                dry_run,
            },
        }
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; a single trailing root separator is accepted.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Usage errors exit before anything else starts
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                DdnsExitCode::ConfigError.into()
            } else {
                DdnsExitCode::CleanShutdown.into()
            };
        }
    };

    if let Err(e) = cli.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let log_level = parse_log_level(&cli.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting dyndnsd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(cli.sync_config()).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: SyncConfig) -> Result<()> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        dyndns_provider_cloudflare::register(&registry);
    }

    #[cfg(feature = "route53")]
    {
        info!("Registering Route53 provider");
        dyndns_provider_route53::register(&registry);
    }

    #[cfg(feature = "http")]
    {
        info!("Registering HTTP IP source");
        dyndns_ip_http::register(&registry);
    }

    let ip_source = registry.create_ip_source(&config.ip_source)?;
    let provider = registry.create_provider(&config.provider)?;

    info!("IP source type: {}", config.ip_source.type_name());
    info!("Provider type: {}", config.provider.type_name());
    for domain in &config.domains {
        info!("Managing record: {}", domain);
    }

    let (mut orchestrator, events) = SyncOrchestrator::new(ip_source, provider, config)?;
    tokio::spawn(log_events(events));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown signal error: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    orchestrator.run_with_shutdown(Some(shutdown_rx)).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Drain orchestrator events so the channel never fills
async fn log_events(mut events: mpsc::Receiver<SyncEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::RecordFailed { domain, error } => {
                warn!(domain = %domain, "Record sync failed: {}", error)
            }
            other => debug!("Event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
