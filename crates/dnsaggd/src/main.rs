// # dnsaggd - DNS Aggregation Daemon
//
// Thin integration layer: all reconciliation logic lives in dnsagg-core.
// Configuration is via environment variables only.
//
// The dnsaggd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering record stores
// 4. Running the scheduler until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Reconciliation
// - `DNSAGG_HOSTED_ZONE`: Hosted zone ID owning the target record
// - `DNSAGG_SOURCE_RECORDS`: Comma-separated list of source hostnames
// - `DNSAGG_TARGET_RECORD`: Hostname whose record set is rewritten
// - `DNSAGG_POLL_INTERVAL_SECS`: Seconds between passes
// - `DNSAGG_RECORD_TYPE`: `A` (default) or `AAAA`
// - `DNSAGG_RESOLVE_TIMEOUT_SECS`: Per-lookup timeout (default 10)
// - `DNSAGG_PROVIDER_TIMEOUT_SECS`: Per-store-call timeout (default 30)
//
// ### Record Store
// - `DNSAGG_PROVIDER_TYPE`: `route53` (default) or `memory` (simulated store
//   holding an empty target record set, for local runs without credentials)
// - `DNSAGG_MODE`: `dry-run` to log upserts instead of sending them
// - `AWS_ACCESS_KEY` / `AWS_ACCESS_KEY_ID`: Access key
// - `AWS_SECRET_KEY` / `AWS_SECRET_ACCESS_KEY`: Secret key
// - `AWS_SESSION_TOKEN`: Session token (optional)
// - `AWS_REGION`: Signing region (default us-east-1)
// - `DNSAGG_ROUTE53_ENDPOINT`: Endpoint override (optional)
//
// ## Example
//
// ```bash
// export DNSAGG_HOSTED_ZONE=Z0123456789ABC
// export DNSAGG_SOURCE_RECORDS=eu.example.com,us.example.com
// export DNSAGG_TARGET_RECORD=all.example.com
// export DNSAGG_POLL_INTERVAL_SECS=60
// export AWS_ACCESS_KEY_ID=...
// export AWS_SECRET_ACCESS_KEY=...
//
// dnsaggd
// ```

use anyhow::{Context, Result};
use dnsagg_core::config::{ProviderConfig, RecordType, SyncConfig, TimeoutConfig};
use dnsagg_core::{
    IntervalTicker, MemoryRecordStore, RecordSet, RecordStore, Reconciler, Scheduler,
    StoreRegistry, SystemResolver,
};
use std::env;
use std::future::Future;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DnsaggExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DnsaggExitCode> for ExitCode {
    fn from(code: DnsaggExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    hosted_zone: String,
    source_records: Vec<String>,
    target_record: String,
    poll_interval_secs: u64,
    record_type: RecordType,
    resolve_timeout_secs: u64,
    provider_timeout_secs: u64,
    provider_type: String,
    dry_run: bool,
    aws_access_key: Option<String>,
    aws_secret_key: Option<String>,
    aws_session_token: Option<String>,
    aws_region: String,
    route53_endpoint: Option<String>,
    log_level: String,
}

// Credentials must never reach logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("hosted_zone", &self.hosted_zone)
            .field("source_records", &self.source_records)
            .field("target_record", &self.target_record)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("record_type", &self.record_type)
            .field("provider_type", &self.provider_type)
            .field("dry_run", &self.dry_run)
            .field("aws_access_key", &self.aws_access_key.as_ref().map(|_| "<REDACTED>"))
            .field("aws_secret_key", &self.aws_secret_key.as_ref().map(|_| "<REDACTED>"))
            .field("aws_region", &self.aws_region)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| {
                anyhow::anyhow!("{} is required. Set it via: export {}=...", key, key)
            })
        };
        let number = |key: &str, raw: String| -> Result<u64> {
            raw.trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds. Got: '{}'", key, raw))
        };

        let record_type = match var("DNSAGG_RECORD_TYPE") {
            Some(raw) => raw.parse::<RecordType>()?,
            None => RecordType::default(),
        };

        Ok(Self {
            hosted_zone: required("DNSAGG_HOSTED_ZONE")?,
            source_records: required("DNSAGG_SOURCE_RECORDS")?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            target_record: required("DNSAGG_TARGET_RECORD")?,
            poll_interval_secs: number(
                "DNSAGG_POLL_INTERVAL_SECS",
                required("DNSAGG_POLL_INTERVAL_SECS")?,
            )?,
            record_type,
            resolve_timeout_secs: match var("DNSAGG_RESOLVE_TIMEOUT_SECS") {
                Some(raw) => number("DNSAGG_RESOLVE_TIMEOUT_SECS", raw)?,
                None => TimeoutConfig::default().resolve_timeout_secs,
            },
            provider_timeout_secs: match var("DNSAGG_PROVIDER_TIMEOUT_SECS") {
                Some(raw) => number("DNSAGG_PROVIDER_TIMEOUT_SECS", raw)?,
                None => TimeoutConfig::default().provider_timeout_secs,
            },
            provider_type: var("DNSAGG_PROVIDER_TYPE")
                .unwrap_or_else(|| "route53".to_string())
                .to_lowercase(),
            dry_run: var("DNSAGG_MODE")
                .unwrap_or_default()
                .eq_ignore_ascii_case("dry-run"),
            aws_access_key: var("AWS_ACCESS_KEY").or_else(|| var("AWS_ACCESS_KEY_ID")),
            aws_secret_key: var("AWS_SECRET_KEY").or_else(|| var("AWS_SECRET_ACCESS_KEY")),
            aws_session_token: var("AWS_SESSION_TOKEN"),
            aws_region: var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            route53_endpoint: var("DNSAGG_ROUTE53_ENDPOINT"),
            log_level: var("DNSAGG_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Daemon-level checks (provider type, credentials presence, log level)
    /// happen here; the reconciliation settings are checked by
    /// [`SyncConfig::validate`].
    fn validate(&self) -> Result<()> {
        match self.provider_type.as_str() {
            "route53" => {
                if self.aws_access_key.is_none() {
                    anyhow::bail!(
                        "AWS_ACCESS_KEY_ID (or AWS_ACCESS_KEY) is required when DNSAGG_PROVIDER_TYPE=route53"
                    );
                }
                if self.aws_secret_key.is_none() {
                    anyhow::bail!(
                        "AWS_SECRET_ACCESS_KEY (or AWS_SECRET_KEY) is required when DNSAGG_PROVIDER_TYPE=route53"
                    );
                }
            }
            "memory" => {}
            _ => anyhow::bail!(
                "DNSAGG_PROVIDER_TYPE '{}' is not supported. \
                Supported types: route53, memory",
                self.provider_type
            ),
        }

        if let Some(endpoint) = &self.route53_endpoint
            && !endpoint.starts_with("https://")
            && !endpoint.starts_with("http://")
        {
            anyhow::bail!(
                "DNSAGG_ROUTE53_ENDPOINT must use HTTP or HTTPS scheme. Got: {}",
                endpoint
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSAGG_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.sync_config().validate()?;
        Ok(())
    }

    /// Build the library configuration
    fn sync_config(&self) -> SyncConfig {
        let provider = match self.provider_type.as_str() {
            "route53" => ProviderConfig::Route53 {
                access_key_id: self.aws_access_key.clone().unwrap_or_default(),
                secret_access_key: self.aws_secret_key.clone().unwrap_or_default(),
                session_token: self.aws_session_token.clone(),
                region: self.aws_region.clone(),
                endpoint: self.route53_endpoint.clone(),
                dry_run: self.dry_run,
            },
            _ => ProviderConfig::Memory,
        };

        SyncConfig::new(
            self.hosted_zone.clone(),
            self.source_records.clone(),
            self.target_record.clone(),
            self.poll_interval_secs,
        )
        .with_record_type(self.record_type)
        .with_timeouts(TimeoutConfig {
            resolve_timeout_secs: self.resolve_timeout_secs,
            provider_timeout_secs: self.provider_timeout_secs,
        })
        .with_provider(provider)
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DnsaggExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DnsaggExitCode::ConfigError.into();
    }

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsaggExitCode::ConfigError.into();
    }

    info!("Starting dnsaggd daemon");
    info!(
        "Configuration loaded: {} <- {} source(s), every {}s",
        config.target_record,
        config.source_records.len(),
        config.poll_interval_secs
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsaggExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let scheduler = match build_scheduler(&config) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DnsaggExitCode::ConfigError;
            }
        };

        match run_daemon(scheduler).await {
            Ok(()) => DnsaggExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DnsaggExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// TTL of the simulated target record set
const MEMORY_TARGET_TTL: u32 = 300;

/// Wire the record store, resolver, reconciler and ticker together
fn build_scheduler(config: &Config) -> Result<Scheduler> {
    let sync = config.sync_config();
    let store = build_store(&sync, config.dry_run)?;
    info!("Record store: {}", store.store_name());

    let reconciler = Reconciler::new(Box::new(SystemResolver::new()), store, &sync)?;
    let ticker = IntervalTicker::new(sync.poll_interval())?;

    // Every pass already logs its own status line
    let (scheduler, events) =
        Scheduler::new(reconciler, Box::new(ticker), sync.scheduler.event_channel_capacity);
    drop(events);

    Ok(scheduler)
}

/// Create the record store for the configured provider
fn build_store(sync: &SyncConfig, dry_run: bool) -> Result<Box<dyn RecordStore>> {
    if matches!(sync.provider, ProviderConfig::Memory) {
        return Ok(Box::new(memory_store(sync, dry_run)));
    }

    let registry = StoreRegistry::with_builtin();

    #[cfg(feature = "route53")]
    {
        info!("Registering Route 53 record store");
        dnsagg_provider_route53::register(&registry);
    }

    registry
        .create_store(&sync.provider)
        .with_context(|| format!("Failed to create '{}' record store", sync.provider.type_name()))
}

/// Simulated store in which the target record set exists and is empty
fn memory_store(sync: &SyncConfig, dry_run: bool) -> MemoryRecordStore {
    info!(
        "Simulating {} (type: {}) in memory, nothing is sent to a DNS provider",
        sync.target_record, sync.record_type
    );
    let target = RecordSet::new(
        sync.target_record.clone(),
        sync.record_type,
        Some(MEMORY_TARGET_TTL),
        Vec::new(),
    );
    MemoryRecordStore::from_record_sets(&sync.hosted_zone_id, [target]).with_dry_run(dry_run)
}

/// Run the scheduler until a shutdown signal arrives
async fn run_daemon(mut scheduler: Scheduler) -> Result<()> {
    let shutdown = shutdown_signal()?;
    scheduler.run_until(shutdown).await?;
    info!("Shutting down daemon");
    Ok(())
}

/// Future completing on the first SIGTERM or SIGINT
///
/// Handlers are installed before this returns, so a signal that arrives
/// while the first pass is running is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()> + Send> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
    })
}

/// Future completing on Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()> + Send> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: Ctrl-C"),
            Err(e) => {
                error!("Failed to wait for Ctrl-C, running until killed: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}
