//! Configuration types for the dnsagg system
//!
//! This module defines all configuration structures used throughout the crate.
//! How the values are obtained (environment, flags) is up to the embedding
//! binary; the core only validates them.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Main reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Hosted zone that owns the target record (`Z123` or `/hostedzone/Z123`)
    pub hosted_zone_id: String,

    /// Hostnames whose addresses are unioned together
    pub source_records: Vec<String>,

    /// Hostname whose record set is rewritten
    pub target_record: String,

    /// Type of the target record set
    #[serde(default)]
    pub record_type: RecordType,

    /// Seconds between two reconciliation passes
    pub poll_interval_secs: u64,

    /// Bounds on external calls
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Record store backend
    pub provider: ProviderConfig,

    /// Optional scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl SyncConfig {
    /// Create a configuration with default timeouts and an in-memory store
    pub fn new(
        hosted_zone_id: impl Into<String>,
        source_records: Vec<String>,
        target_record: impl Into<String>,
        poll_interval_secs: u64,
    ) -> Self {
        Self {
            hosted_zone_id: hosted_zone_id.into(),
            source_records,
            target_record: target_record.into(),
            record_type: RecordType::default(),
            poll_interval_secs,
            timeouts: TimeoutConfig::default(),
            provider: ProviderConfig::Memory,
            scheduler: SchedulerConfig::default(),
        }
    }

    /// Set the record type
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Set the record store backend
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    /// Set the call timeouts
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.hosted_zone_id.trim().is_empty() {
            return Err(crate::Error::config("Hosted zone ID cannot be empty"));
        }

        if self.source_records.is_empty() {
            return Err(crate::Error::config("No source records configured"));
        }

        // Sources may also be address literals; they resolve to themselves
        for source in &self.source_records {
            if source.parse::<IpAddr>().is_err() {
                validate_domain_name(source)?;
            }
        }
        if self.target_record.parse::<IpAddr>().is_ok() {
            return Err(crate::Error::config(format!(
                "Target record must be a DNS name, got address {}",
                self.target_record
            )));
        }
        validate_domain_name(&self.target_record)?;

        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }

        self.timeouts.validate()?;
        self.provider.validate()?;

        if self.scheduler.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 validation: total length, label length, label characters.
/// A single trailing dot (fully-qualified form) is accepted.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        return Err(crate::Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// DNS record type of the target record set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[default]
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Whether a record of this type can hold `addr`
    pub fn holds(self, addr: &IpAddr) -> bool {
        match self {
            RecordType::A => addr.is_ipv4(),
            RecordType::Aaaa => addr.is_ipv6(),
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            _ => Err(crate::Error::config(format!(
                "Unsupported record type '{}'. Supported types: A, AAAA",
                s
            ))),
        }
    }
}

/// Bounds on external calls made during a pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per-hostname resolution timeout (in seconds)
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    /// Per-call record store timeout (in seconds)
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
}

impl TimeoutConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Validate the timeout configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.resolve_timeout_secs == 0 {
            return Err(crate::Error::config("Resolve timeout must be > 0"));
        }
        if self.provider_timeout_secs == 0 {
            return Err(crate::Error::config("Provider timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: default_resolve_timeout_secs(),
            provider_timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_resolve_timeout_secs() -> u64 {
    10
}

fn default_provider_timeout_secs() -> u64 {
    30
}

/// Record store configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// AWS Route 53
    Route53 {
        /// AWS access key ID
        access_key_id: String,
        /// AWS secret access key
        secret_access_key: String,
        /// Session token for temporary credentials
        #[serde(default)]
        session_token: Option<String>,
        /// Signing region
        #[serde(default = "default_route53_region")]
        region: String,
        /// Endpoint override (tests, other partitions)
        #[serde(default)]
        endpoint: Option<String>,
        /// Fetch but never upsert
        #[serde(default)]
        dry_run: bool,
    },

    /// In-memory store (not persistent)
    Memory,

    /// Custom store
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
            ProviderConfig::Route53 {
                access_key_id,
                secret_access_key,
                region,
                ..
            } => {
                if access_key_id.is_empty() {
                    return Err(crate::Error::config("AWS access key ID cannot be empty"));
                }
                if secret_access_key.is_empty() {
                    return Err(crate::Error::config(
                        "AWS secret access key cannot be empty",
                    ));
                }
                if region.is_empty() {
                    return Err(crate::Error::config("AWS region cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom store factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom store config cannot be null"));
                }
                Ok(())
            }
            ProviderConfig::Memory => Ok(()),
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Route53 { .. } => "route53",
            ProviderConfig::Memory => "memory",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

// Credentials must never reach logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Route53 {
                region,
                endpoint,
                dry_run,
                session_token,
                ..
            } => f
                .debug_struct("Route53")
                .field("access_key_id", &"<REDACTED>")
                .field("secret_access_key", &"<REDACTED>")
                .field("session_token", &session_token.as_ref().map(|_| "<REDACTED>"))
                .field("region", region)
                .field("endpoint", endpoint)
                .field("dry_run", dry_run)
                .finish(),
            ProviderConfig::Memory => f.write_str("Memory"),
            ProviderConfig::Custom { factory, config } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", config)
                .finish(),
        }
    }
}

fn default_route53_region() -> String {
    "us-east-1".to_string()
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Capacity of the scheduler event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    100
}
