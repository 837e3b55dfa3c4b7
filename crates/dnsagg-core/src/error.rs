//! Error types for the dnsagg system
//!
//! This module defines all error types used throughout the crate, and the
//! coarse [`ErrorKind`] taxonomy the scheduler uses to decide how a failed
//! pass is reported.

use thiserror::Error;

/// Result type alias for dnsagg operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dnsagg system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Name resolution failed (NXDOMAIN, timeout, network error)
    #[error("Resolution error ({host}): {message}")]
    Resolution {
        /// Hostname that failed to resolve
        host: String,
        /// Error message
        message: String,
    },

    /// Hosted zone or record set does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// HTTP transport errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Failure category of an [`Error`]
///
/// | Kind         | Treatment                                              |
/// |--------------|--------------------------------------------------------|
/// | `Resolution` | transient, pass aborted, loop continues                |
/// | `NotFound`   | configuration, logged distinctly, loop continues       |
/// | `Provider`   | transient, pass aborted, loop continues                |
/// | `Config`     | rejected at startup                                    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// DNS lookup of a source or the target failed
    Resolution,
    /// The target record set does not exist in the hosted zone
    NotFound,
    /// Transport, auth or throttling failure from the DNS backend
    Provider,
    /// Invalid configuration or input
    Config,
}

impl ErrorKind {
    /// Whether a later pass may succeed without operator intervention
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Resolution | ErrorKind::Provider)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Resolution => "resolution",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Provider => "provider",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a resolution error
    pub fn resolution(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Resolution { .. } => ErrorKind::Resolution,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Provider { .. }
            | Error::Authentication(_)
            | Error::RateLimited(_)
            | Error::Http(_)
            | Error::Other(_) => ErrorKind::Provider,
            Error::Config(_) | Error::InvalidInput(_) => ErrorKind::Config,
        }
    }
}
