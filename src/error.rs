//! Error types for spnego-fetch
//!
//! This module provides the error taxonomy for the crate:
//! - Authentication errors (login, negotiation, token initiation)
//! - Per-item fetch and persistence errors
//! - Configuration validation errors
//!
//! Startup errors (`Config`, `Auth(ConfigurationMissing)`, `Auth(LoginFailed)`)
//! abort the run before any worker starts. Per-item errors are local to the
//! worker processing that item and are surfaced by the coordinator after all
//! workers have finished.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for spnego-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for spnego-fetch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.workers")
        key: Option<String>,
    },

    /// Authentication or negotiation error
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Network error while fetching a resource
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP fetch for a resource returned a non-success status
    #[error("fetch of {resource} failed with status {status}")]
    Fetch {
        /// The resource name that failed to fetch
        resource: String,
        /// The HTTP status code the server returned
        status: u16,
    },

    /// Failed to persist a fetched resource to disk
    #[error("failed to persist {resource} to {path}: {reason}")]
    Persist {
        /// The resource name being written
        resource: String,
        /// The destination path
        path: PathBuf,
        /// The reason the write failed
        reason: String,
    },

    /// URL construction or parsing error
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Authentication and GSS negotiation errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Required Kerberos configuration files are absent
    #[error("missing required configuration file {path} ({which})")]
    ConfigurationMissing {
        /// Which configuration input is missing ("realm config" or "login config")
        which: String,
        /// The path that was checked
        path: PathBuf,
    },

    /// Login against the configured entry failed
    #[error("login failed for entry {entry}: {reason}")]
    LoginFailed {
        /// The login-configuration entry name
        entry: String,
        /// The reason the login failed
        reason: String,
    },

    /// The target URL has no resolvable host component
    #[error("invalid target URL {url}: no host component")]
    InvalidTarget {
        /// The offending URL
        url: String,
    },

    /// Security context establishment failed under both mechanisms
    #[error("security context establishment failed for {service}: {reason}")]
    MechanismFailure {
        /// The target service name (HTTP@<host>)
        service: String,
        /// The underlying GSS failure
        reason: String,
    },

    /// The token initiation step failed on an established context
    #[error("token initiation failed for {service}: {reason}")]
    TokenInitiation {
        /// The target service name (HTTP@<host>)
        service: String,
        /// The underlying GSS failure
        reason: String,
    },
}

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, connection resets) should return
/// `true`. Negotiation and configuration failures are never retryable: the
/// Negotiator's errors are non-retriable by contract, and retry policy lives
/// with the fetch layer.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // 5xx responses may be transient; everything else is the server's
            // final word on this resource
            Error::Fetch { status, .. } => *status >= 500,
            // Auth, config, persist, and URL errors are permanent
            Error::Auth(_)
            | Error::Config { .. }
            | Error::Persist { .. }
            | Error::Url(_)
            | Error::Other(_) => false,
        }
    }
}
