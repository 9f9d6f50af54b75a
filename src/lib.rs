//! # spnego-fetch
//!
//! SPNEGO/Kerberos-authenticated concurrent resource fetcher.
//!
//! The crate authenticates outbound HTTP requests to a Kerberos-protected web
//! server using the SPNEGO negotiation mechanism, then drains a shared work
//! queue of resource names with a fixed pool of workers, obtaining a fresh
//! `Negotiate` authorization header per request and persisting each response
//! body to a local output directory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use spnego_fetch::{Config, SpnegoFetcher, StaticGssProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::for_host("srv1.example.com");
//!
//!     // Swap in SystemGssProvider (feature "gssapi") against a real realm
//!     let provider = Arc::new(StaticGssProvider::new(b"token".to_vec()));
//!
//!     let fetcher = SpnegoFetcher::new(config, provider).await?;
//!     let report = fetcher.run_from_file().await?;
//!     println!("fetched {} resources", report.fetched);
//!     Ok(())
//! }
//! ```
//!
//! ## Limitations
//!
//! Each header request performs a single token-initiation step; services that
//! require a multi-round mutual handshake are not supported.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// SPNEGO/GSS authentication (credential context, negotiator, provider seam)
pub mod auth;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Concurrent fetch pipeline (work queue, worker pool, coordinator)
pub mod fetch;
/// Backoff computation for transient fetch retries
pub mod retry;

// Re-export commonly used types
pub use auth::{
    ContextFlags, CredentialContext, GssError, GssProvider, Mechanism, Negotiator,
    SecurityContext, StaticGssProvider,
};
#[cfg(feature = "gssapi")]
pub use auth::SystemGssProvider;
pub use config::{Config, FetchConfig, LoginConfig, RetryConfig, TargetConfig};
pub use error::{AuthError, Error, IsRetryable, Result};
pub use fetch::{FetchReport, SpnegoFetcher, WorkQueue, read_file_list};
