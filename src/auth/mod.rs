//! Authentication module for HTTP Negotiate (SPNEGO/Kerberos) support.
//!
//! The module is organized around a narrow provider seam:
//! - [`gss`] - The `GssProvider`/`SecurityContext` traits, mechanism
//!   identifiers, and a static in-memory provider for tests and demos
//! - [`credentials`] - Credential context lifecycle (login at startup,
//!   guaranteed logout)
//! - [`negotiate`] - The Negotiator producing `Negotiate` authorization
//!   header values, with SPNEGO-to-Kerberos mechanism fallback
//!
//! The real GSS-API backend lives in [`gssapi`] behind the `gssapi` cargo
//! feature, since it links against the system Kerberos libraries.

pub mod credentials;
pub mod gss;
#[cfg(feature = "gssapi")]
pub mod gssapi;
pub mod negotiate;

pub use credentials::CredentialContext;
pub use gss::{ContextFlags, GssError, GssProvider, Mechanism, SecurityContext, StaticGssProvider};
#[cfg(feature = "gssapi")]
pub use gssapi::SystemGssProvider;
pub use negotiate::Negotiator;
