//! HTTP Negotiate header production with mechanism fallback.
//!
//! Implements the client side of the HTTP "Negotiate" authentication scheme
//! (RFC 4559): establish a GSS security context for the target service and
//! turn its initiation token into an `Authorization` header value. When the
//! SPNEGO pseudo-mechanism is rejected as unsupported, the whole attempt is
//! retried once with raw Kerberos. The rejection may surface from context
//! establishment or from the initiation step: GSS implementations that build
//! contexts lazily only touch the mechanism on the first step call.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use url::Url;

use crate::error::{AuthError, Result};

use super::credentials::CredentialContext;
use super::gss::{ContextFlags, GssError, GssProvider, Mechanism};

/// Derive the hostbased GSS service name from a URL.
///
/// For HTTP authentication the service name format is `HTTP@<hostname>`.
pub(crate) fn derive_service(url: &Url) -> Result<String> {
    let host = url.host_str().ok_or_else(|| AuthError::InvalidTarget {
        url: url.to_string(),
    })?;
    Ok(format!("HTTP@{host}"))
}

/// Why a single-mechanism negotiation attempt failed, tagged by phase so the
/// caller can map establishment and initiation failures to distinct errors
enum AttemptError {
    Establish(GssError),
    Step(GssError),
}

impl AttemptError {
    /// True when the mechanism itself was rejected, regardless of which phase
    /// reported it
    fn is_bad_mechanism(&self) -> bool {
        matches!(
            self,
            AttemptError::Establish(GssError::BadMechanism(_))
                | AttemptError::Step(GssError::BadMechanism(_))
        )
    }

    fn reason(&self) -> String {
        match self {
            AttemptError::Establish(e) | AttemptError::Step(e) => e.to_string(),
        }
    }
}

/// Produces `Negotiate` authorization header values for target URLs.
///
/// Each worker owns its own `Negotiator`: the token field and the per-call
/// security context are mutable per-negotiation state and are never shared
/// across workers. The credential context behind it is shared and read-only.
///
/// Each call performs exactly one token-initiation step, feeding back the
/// previous token (empty on the first call). This supports services that
/// accept a one-shot initiator token; servers requiring multiple handshake
/// round trips are not supported by this design.
pub struct Negotiator {
    provider: Arc<dyn GssProvider>,
    flags: ContextFlags,
    token: Vec<u8>,
}

impl Negotiator {
    /// Create a negotiator acting under the given credential context's
    /// principal, requesting mutual authentication and credential delegation
    pub fn new(credentials: &CredentialContext) -> Self {
        Self {
            provider: credentials.provider(),
            flags: ContextFlags::default(),
            token: Vec::new(),
        }
    }

    /// Produce the authorization header value for `url`:
    /// `"Negotiate " + base64(token)`.
    ///
    /// The attempt runs with SPNEGO first; a `BadMechanism` rejection, whether
    /// reported at establishment or by the initiation step, triggers exactly
    /// one full retry with raw Kerberos. Any other failure propagates without
    /// fallback. Every security context is disposed before this returns, on
    /// success and failure paths alike, and the failed primary attempt never
    /// holds a context while the fallback creates its own.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidTarget`] if `url` has no host component
    /// - [`AuthError::MechanismFailure`] if establishment failed, or if the
    ///   mechanism was rejected under both SPNEGO and raw Kerberos
    /// - [`AuthError::TokenInitiation`] if the initiation step failed
    pub fn authorization_header(&mut self, url: &Url) -> Result<String> {
        let service = derive_service(url)?;

        let token = match self.attempt(&service, Mechanism::Spnego) {
            Ok(token) => token,
            Err(e) if e.is_bad_mechanism() => {
                tracing::debug!(
                    service = %service,
                    reason = %e.reason(),
                    "SPNEGO rejected, retrying with raw Kerberos"
                );
                match self.attempt(&service, Mechanism::Kerberos) {
                    Ok(token) => token,
                    Err(AttemptError::Step(GssError::Failure(reason))) => {
                        return Err(AuthError::TokenInitiation { service, reason }.into());
                    }
                    Err(e) => {
                        return Err(AuthError::MechanismFailure {
                            service,
                            reason: e.reason(),
                        }
                        .into());
                    }
                }
            }
            Err(AttemptError::Establish(e)) => {
                return Err(AuthError::MechanismFailure {
                    service,
                    reason: e.to_string(),
                }
                .into());
            }
            Err(AttemptError::Step(e)) => {
                return Err(AuthError::TokenInitiation {
                    service,
                    reason: e.to_string(),
                }
                .into());
            }
        };

        self.token = token;
        Ok(format!("Negotiate {}", BASE64.encode(&self.token)))
    }

    /// Establish a context under one mechanism and run its initiation step,
    /// feeding the stored previous token.
    ///
    /// The context lives only for the duration of this call, so a failed
    /// attempt never holds a handle while a later attempt creates its own.
    fn attempt(
        &self,
        service: &str,
        mechanism: Mechanism,
    ) -> std::result::Result<Vec<u8>, AttemptError> {
        let mut context = self
            .provider
            .establish_context(service, mechanism, self.flags)
            .map_err(AttemptError::Establish)?;
        context.step(&self.token).map_err(AttemptError::Step)
    }
}
