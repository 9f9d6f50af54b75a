//! GSS provider seam.
//!
//! Negotiation talks to the platform GSS-API through the [`GssProvider`] and
//! [`SecurityContext`] traits so the handshake logic can be exercised without
//! a Kerberos realm. The real backend is in [`crate::auth::gssapi`] (feature
//! `gssapi`); [`StaticGssProvider`] is an in-memory provider for tests and
//! demos.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// OID of the SPNEGO pseudo-mechanism (the primary negotiation mechanism)
pub const SPNEGO_OID: &str = "1.3.6.1.5.5.2";

/// OID of the raw Kerberos v5 mechanism (the fallback mechanism)
pub const KERBEROS_OID: &str = "1.2.840.113554.1.2.2";

/// A GSS security mechanism identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mechanism {
    /// SPNEGO negotiation pseudo-mechanism
    Spnego,
    /// Raw Kerberos v5
    Kerberos,
}

impl Mechanism {
    /// The dotted-decimal OID string for this mechanism
    pub fn oid(&self) -> &'static str {
        match self {
            Mechanism::Spnego => SPNEGO_OID,
            Mechanism::Kerberos => KERBEROS_OID,
        }
    }

    /// The mechanism to retry with when this one is rejected as unsupported.
    /// There is exactly one fallback level: SPNEGO falls back to raw Kerberos,
    /// raw Kerberos has nowhere left to go.
    pub fn fallback(&self) -> Option<Mechanism> {
        match self {
            Mechanism::Spnego => Some(Mechanism::Kerberos),
            Mechanism::Kerberos => None,
        }
    }
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mechanism::Spnego => write!(f, "SPNEGO"),
            Mechanism::Kerberos => write!(f, "Kerberos"),
        }
    }
}

/// Flags requested when establishing a security context
#[derive(Clone, Copy, Debug)]
pub struct ContextFlags {
    /// Request mutual authentication of client and server
    pub mutual_auth: bool,
    /// Request credential delegation to the server
    pub delegate_credentials: bool,
}

impl Default for ContextFlags {
    fn default() -> Self {
        Self {
            mutual_auth: true,
            delegate_credentials: true,
        }
    }
}

/// Errors surfaced by a GSS provider
#[derive(Clone, Debug, Error)]
pub enum GssError {
    /// The requested mechanism is not supported by the provider or target.
    /// This is the only error that triggers mechanism fallback.
    #[error("bad mechanism: {0}")]
    BadMechanism(String),

    /// Any other GSS failure
    #[error("{0}")]
    Failure(String),
}

/// An in-progress security context between this initiator and a target service.
///
/// A context performs exactly one initiation step per negotiation in this
/// design (no multi-round mutual handshake loop). Disposal happens on `Drop`,
/// which guarantees release on every exit path.
pub trait SecurityContext: Send {
    /// Perform one token-initiation step, feeding the previous token
    /// (empty on the first call) and returning the updated token.
    fn step(&mut self, input: &[u8]) -> Result<Vec<u8>, GssError>;
}

/// Provider of GSS credentials and security contexts.
///
/// Implementations must be safe to share across workers: `login`/`logout`
/// manage process-wide initiator credentials, and `establish_context` creates
/// an independent per-negotiation context each call.
pub trait GssProvider: Send + Sync {
    /// Acquire initiator credentials for the named login-configuration entry
    fn login(&self, entry_name: &str) -> Result<(), GssError>;

    /// Release the initiator credentials acquired by [`login`](Self::login)
    fn logout(&self) -> Result<(), GssError>;

    /// Create a security context for the hostbased service name
    /// (`HTTP@<host>`) under the given mechanism
    fn establish_context(
        &self,
        service: &str,
        mechanism: Mechanism,
        flags: ContextFlags,
    ) -> Result<Box<dyn SecurityContext>, GssError>;
}

/// Observability counters kept by [`StaticGssProvider`]
///
/// Contexts created must equal contexts disposed once a negotiation call has
/// returned, on success and failure paths alike.
#[derive(Debug, Default)]
pub struct GssCounters {
    /// Security contexts successfully created
    pub contexts_created: AtomicUsize,
    /// Security contexts disposed (dropped)
    pub contexts_disposed: AtomicUsize,
    /// Successful logins
    pub logins: AtomicUsize,
    /// Logout attempts
    pub logouts: AtomicUsize,
    /// Every establishment attempt, in order, by mechanism
    pub establish_attempts: Mutex<Vec<Mechanism>>,
    /// The input token passed to each step call, in order
    pub step_inputs: Mutex<Vec<Vec<u8>>>,
}

impl GssCounters {
    /// Mechanisms attempted so far, in order
    pub fn attempted_mechanisms(&self) -> Vec<Mechanism> {
        self.establish_attempts
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Number of contexts created
    pub fn created(&self) -> usize {
        self.contexts_created.load(Ordering::SeqCst)
    }

    /// Number of contexts disposed
    pub fn disposed(&self) -> usize {
        self.contexts_disposed.load(Ordering::SeqCst)
    }
}

/// GSS provider that fabricates tokens without touching a real Kerberos stack.
///
/// Each established context yields the configured token bytes from its single
/// step. Failure injection knobs cover the interesting negotiation paths:
/// SPNEGO rejection (drives fallback), establishment failure, step failure,
/// and login failure. All activity is recorded in [`GssCounters`].
pub struct StaticGssProvider {
    tokens: Mutex<VecDeque<Vec<u8>>>,
    default_token: Vec<u8>,
    reject_spnego: bool,
    reject_spnego_at_step: bool,
    establish_failure: Option<String>,
    step_failure: Option<String>,
    login_failure: Option<String>,
    logout_failure: Option<String>,
    counters: Arc<GssCounters>,
}

impl StaticGssProvider {
    /// Create a provider whose contexts always yield `token`
    pub fn new(token: impl Into<Vec<u8>>) -> Self {
        Self {
            tokens: Mutex::new(VecDeque::new()),
            default_token: token.into(),
            reject_spnego: false,
            reject_spnego_at_step: false,
            establish_failure: None,
            step_failure: None,
            login_failure: None,
            logout_failure: None,
            counters: Arc::new(GssCounters::default()),
        }
    }

    /// Queue per-call tokens; once exhausted the default token is used
    pub fn with_token_sequence(self, tokens: Vec<Vec<u8>>) -> Self {
        Self {
            tokens: Mutex::new(tokens.into()),
            ..self
        }
    }

    /// Reject SPNEGO establishment with `BadMechanism`, forcing fallback
    pub fn with_spnego_rejected(mut self) -> Self {
        self.reject_spnego = true;
        self
    }

    /// Reject the step call on SPNEGO contexts with `BadMechanism`, mimicking
    /// implementations that build contexts lazily and only touch the
    /// mechanism on the first step
    pub fn with_spnego_rejected_at_step(mut self) -> Self {
        self.reject_spnego_at_step = true;
        self
    }

    /// Fail every establishment attempt with a non-mechanism error
    pub fn with_establish_failure(mut self, reason: impl Into<String>) -> Self {
        self.establish_failure = Some(reason.into());
        self
    }

    /// Fail the step call on every established context
    pub fn with_step_failure(mut self, reason: impl Into<String>) -> Self {
        self.step_failure = Some(reason.into());
        self
    }

    /// Fail login attempts
    pub fn with_login_failure(mut self, reason: impl Into<String>) -> Self {
        self.login_failure = Some(reason.into());
        self
    }

    /// Fail logout attempts (logout failures must never surface to callers)
    pub fn with_logout_failure(mut self, reason: impl Into<String>) -> Self {
        self.logout_failure = Some(reason.into());
        self
    }

    /// Handle to the provider's counters
    pub fn counters(&self) -> Arc<GssCounters> {
        Arc::clone(&self.counters)
    }

    fn next_token(&self) -> Vec<u8> {
        self.tokens
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.default_token.clone())
    }
}

impl GssProvider for StaticGssProvider {
    fn login(&self, entry_name: &str) -> Result<(), GssError> {
        if let Some(reason) = &self.login_failure {
            return Err(GssError::Failure(format!("{reason} (entry {entry_name})")));
        }
        self.counters.logins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn logout(&self) -> Result<(), GssError> {
        self.counters.logouts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.logout_failure {
            return Err(GssError::Failure(reason.clone()));
        }
        Ok(())
    }

    fn establish_context(
        &self,
        _service: &str,
        mechanism: Mechanism,
        _flags: ContextFlags,
    ) -> Result<Box<dyn SecurityContext>, GssError> {
        if let Ok(mut attempts) = self.counters.establish_attempts.lock() {
            attempts.push(mechanism);
        }
        if self.reject_spnego && mechanism == Mechanism::Spnego {
            return Err(GssError::BadMechanism(format!(
                "mechanism {} not supported",
                mechanism.oid()
            )));
        }
        if let Some(reason) = &self.establish_failure {
            return Err(GssError::Failure(reason.clone()));
        }
        self.counters.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticContext {
            token: self.next_token(),
            step_failure: self.step_failure.clone(),
            step_bad_mechanism: self.reject_spnego_at_step && mechanism == Mechanism::Spnego,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct StaticContext {
    token: Vec<u8>,
    step_failure: Option<String>,
    step_bad_mechanism: bool,
    counters: Arc<GssCounters>,
}

impl SecurityContext for StaticContext {
    fn step(&mut self, input: &[u8]) -> Result<Vec<u8>, GssError> {
        if let Ok(mut inputs) = self.counters.step_inputs.lock() {
            inputs.push(input.to_vec());
        }
        if self.step_bad_mechanism {
            return Err(GssError::BadMechanism(
                "mechanism rejected at first call".to_string(),
            ));
        }
        if let Some(reason) = &self.step_failure {
            return Err(GssError::Failure(reason.clone()));
        }
        Ok(self.token.clone())
    }
}

impl Drop for StaticContext {
    fn drop(&mut self) {
        self.counters.contexts_disposed.fetch_add(1, Ordering::SeqCst);
    }
}
