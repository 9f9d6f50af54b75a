//! Credential context lifecycle.
//!
//! A [`CredentialContext`] authenticates a principal once at startup and is
//! shared read-only by every worker for the rest of the run. Release is
//! guaranteed: `close` is idempotent, swallows logout failures, and is also
//! invoked on `Drop` so every exit path releases the credentials exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::LoginConfig;
use crate::error::{AuthError, Result};

use super::gss::GssProvider;

/// A logged-in principal, valid from a successful [`open`](Self::open) until
/// [`close`](Self::close)
pub struct CredentialContext {
    provider: Arc<dyn GssProvider>,
    entry_name: String,
    closed: AtomicBool,
}

impl std::fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialContext")
            .field("entry_name", &self.entry_name)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl CredentialContext {
    /// Log in as the entry named in `login`.
    ///
    /// Both configuration files are checked before any login attempt:
    /// a missing realm or login configuration is a startup failure, not
    /// something to discover mid-run.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ConfigurationMissing`] if either configuration file
    ///   does not exist
    /// - [`AuthError::LoginFailed`] if the provider rejects the login
    pub fn open(login: &LoginConfig, provider: Arc<dyn GssProvider>) -> Result<Self> {
        for (which, path) in [
            ("realm config", &login.realm_config),
            ("login config", &login.login_config),
        ] {
            if !path.exists() {
                return Err(AuthError::ConfigurationMissing {
                    which: which.to_string(),
                    path: path.clone(),
                }
                .into());
            }
        }

        provider
            .login(&login.entry_name)
            .map_err(|e| AuthError::LoginFailed {
                entry: login.entry_name.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(entry = %login.entry_name, "credential context opened");

        Ok(Self {
            provider,
            entry_name: login.entry_name.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// The provider holding this context's credentials
    pub fn provider(&self) -> Arc<dyn GssProvider> {
        Arc::clone(&self.provider)
    }

    /// The login-configuration entry this context authenticated as
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    /// Log out. Safe to call more than once; only the first call logs out.
    ///
    /// Logout failures are logged and discarded: they must never mask or
    /// override the primary result of the run.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.provider.logout() {
            tracing::warn!(entry = %self.entry_name, error = %e, "logout failed, ignoring");
        } else {
            tracing::info!(entry = %self.entry_name, "credential context closed");
        }
    }
}

impl Drop for CredentialContext {
    fn drop(&mut self) {
        self.close();
    }
}
