//! System GSS-API backend (feature `gssapi`).
//!
//! Implements [`GssProvider`] over the platform GSS-API via the `libgssapi`
//! crate. Requires the system Kerberos libraries at build time and a reachable
//! KDC at run time; the realm configuration named in `LoginConfig` is the
//! usual `krb5` configuration consumed by that library.

use std::sync::Mutex;

use libgssapi::context::{ClientCtx, CtxFlags, SecurityContext as _};
use libgssapi::credential::{Cred, CredUsage};
use libgssapi::error::MajorFlags;
use libgssapi::name::Name;
use libgssapi::oid::{GSS_MECH_KRB5, GSS_MECH_SPNEGO, GSS_NT_HOSTBASED_SERVICE, Oid, OidSet};

use super::gss::{ContextFlags, GssError, GssProvider, Mechanism, SecurityContext};

fn mech_oid(mechanism: Mechanism) -> &'static Oid {
    match mechanism {
        Mechanism::Spnego => &GSS_MECH_SPNEGO,
        Mechanism::Kerberos => &GSS_MECH_KRB5,
    }
}

fn map_error(e: libgssapi::error::Error) -> GssError {
    if e.major.contains(MajorFlags::GSS_S_BAD_MECH) {
        GssError::BadMechanism(e.to_string())
    } else {
        GssError::Failure(e.to_string())
    }
}

/// GSS provider backed by the system GSS-API (MIT Kerberos / Heimdal).
///
/// Credentials are acquired once at login from the process credential cache
/// and shared by every context established afterwards.
pub struct SystemGssProvider {
    cred: Mutex<Option<Cred>>,
}

impl SystemGssProvider {
    /// Create a provider with no credentials acquired yet
    pub fn new() -> Self {
        Self {
            cred: Mutex::new(None),
        }
    }
}

impl Default for SystemGssProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GssProvider for SystemGssProvider {
    fn login(&self, entry_name: &str) -> Result<(), GssError> {
        let mut mechs = OidSet::new().map_err(map_error)?;
        mechs.add(&GSS_MECH_SPNEGO).map_err(map_error)?;
        mechs.add(&GSS_MECH_KRB5).map_err(map_error)?;

        // The default principal of the credential cache is the initiator;
        // entry_name only labels the login for diagnostics here.
        let cred =
            Cred::acquire(None, None, CredUsage::Initiate, Some(&mechs)).map_err(map_error)?;

        tracing::debug!(entry = entry_name, "acquired initiator credentials");
        *self
            .cred
            .lock()
            .map_err(|_| GssError::Failure("credential lock poisoned".into()))? = Some(cred);
        Ok(())
    }

    fn logout(&self) -> Result<(), GssError> {
        *self
            .cred
            .lock()
            .map_err(|_| GssError::Failure("credential lock poisoned".into()))? = None;
        Ok(())
    }

    fn establish_context(
        &self,
        service: &str,
        mechanism: Mechanism,
        flags: ContextFlags,
    ) -> Result<Box<dyn SecurityContext>, GssError> {
        let cred = self
            .cred
            .lock()
            .map_err(|_| GssError::Failure("credential lock poisoned".into()))?
            .clone()
            .ok_or_else(|| GssError::Failure("not logged in".into()))?;

        let oid = mech_oid(mechanism);
        let name = Name::new(service.as_bytes(), Some(&GSS_NT_HOSTBASED_SERVICE))
            .and_then(|n| n.canonicalize(Some(oid)))
            .map_err(map_error)?;

        let mut ctx_flags = CtxFlags::empty();
        if flags.mutual_auth {
            ctx_flags |= CtxFlags::GSS_C_MUTUAL_FLAG;
        }
        if flags.delegate_credentials {
            ctx_flags |= CtxFlags::GSS_C_DELEG_FLAG;
        }

        Ok(Box::new(SystemContext {
            ctx: ClientCtx::new(Some(cred), name, ctx_flags, Some(oid)),
        }))
    }
}

struct SystemContext {
    ctx: ClientCtx,
}

impl SecurityContext for SystemContext {
    fn step(&mut self, input: &[u8]) -> Result<Vec<u8>, GssError> {
        let input = if input.is_empty() { None } else { Some(input) };
        match self.ctx.step(input, None) {
            Ok(Some(token)) => Ok(token.to_vec()),
            Ok(None) => Ok(Vec::new()),
            Err(e) => Err(map_error(e)),
        }
    }
}
