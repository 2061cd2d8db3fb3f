//! System-API session (C2): owns the single `tss_esapi::Context` allocated
//! for this process's lifetime.
//!
//! `tss_esapi::Context::new` already performs the size-query/allocate/
//! initialize dance of §4.2 against the TCTI context it's handed, and its
//! `Drop` impl finalizes and frees both the ESAPI and TCTI contexts — so
//! this wrapper's job is narrower than the spec's C-level description: name
//! the resource, map connection failure to [`Error::BackendUnavailable`],
//! and give the rest of the crate a single place to reach the live
//! `Context` through.

use tss_esapi::Context;

use crate::error::{Error, Result};
use crate::tcti;

/// The process-wide TPM connection. One instance exists per process
/// lifetime, owned by [`crate::api`].
pub struct Tpm {
    pub(crate) ctx: Context,
}

impl Tpm {
    /// Resolves the configured TCTI backend (C1) and opens the system-API
    /// context (C2) on top of it.
    pub fn connect() -> Result<Tpm> {
        let tcti = tcti::resolve()?;
        let ctx = Context::new(tcti).map_err(|_| Error::BackendUnavailable)?;
        Ok(Tpm { ctx })
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }
}
