//! DA controller (C9): detect dictionary-attack lockout, decide whether and
//! how to reset it, and expose the synchronization point C7 calls before
//! every auth-bearing command.
//!
//! `reset` is a direct port of the original's `da_reset`: it is a sequence
//! of early-return checks against [`crate::capability::LockoutState`], never
//! a state machine, because the original never needed one here — the retry
//! *loop* is the only part worth re-architecting, and it is just a bounded
//! `for` over the interactive prompt.

use tss_esapi::handles::{AuthHandle, ObjectHandle};
use tss_esapi::Context;

use crate::capability;
use crate::error::{AuthSlot, Error, Result};
use crate::options::OptionStore;
use crate::prompt::SecretPrompter;
use crate::session::Session;

/// Matches the original's `CRYPTFS_TPM2_MAX_LOCKOUT_RETRY`.
pub const MAX_LOCKOUT_RETRY: u32 = 3;

fn lockout_handle() -> ObjectHandle {
    ObjectHandle::from(AuthHandle::Lockout)
}

fn clear_lockout(ctx: &mut Context, auth: &[u8]) -> Result<()> {
    let session = Session::new_password(auth)?;
    session.apply_auth(ctx, lockout_handle())?;
    ctx.execute_with_session(Some(session.esapi_session()), |ctx| {
        ctx.dictionary_attack_lock_reset(AuthHandle::Lockout)
    })
    .map_err(|e| Error::tpm("DictionaryAttackLockReset", e))
}

/// Implements §4.9's seven-step decision tree.
pub fn reset(ctx: &mut Context, options: &OptionStore, prompter: &mut dyn SecretPrompter) -> Result<()> {
    let state = capability::lockout_state(ctx)?;

    if state.lockout_counter < state.max_tries {
        return Ok(());
    }
    if state.da_disabled() {
        return Ok(());
    }
    if state.lockout_enforced() {
        return Err(Error::Lockout);
    }
    if !state.lockout_auth_required {
        return clear_lockout(ctx, &[]);
    }

    let stored = options.lockout_auth();
    if !stored.is_empty() {
        match clear_lockout(ctx, stored) {
            Ok(()) => return Ok(()),
            Err(Error::Tpm { .. }) | Err(Error::BadAuth { .. }) => {}
            Err(other) => return Err(other),
        }
    }

    if !options.interactive() {
        return Err(Error::AuthRequired {
            hierarchy: AuthSlot::Lockout,
        });
    }

    let mut last_err = Error::AuthRequired {
        hierarchy: AuthSlot::Lockout,
    };
    for _ in 0..MAX_LOCKOUT_RETRY {
        let attempt = prompter.prompt(AuthSlot::Lockout)?;
        match clear_lockout(ctx, &attempt) {
            Ok(()) => return Ok(()),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

/// `da_check_and_reset`: the no-op fast path when the TPM isn't locked out.
pub fn check_and_reset(ctx: &mut Context, options: &OptionStore, prompter: &mut dyn SecretPrompter) -> Result<()> {
    if capability::lockout_state(ctx)?.in_lockout {
        reset(ctx, options, prompter)
    } else {
        Ok(())
    }
}
