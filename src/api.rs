//! Public API (C11): the four operations the CLI invokes directly. Thin
//! orchestration over C5-C9 — this module owns no TPM knowledge of its own
//! beyond the `Unseal` sequence, which has no other natural home.

use tss_esapi::handles::{ObjectHandle, PersistentTpmHandle, TpmHandle};
use tss_esapi::Context;

use crate::algorithm::{HashAlg, PASSPHRASE_HANDLE};
use crate::capability;
use crate::da;
use crate::error::{AuthSlot, Error, Result};
use crate::options::OptionStore;
use crate::policy;
use crate::prompt::SecretPrompter;
use crate::retry;
use crate::session::{PolicyKind, Session};

pub use crate::object::{create_passphrase, create_primary_key};
pub use crate::persist::{evict_passphrase, evict_primary_key};

/// `unseal_passphrase(pcr_bank_alg)` (§4.11). With a PCR bank requested,
/// builds a real policy session and replays `PolicyPCR` then
/// `PolicyPassword` before unsealing; otherwise authorizes with a plain
/// password session. Either way the session is destroyed on every exit path.
pub fn unseal_passphrase(
    ctx: &mut Context,
    options: &mut OptionStore,
    prompter: &mut dyn SecretPrompter,
    pcr_bank_alg: Option<HashAlg>,
) -> Result<Vec<u8>> {
    da::check_and_reset(ctx, options, prompter)?;

    retry::submit(ctx, options, prompter, AuthSlot::Passphrase, |ctx, options| {
        let persistent = PersistentTpmHandle::new(PASSPHRASE_HANDLE)
            .map_err(|e| Error::tpm("PersistentTpmHandle", e))?;
        let object_handle: ObjectHandle = ctx
            .tr_from_tpm_public(TpmHandle::Persistent(persistent))
            .map_err(|e| Error::tpm("TrFromTpmPublic", e))?
            .into();

        let session = match pcr_bank_alg {
            Some(requested) => {
                let bank = capability::resolve_pcr_bank(ctx, requested)?;
                let real = Session::new_policy(ctx, PolicyKind::Real, bank)?;
                policy::extend(ctx, &real, bank)?;
                real
            }
            None => Session::new_password(options.passphrase_secret())?,
        };

        // `PolicyPassword` and plain password auth both resolve to the
        // object's own authorization value at command time (§4.5, §4.6), so
        // this is required regardless of which session kind is in play.
        let passphrase_auth = Session::new_password(options.passphrase_secret())?
            .password_auth()
            .expect("new_password always returns Session::Password");
        ctx.tr_set_auth(object_handle, passphrase_auth)
            .map_err(|e| Error::tpm("TrSetAuth", e))?;

        let result = ctx
            .execute_with_session(Some(session.esapi_session()), |ctx| ctx.unseal(object_handle.into()))
            .map_err(|e| Error::tpm("Unseal", e));

        session.destroy(ctx)?;
        Ok(result?.to_vec())
    })
}

/// Evicts the primary key at [`PRIMARY_KEY_HANDLE`].
pub fn evict_key(ctx: &mut Context, options: &OptionStore) -> Result<()> {
    evict_primary_key(ctx, options)
}

/// Evicts both the primary key and the passphrase object, primary key first
/// to match `evict all`'s natural teardown order.
pub fn evict_all(ctx: &mut Context, options: &OptionStore) -> Result<()> {
    evict_primary_key(ctx, options)?;
    evict_passphrase(ctx, options)
}

/// `seal all`: creates the primary key, then the passphrase object bound to
/// it.
pub fn create_all(
    ctx: &mut Context,
    options: &mut OptionStore,
    prompter: &mut dyn SecretPrompter,
    passphrase: &[u8],
    pcr_bank_alg: Option<HashAlg>,
) -> Result<()> {
    create_primary_key(ctx, options, prompter, pcr_bank_alg)?;
    create_passphrase(ctx, options, prompter, passphrase, pcr_bank_alg)
}
