//! Persistence controller (C8): the single `EvictControl` primitive behind
//! four public operations. Grounded on the pattern of moving a transient
//! object into the NV persistent range under the owner hierarchy and
//! flushing the transient copy afterward, and on probing a persistent
//! handle's occupancy via `tr_from_tpm_public` before reusing it.

use tss_esapi::handles::{AuthHandle, KeyHandle, ObjectHandle, PersistentTpmHandle, TpmHandle};
use tss_esapi::interface_types::dynamic_handles::Persistent;
use tss_esapi::interface_types::resource_handles::Provision;
use tss_esapi::Context;

use crate::algorithm::{PASSPHRASE_HANDLE, PRIMARY_KEY_HANDLE};
use crate::capability;
use crate::error::{Error, Result};
use crate::options::OptionStore;
use crate::session::Session;

pub(crate) fn owner_handle() -> ObjectHandle {
    ObjectHandle::from(AuthHandle::Owner)
}

fn owner_session(options: &OptionStore) -> Result<Session> {
    Session::new_password(options.owner_auth())
}

fn evict_control(
    ctx: &mut Context,
    options: &OptionStore,
    object_handle: ObjectHandle,
    persistent: PersistentTpmHandle,
) -> Result<()> {
    let session = owner_session(options)?;
    session.apply_auth(ctx, owner_handle())?;
    ctx.execute_with_session(Some(session.esapi_session()), |ctx| {
        ctx.evict_control(Provision::Owner, object_handle, Persistent::Persistent(persistent))
    })
    .map_err(|e| Error::tpm("EvictControl", e))?;
    Ok(())
}

fn persist(ctx: &mut Context, options: &OptionStore, transient: KeyHandle, slot: u32) -> Result<()> {
    let persistent = PersistentTpmHandle::new(slot).map_err(|e| Error::tpm("PersistentTpmHandle", e))?;
    if capability::read_public(ctx, slot)?.is_some() {
        return Err(Error::ObjectAlreadyPersistent);
    }
    evict_control(ctx, options, transient.into(), persistent)
}

fn evict(ctx: &mut Context, options: &OptionStore, slot: u32) -> Result<()> {
    let persistent = PersistentTpmHandle::new(slot).map_err(|e| Error::tpm("PersistentTpmHandle", e))?;
    let object_handle = ctx
        .tr_from_tpm_public(TpmHandle::Persistent(persistent))
        .map_err(|e| Error::tpm("TrFromTpmPublic", e))?;
    evict_control(ctx, options, object_handle, persistent)
}

/// Resolves [`PRIMARY_KEY_HANDLE`] to a usable key handle and attaches the
/// primary-key-secret slot as its authorization value.
pub fn load_primary_key(ctx: &mut Context, options: &OptionStore) -> Result<KeyHandle> {
    let persistent = PersistentTpmHandle::new(PRIMARY_KEY_HANDLE)
        .map_err(|e| Error::tpm("PersistentTpmHandle", e))?;
    let object_handle = ctx
        .tr_from_tpm_public(TpmHandle::Persistent(persistent))
        .map_err(|e| Error::tpm("TrFromTpmPublic", e))?;

    let session = Session::new_password(options.primary_key_secret())?;
    session.apply_auth(ctx, object_handle)?;
    Ok(object_handle.into())
}

pub fn persist_primary_key(ctx: &mut Context, options: &OptionStore, transient: KeyHandle) -> Result<()> {
    persist(ctx, options, transient, PRIMARY_KEY_HANDLE)
}

pub fn persist_passphrase(ctx: &mut Context, options: &OptionStore, transient: KeyHandle) -> Result<()> {
    persist(ctx, options, transient, PASSPHRASE_HANDLE)
}

pub fn evict_primary_key(ctx: &mut Context, options: &OptionStore) -> Result<()> {
    evict(ctx, options, PRIMARY_KEY_HANDLE)
}

pub fn evict_passphrase(ctx: &mut Context, options: &OptionStore) -> Result<()> {
    evict(ctx, options, PASSPHRASE_HANDLE)
}
