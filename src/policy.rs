//! Policy compiler (C6): composes a PCR policy and a password policy into
//! one policy digest, or replays the same two assertions against a live
//! session at unseal time.
//!
//! The construction order — `PolicyPCR` then `PolicyPassword` — is fixed and
//! observable (§4.6). The PCR-digest chaining in [`pcr_expected_digest`] is
//! ported from the original's `extend_pcr_policy_digest`: the first PCR's
//! digest is hashed alone, every subsequent one is hashed together with the
//! running digest.

use tss_esapi::structures::{Digest, PcrSelectionListBuilder, PcrSlot};
use tss_esapi::Context;

use crate::algorithm::{HashAlg, POLICY_PCR_INDEX};
use crate::hash;
use crate::session::Session;
use crate::error::{Error, Result};

fn policy_pcr_slot() -> Result<PcrSlot> {
    match POLICY_PCR_INDEX {
        0 => Ok(PcrSlot::Slot0),
        1 => Ok(PcrSlot::Slot1),
        2 => Ok(PcrSlot::Slot2),
        3 => Ok(PcrSlot::Slot3),
        4 => Ok(PcrSlot::Slot4),
        5 => Ok(PcrSlot::Slot5),
        6 => Ok(PcrSlot::Slot6),
        7 => Ok(PcrSlot::Slot7),
        other => Err(Error::InvalidArgument(format!(
            "policy PCR index {other} out of range"
        ))),
    }
}

/// Reads the current value of the policy PCR in `bank` and folds it into a
/// single expected digest under `bank`, per §4.6's chaining rule. With one
/// PCR selected this degenerates to a plain hash of the PCR value, but the
/// loop is written generally since the TPM may in principle return more than
/// one digest for a selection.
fn pcr_expected_digest(ctx: &mut Context, bank: HashAlg) -> Result<Digest> {
    let hashing_algorithm = bank.to_hashing_algorithm()?;
    let selection = PcrSelectionListBuilder::new()
        .with_selection(hashing_algorithm, &[policy_pcr_slot()?])
        .build()
        .map_err(|e| Error::tpm("PcrSelectionList", e))?;
    let requested_pcrs = selection.len();

    let (_update_counter, read_selection, digests) = ctx
        .pcr_read(selection)
        .map_err(|e| Error::tpm("PCR_Read", e))?;

    if read_selection.len() != requested_pcrs || digests.value().len() != requested_pcrs {
        return Err(Error::UnsupportedPcr);
    }

    let mut running: Option<Digest> = None;
    for pcr_digest in digests.value() {
        running = Some(match running {
            None => hash::digest(ctx, pcr_digest.value(), bank)?,
            Some(prev) => {
                let mut concatenated = prev.value().to_vec();
                concatenated.extend_from_slice(pcr_digest.value());
                hash::digest(ctx, &concatenated, bank)?
            }
        });
    }

    running.ok_or(Error::UnsupportedPcr)
}

/// Applies `PolicyPCR` then `PolicyPassword` to `session`, which must be a
/// [`Session::Policy`] (trial or real) over `bank`.
pub fn extend(ctx: &mut Context, session: &Session, bank: HashAlg) -> Result<()> {
    let policy_session = session
        .policy_session()
        .ok_or_else(|| Error::InvalidArgument("policy extension requires a policy session".into()))?;
    let hashing_algorithm = bank.to_hashing_algorithm()?;
    let expected = pcr_expected_digest(ctx, bank)?;
    let selection = PcrSelectionListBuilder::new()
        .with_selection(hashing_algorithm, &[policy_pcr_slot()?])
        .build()
        .map_err(|e| Error::tpm("PcrSelectionList", e))?;

    ctx.policy_pcr(policy_session, expected, selection)
        .map_err(|e| Error::tpm("PolicyPCR", e))?;
    ctx.policy_password(policy_session)
        .map_err(|e| Error::tpm("PolicyPassword", e))?;
    Ok(())
}

/// Runs `extend` against a trial session and returns the resulting digest,
/// suitable for an object's `authPolicy`.
pub fn compile(ctx: &mut Context, trial: &Session, bank: HashAlg) -> Result<Digest> {
    extend(ctx, trial, bank)?;
    let policy_session = trial
        .policy_session()
        .ok_or_else(|| Error::InvalidArgument("policy compile requires a policy session".into()))?;
    ctx.policy_get_digest(policy_session)
        .map_err(|e| Error::tpm("PolicyGetDigest", e))
}
