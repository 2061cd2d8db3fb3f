//! Capability probe (C3): supported algorithms, PCR banks, lockout state,
//! and object inspection by persistent handle.
//!
//! Grounded on the original's `capability_read_public` (enumerate persistent
//! handles, match the one asked for, only then call `ReadPublic`) and on the
//! TCG-defined `TPM2_PT_PERMANENT` bitfield for the lockout queries. `AUTO`
//! resolution never reaches a TPM command; [`crate::algorithm::HashAlg::Auto`]
//! is resolved to a concrete algorithm entirely inside this module.

use tss_esapi::constants::tss::{
    TPM2_PT_LOCKOUT_COUNTER, TPM2_PT_MAX_AUTH_FAIL, TPM2_PT_LOCKOUT_RECOVERY, TPM2_PT_PERMANENT,
};
use tss_esapi::constants::CapabilityType;
use tss_esapi::handles::{PersistentTpmHandle, TpmHandle};
use tss_esapi::interface_types::resource_handles::Hierarchy;
use tss_esapi::structures::{CapabilityData, MaxBuffer, Name, Public};
use tss_esapi::structures::{PcrSelectionListBuilder, PcrSlot};
use tss_esapi::Context;

use crate::algorithm::{HashAlg, POLICY_PCR_INDEX};
use crate::error::{Error, Result};

const PERMANENT_OWNER_AUTH_SET: u32 = 0x0000_0001;
const PERMANENT_LOCKOUT_AUTH_SET: u32 = 0x0000_0004;
const PERMANENT_IN_LOCKOUT: u32 = 0x0000_0200;

/// Derived lockout state (§3 "Lockout state").
#[derive(Debug, Clone, Copy)]
pub struct LockoutState {
    pub in_lockout: bool,
    pub lockout_auth_required: bool,
    pub owner_auth_required: bool,
    pub lockout_counter: u32,
    pub max_tries: u32,
    pub lockout_recovery_seconds: u32,
}

impl LockoutState {
    pub fn lockout_enforced(&self) -> bool {
        self.max_tries == 0
    }

    pub fn da_disabled(&self) -> bool {
        self.lockout_recovery_seconds == 0 && self.max_tries == 0
    }
}

fn tpm_property(ctx: &mut Context, tag: u32) -> Result<u32> {
    let (data, _more) = ctx
        .get_capability(CapabilityType::TpmProperties, tag, 1)
        .map_err(|e| Error::tpm("GetCapability", e))?;
    if let CapabilityData::TpmProperties(props) = data {
        for prop in props.iter() {
            let prop_tag: u32 = prop.property().into();
            if prop_tag == tag {
                return Ok(prop.value());
            }
        }
    }
    Ok(0)
}

/// Reads the permanent attributes and the three DA counters (§4.3).
pub fn lockout_state(ctx: &mut Context) -> Result<LockoutState> {
    let permanent = tpm_property(ctx, TPM2_PT_PERMANENT)?;
    let max_tries = tpm_property(ctx, TPM2_PT_MAX_AUTH_FAIL)?;
    let lockout_counter = tpm_property(ctx, TPM2_PT_LOCKOUT_COUNTER)?;
    let lockout_recovery_seconds = tpm_property(ctx, TPM2_PT_LOCKOUT_RECOVERY)?;

    Ok(LockoutState {
        in_lockout: permanent & PERMANENT_IN_LOCKOUT != 0,
        lockout_auth_required: permanent & PERMANENT_LOCKOUT_AUTH_SET != 0,
        owner_auth_required: permanent & PERMANENT_OWNER_AUTH_SET != 0,
        lockout_counter,
        max_tries,
        lockout_recovery_seconds,
    })
}

/// Submits an empty-buffer `Hash` under `hash` to probe algorithm support.
/// Cannot be called with `HashAlg::Auto`.
fn probe_digest_algorithm(ctx: &mut Context, hash: HashAlg) -> Result<bool> {
    let alg = hash.to_hashing_algorithm()?;
    let buffer = MaxBuffer::try_from(Vec::new()).map_err(|e| Error::tpm("MaxBuffer", e))?;
    Ok(ctx.hash(buffer, alg, Hierarchy::Null).is_ok())
}

/// Resolves `hash` to a concrete, TPM-supported digest algorithm. `AUTO`
/// picks the highest-weighted supported algorithm (§4.3); any other
/// unsupported selection is `UnsupportedAlgorithm`.
pub fn resolve_digest_algorithm(ctx: &mut Context, hash: HashAlg) -> Result<HashAlg> {
    if hash != HashAlg::Auto {
        return if probe_digest_algorithm(ctx, hash)? {
            Ok(hash)
        } else {
            Err(Error::UnsupportedAlgorithm)
        };
    }

    let mut best: Option<HashAlg> = None;
    for candidate in HashAlg::CONCRETE {
        if probe_digest_algorithm(ctx, candidate)? {
            let better = match best {
                Some(current) => candidate.weight() > current.weight(),
                None => true,
            };
            if better {
                best = Some(candidate);
            }
        }
    }
    best.ok_or(Error::UnsupportedAlgorithm)
}

/// Whether the PCR bank for `hash` is allocated on this TPM, probed by
/// attempting to read the configured policy PCR in that bank.
fn probe_pcr_bank(ctx: &mut Context, hash: HashAlg) -> Result<bool> {
    let alg = hash.to_hashing_algorithm()?;
    let selection = PcrSelectionListBuilder::new()
        .with_selection(alg, &[pcr_slot(POLICY_PCR_INDEX)?])
        .build()
        .map_err(|e| Error::tpm("PcrSelectionList", e))?;
    match ctx.pcr_read(selection) {
        Ok((_, _, digests)) => Ok(!digests.is_empty()),
        Err(_) => Ok(false),
    }
}

/// Whether the PCR bank for `hash` has been extended away from its reset
/// value at the policy index — "in use" per §4.3's tie-break rule.
fn pcr_bank_in_use(ctx: &mut Context, hash: HashAlg) -> Result<bool> {
    let alg = hash.to_hashing_algorithm()?;
    let selection = PcrSelectionListBuilder::new()
        .with_selection(alg, &[pcr_slot(POLICY_PCR_INDEX)?])
        .build()
        .map_err(|e| Error::tpm("PcrSelectionList", e))?;
    let (_, _, digests) = ctx
        .pcr_read(selection)
        .map_err(|e| Error::tpm("PCR_Read", e))?;
    Ok(digests
        .value()
        .first()
        .is_some_and(|d| d.value().iter().any(|&b| b != 0)))
}

/// Resolves `hash` to a concrete, allocated PCR bank. `AUTO` scores each
/// allocated bank as `weight + 100` when in use, `weight` otherwise, so an
/// in-use bank always outranks an unused one regardless of raw weight
/// (§4.3).
pub fn resolve_pcr_bank(ctx: &mut Context, hash: HashAlg) -> Result<HashAlg> {
    const IN_USE_BONUS: u32 = 100;

    if hash != HashAlg::Auto {
        return if probe_pcr_bank(ctx, hash)? {
            Ok(hash)
        } else {
            Err(Error::UnsupportedPcr)
        };
    }

    let mut best: Option<(HashAlg, u32)> = None;
    for candidate in HashAlg::CONCRETE {
        if !probe_pcr_bank(ctx, candidate)? {
            continue;
        }
        let score = candidate.weight() + if pcr_bank_in_use(ctx, candidate)? { IN_USE_BONUS } else { 0 };
        let better = match best {
            Some((_, current_score)) => score > current_score,
            None => true,
        };
        if better {
            best = Some((candidate, score));
        }
    }
    best.map(|(alg, _)| alg).ok_or(Error::UnsupportedPcr)
}

fn pcr_slot(index: u8) -> Result<PcrSlot> {
    match index {
        0 => Ok(PcrSlot::Slot0),
        1 => Ok(PcrSlot::Slot1),
        2 => Ok(PcrSlot::Slot2),
        3 => Ok(PcrSlot::Slot3),
        4 => Ok(PcrSlot::Slot4),
        5 => Ok(PcrSlot::Slot5),
        6 => Ok(PcrSlot::Slot6),
        7 => Ok(PcrSlot::Slot7),
        8 => Ok(PcrSlot::Slot8),
        9 => Ok(PcrSlot::Slot9),
        10 => Ok(PcrSlot::Slot10),
        11 => Ok(PcrSlot::Slot11),
        _ => Err(Error::InvalidArgument(format!("PCR index {index} out of range"))),
    }
}

/// Reads the public area at a persistent handle, or `None` if the handle is
/// unoccupied. `TPM2_ReadPublic` requires no authorization (§4.3).
pub fn read_public(ctx: &mut Context, persistent_handle: u32) -> Result<Option<(Public, Name)>> {
    let handle = PersistentTpmHandle::new(persistent_handle).map_err(|e| Error::tpm("PersistentTpmHandle", e))?;
    let object_handle = match ctx.tr_from_tpm_public(TpmHandle::Persistent(handle)) {
        Ok(h) => h,
        Err(_) => return Ok(None),
    };

    let (public, name, _qualified_name) = ctx
        .read_public(object_handle)
        .map_err(|e| Error::tpm("ReadPublic", e))?;
    Ok(Some((public, name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn da_disabled_requires_both_zero() {
        let disabled = LockoutState {
            in_lockout: false,
            lockout_auth_required: false,
            owner_auth_required: false,
            lockout_counter: 0,
            max_tries: 0,
            lockout_recovery_seconds: 0,
        };
        assert!(disabled.da_disabled());
        assert!(disabled.lockout_enforced());

        let enforced_only = LockoutState {
            max_tries: 0,
            lockout_recovery_seconds: 30,
            ..disabled
        };
        assert!(!enforced_only.da_disabled());
        assert!(enforced_only.lockout_enforced());
    }

    #[test]
    fn pcr_slot_rejects_out_of_range_index() {
        assert!(pcr_slot(31).is_err());
        assert!(pcr_slot(7).is_ok());
    }
}
