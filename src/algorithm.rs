//! Hash algorithm identifiers, digest sizes, and the process-wide constants
//! that are part of the on-disk/on-TPM external contract (§3).

use tss_esapi::interface_types::algorithm::HashingAlgorithm;

use crate::error::{Error, Result};

/// Persistent handle for the RSA primary key. Part of the external contract:
/// changing it invalidates every volume sealed by a prior build.
pub const PRIMARY_KEY_HANDLE: u32 = 0x817F_FFFF;

/// Persistent handle for the sealed passphrase object.
pub const PASSPHRASE_HANDLE: u32 = 0x817F_FFFE;

/// PCR index bound into the seal/unseal policy.
pub const POLICY_PCR_INDEX: u8 = 7;

/// Authorization value used to protect the passphrase object itself, as
/// distinct from the caller-suppliable secrets held in the option store.
/// `nameAlg` defaults to this when no PCR bank is requested (§9: "a named
/// constant, not a magic fallback").
pub const DEFAULT_POLICY_DIGEST_ALG: HashAlg = HashAlg::Sha1;

/// Maximum size of an authorization value (`TPMU_HA`'s footprint, the
/// largest digest the TPM can carry as an HMAC key).
pub const MAX_AUTH_SIZE: usize = 64;

/// Closed set of hash algorithms the TPM orchestration layer deals with.
///
/// `Auto` is only ever a valid *input* to [`crate::capability::Capabilities`]
/// asking it to pick a supported algorithm; it must never reach a TPM
/// command. `Null` is a legitimate algorithm selector (no PCR policy bound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlg {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Sm3_256,
    Null,
    Auto,
}

impl HashAlg {
    /// All concrete (non-`Auto`) algorithms the TPM could plausibly support
    /// for a PCR bank or object nameAlg, in no particular order.
    pub const CONCRETE: [HashAlg; 5] = [
        HashAlg::Sha1,
        HashAlg::Sha256,
        HashAlg::Sha384,
        HashAlg::Sha512,
        HashAlg::Sm3_256,
    ];

    /// Weight used to break ties when `Auto` resolves to more than one
    /// supported algorithm (§4.3). Higher wins.
    pub fn weight(self) -> u32 {
        match self {
            HashAlg::Sha1 => 1,
            HashAlg::Sha256 => 2,
            HashAlg::Sm3_256 => 3,
            HashAlg::Sha384 => 7,
            HashAlg::Sha512 => 9,
            HashAlg::Null | HashAlg::Auto => 0,
        }
    }

    /// Canonical digest size in bytes. Authoritative; every other component
    /// defers to this mapping (§3).
    pub fn digest_size(self) -> Result<u16> {
        match self {
            HashAlg::Sha1 => Ok(20),
            HashAlg::Sha256 | HashAlg::Sm3_256 => Ok(32),
            HashAlg::Sha384 => Ok(48),
            HashAlg::Sha512 => Ok(64),
            HashAlg::Null | HashAlg::Auto => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// Resolve to the `tss_esapi` wire-level algorithm. `Auto` cannot be
    /// resolved here; the caller must have picked a concrete algorithm via
    /// [`crate::capability::Capabilities`] first.
    pub fn to_hashing_algorithm(self) -> Result<HashingAlgorithm> {
        match self {
            HashAlg::Sha1 => Ok(HashingAlgorithm::Sha1),
            HashAlg::Sha256 => Ok(HashingAlgorithm::Sha256),
            HashAlg::Sha384 => Ok(HashingAlgorithm::Sha384),
            HashAlg::Sha512 => Ok(HashingAlgorithm::Sha512),
            HashAlg::Sm3_256 => Ok(HashingAlgorithm::Sm3_256),
            HashAlg::Null => Ok(HashingAlgorithm::Null),
            HashAlg::Auto => Err(Error::UnsupportedAlgorithm),
        }
    }

    pub fn from_hashing_algorithm(alg: HashingAlgorithm) -> Option<HashAlg> {
        match alg {
            HashingAlgorithm::Sha1 => Some(HashAlg::Sha1),
            HashingAlgorithm::Sha256 => Some(HashAlg::Sha256),
            HashingAlgorithm::Sha384 => Some(HashAlg::Sha384),
            HashingAlgorithm::Sha512 => Some(HashAlg::Sha512),
            HashingAlgorithm::Sm3_256 => Some(HashAlg::Sm3_256),
            HashingAlgorithm::Null => Some(HashAlg::Null),
            _ => None,
        }
    }

    /// Parses the CLI's `--pcr-bank-alg` spelling (`sha1`, `sha256`, ...,
    /// `auto`).
    pub fn parse(name: &str) -> Result<HashAlg> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" => Ok(HashAlg::Sha1),
            "sha256" => Ok(HashAlg::Sha256),
            "sha384" => Ok(HashAlg::Sha384),
            "sha512" => Ok(HashAlg::Sha512),
            "sm3_256" | "sm3-256" => Ok(HashAlg::Sm3_256),
            "null" | "none" => Ok(HashAlg::Null),
            "auto" => Ok(HashAlg::Auto),
            other => Err(Error::InvalidArgument(format!(
                "unknown hash algorithm: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_sizes_match_spec_table() {
        assert_eq!(HashAlg::Sha1.digest_size().unwrap(), 20);
        assert_eq!(HashAlg::Sha256.digest_size().unwrap(), 32);
        assert_eq!(HashAlg::Sha384.digest_size().unwrap(), 48);
        assert_eq!(HashAlg::Sha512.digest_size().unwrap(), 64);
        assert_eq!(HashAlg::Sm3_256.digest_size().unwrap(), 32);
        assert!(HashAlg::Auto.digest_size().is_err());
        assert!(HashAlg::Null.digest_size().is_err());
    }

    #[test]
    fn weight_order_matches_spec() {
        assert!(HashAlg::Sha512.weight() > HashAlg::Sha384.weight());
        assert!(HashAlg::Sha384.weight() > HashAlg::Sm3_256.weight());
        assert!(HashAlg::Sm3_256.weight() > HashAlg::Sha256.weight());
        assert!(HashAlg::Sha256.weight() > HashAlg::Sha1.weight());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(HashAlg::parse("SHA256").unwrap(), HashAlg::Sha256);
        assert_eq!(HashAlg::parse("auto").unwrap(), HashAlg::Auto);
        assert!(HashAlg::parse("bogus").is_err());
    }
}
