//! Hash command wrapper (C4). `digest_size` itself lives on
//! [`crate::algorithm::HashAlg`] since every component needs it without a
//! TPM round-trip; this module only wraps the actual `Hash` command.

use tss_esapi::interface_types::resource_handles::Hierarchy;
use tss_esapi::structures::{Digest, MaxBuffer};
use tss_esapi::Context;

use crate::algorithm::HashAlg;
use crate::error::{Error, Result};

/// Submits `data` to the TPM's `Hash` command under `alg`. The hierarchy is
/// `Null`, matching the original's use of hashing purely as a digest
/// primitive with no ticket consumer.
pub fn digest(ctx: &mut Context, data: &[u8], alg: HashAlg) -> Result<Digest> {
    let buffer = MaxBuffer::try_from(data.to_vec()).map_err(|e| Error::tpm("MaxBuffer", e))?;
    let hashing_algorithm = alg.to_hashing_algorithm()?;
    let (out, _ticket) = ctx
        .hash(buffer, hashing_algorithm, Hierarchy::Null)
        .map_err(|e| Error::tpm("Hash", e))?;
    Ok(out)
}
