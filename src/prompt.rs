//! The interactive secret prompt is an external collaborator (§1): the core
//! only needs to ask "give me bytes for this slot" and get an answer or a
//! refusal back. The terminal echo-off reader that actually implements this
//! lives in `cli::prompt`, outside the library surface.

use crate::error::{AuthSlot, Error, Result};

pub trait SecretPrompter {
    /// Returns the bytes the user typed for `slot`, or an error if the
    /// prompt itself failed (not if the value later turns out to be wrong —
    /// that's a retry decision made by the caller).
    fn prompt(&mut self, slot: AuthSlot) -> Result<Vec<u8>>;
}

/// Used whenever `--interactive` was not requested. Every prompt fails
/// immediately with the slot's `AuthRequired`, matching the non-interactive
/// branch of §4.9 step 7.
pub struct NonInteractive;

impl SecretPrompter for NonInteractive {
    fn prompt(&mut self, slot: AuthSlot) -> Result<Vec<u8>> {
        Err(Error::AuthRequired { hierarchy: slot })
    }
}
