//! Retry state machine (§4.7, §9): `Submit -> classify -> {Done,
//! PromptAuth(slot) -> Submit, ResetLockout -> Submit, Fail}` with a capped
//! transition count, replacing the original's goto-based retry blocks.

use tss_esapi::constants::response_code::{FormatOneResponseCode, FormatZeroResponseCode};
use tss_esapi::constants::tss::{TPM2_RC_AUTH_FAIL, TPM2_RC_BAD_AUTH, TPM2_RC_LOCKOUT};
use tss_esapi::constants::Tss2ResponseCode;
use tss_esapi::Context;

use crate::da;
use crate::error::{AuthSlot, Error, Result};
use crate::options::OptionStore;
use crate::prompt::SecretPrompter;

/// Bounds the number of lockout-reset + bad-auth-reprompt round trips a
/// single operation will attempt before giving up.
const MAX_TRANSITIONS: u32 = 4;

enum Classification {
    Fatal,
    Lockout,
    BadAuth,
}

fn classify(err: &tss_esapi::Error) -> Classification {
    match err {
        tss_esapi::Error::Tss2Error(Tss2ResponseCode::FormatZero(FormatZeroResponseCode(code)))
            if *code == TPM2_RC_LOCKOUT =>
        {
            Classification::Lockout
        }
        tss_esapi::Error::Tss2Error(Tss2ResponseCode::FormatOne(FormatOneResponseCode(code)))
            if *code == TPM2_RC_BAD_AUTH as u16 || *code == TPM2_RC_AUTH_FAIL as u16 =>
        {
            Classification::BadAuth
        }
        _ => Classification::Fatal,
    }
}

/// Submits `attempt` and recovers locally from lockout (via [`da::reset`])
/// and from bad auth (via `prompter`, storing the new value in `options`
/// under `slot` before retrying). Any other error, or exhausting
/// [`MAX_TRANSITIONS`], is fatal.
pub fn submit<T>(
    ctx: &mut Context,
    options: &mut OptionStore,
    prompter: &mut dyn SecretPrompter,
    slot: AuthSlot,
    mut attempt: impl FnMut(&mut Context, &OptionStore) -> Result<T>,
) -> Result<T> {
    for _ in 0..MAX_TRANSITIONS {
        match attempt(ctx, options) {
            Ok(value) => return Ok(value),
            Err(Error::Tpm { code, .. }) => match classify(&code) {
                Classification::Lockout => {
                    da::reset(ctx, options, prompter)?;
                }
                Classification::BadAuth => {
                    let value = prompter.prompt(slot)?;
                    options.set_slot(slot, &value);
                }
                Classification::Fatal => return Err(Error::tpm("Submit", code)),
            },
            Err(other) => return Err(other),
        }
    }
    Err(Error::BadAuth { slot })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_auth_code_classifies_as_bad_auth() {
        let err = tss_esapi::Error::Tss2Error(Tss2ResponseCode::FormatOne(FormatOneResponseCode(
            TPM2_RC_BAD_AUTH as u16,
        )));
        assert!(matches!(classify(&err), Classification::BadAuth));
    }

    #[test]
    fn lockout_code_classifies_as_lockout() {
        let err = tss_esapi::Error::Tss2Error(Tss2ResponseCode::FormatZero(FormatZeroResponseCode(
            TPM2_RC_LOCKOUT,
        )));
        assert!(matches!(classify(&err), Classification::Lockout));
    }

    #[test]
    fn unrelated_code_is_fatal() {
        let err = tss_esapi::Error::Tss2Error(Tss2ResponseCode::FormatOne(FormatOneResponseCode(0x001)));
        assert!(matches!(classify(&err), Classification::Fatal));
    }
}
