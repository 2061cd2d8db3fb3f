//! Terminal echo-off secret prompting, out of scope for the core library
//! (§1) but needed by every CLI invocation that passes `--interactive`.

use cryptfs_tpm2::error::{AuthSlot, Error, Result};
use cryptfs_tpm2::prompt::SecretPrompter;

pub struct Terminal;

impl SecretPrompter for Terminal {
    fn prompt(&mut self, slot: AuthSlot) -> Result<Vec<u8>> {
        let value = rpassword::prompt_password(format!("Enter {slot} authorization: "))
            .map_err(Error::Io)?;
        Ok(value.into_bytes())
    }
}
