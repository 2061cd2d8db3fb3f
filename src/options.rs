//! Process-wide holder for caller-supplied authorization values (C10).
//!
//! Four named slots plus the `interactive` and `no_da` flags. The store is
//! initialized empty at process start and is never persisted; the CLI writes
//! it once from parsed flags before calling into the public API.

use zeroize::Zeroizing;

use crate::algorithm::MAX_AUTH_SIZE;
use crate::error::AuthSlot;

#[derive(Debug, Default)]
struct Secret {
    bytes: Zeroizing<[u8; MAX_AUTH_SIZE]>,
    len: usize,
}

impl Secret {
    fn set(&mut self, value: &[u8]) {
        let len = value.len().min(MAX_AUTH_SIZE);
        self.bytes.iter_mut().for_each(|b| *b = 0);
        self.bytes[..len].copy_from_slice(&value[..len]);
        self.len = len;
    }

    fn get(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// The process-wide secret store (C10). Owned by [`crate::api`]; one instance
/// per process lifetime.
#[derive(Debug, Default)]
pub struct OptionStore {
    owner: Secret,
    lockout: Secret,
    primary_key: Secret,
    passphrase: Secret,
    interactive: bool,
    no_da: bool,
}

impl OptionStore {
    pub fn new() -> OptionStore {
        OptionStore::default()
    }

    pub fn set_owner_auth(&mut self, value: &[u8]) {
        self.owner.set(value);
    }

    pub fn owner_auth(&self) -> &[u8] {
        self.owner.get()
    }

    pub fn set_lockout_auth(&mut self, value: &[u8]) {
        self.lockout.set(value);
    }

    pub fn lockout_auth(&self) -> &[u8] {
        self.lockout.get()
    }

    pub fn set_primary_key_secret(&mut self, value: &[u8]) {
        self.primary_key.set(value);
    }

    pub fn primary_key_secret(&self) -> &[u8] {
        self.primary_key.get()
    }

    pub fn set_passphrase_secret(&mut self, value: &[u8]) {
        self.passphrase.set(value);
    }

    pub fn passphrase_secret(&self) -> &[u8] {
        self.passphrase.get()
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn set_no_da(&mut self, no_da: bool) {
        self.no_da = no_da;
    }

    pub fn no_da(&self) -> bool {
        self.no_da
    }

    pub fn slot(&self, slot: AuthSlot) -> &[u8] {
        match slot {
            AuthSlot::Owner => self.owner_auth(),
            AuthSlot::Lockout => self.lockout_auth(),
            AuthSlot::PrimaryKey => self.primary_key_secret(),
            AuthSlot::Passphrase => self.passphrase_secret(),
        }
    }

    pub fn set_slot(&mut self, slot: AuthSlot, value: &[u8]) {
        match slot {
            AuthSlot::Owner => self.set_owner_auth(value),
            AuthSlot::Lockout => self.set_lockout_auth(value),
            AuthSlot::PrimaryKey => self.set_primary_key_secret(value),
            AuthSlot::Passphrase => self.set_passphrase_secret(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_slot_is_empty_not_absent() {
        let store = OptionStore::new();
        assert_eq!(store.owner_auth(), b"");
    }

    #[test]
    fn long_secret_is_clamped_to_64_bytes() {
        let mut store = OptionStore::new();
        let long = vec![b'x'; 100];
        store.set_passphrase_secret(&long);
        assert_eq!(store.passphrase_secret().len(), MAX_AUTH_SIZE);
        assert!(store.passphrase_secret().iter().all(|&b| b == b'x'));
    }

    #[test]
    fn short_secret_round_trips_exactly() {
        let mut store = OptionStore::new();
        store.set_owner_auth(b"hunter2");
        assert_eq!(store.owner_auth(), b"hunter2");
    }

    #[test]
    fn re_set_overwrites_previous_length() {
        let mut store = OptionStore::new();
        store.set_lockout_auth(b"0123456789");
        store.set_lockout_auth(b"ab");
        assert_eq!(store.lockout_auth(), b"ab");
    }
}
