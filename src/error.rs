//! Error taxonomy shared by every component.
//!
//! Leaf components return `Result<T>`; retry logic in [`crate::object`] and
//! [`crate::da`] recovers locally from [`Error::Lockout`] and
//! [`Error::BadAuth`], everything else propagates to the CLI unchanged. No
//! variant swallows the underlying TPM response code.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Which authorization slot a [`Error::BadAuth`] or [`Error::AuthRequired`]
/// refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSlot {
    Owner,
    Lockout,
    PrimaryKey,
    Passphrase,
}

impl fmt::Display for AuthSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthSlot::Owner => "owner hierarchy",
            AuthSlot::Lockout => "lockout hierarchy",
            AuthSlot::PrimaryKey => "primary key",
            AuthSlot::Passphrase => "passphrase",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("TCTI backend unavailable")]
    BackendUnavailable,

    #[error("TPM command failed ({layer}): {code}")]
    Tpm {
        layer: &'static str,
        code: tss_esapi::Error,
    },

    #[error("{hierarchy} authorization required but not available")]
    AuthRequired { hierarchy: AuthSlot },

    #[error("TPM rejected the authorization value for {slot}")]
    BadAuth { slot: AuthSlot },

    #[error("TPM is in dictionary-attack lockout and could not be reset")]
    Lockout,

    #[error("requested hash algorithm is not supported by this TPM")]
    UnsupportedAlgorithm,

    #[error("requested PCR bank is not supported by this TPM")]
    UnsupportedPcr,

    #[error("persistent handle is already occupied")]
    ObjectAlreadyPersistent,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn tpm(layer: &'static str, code: tss_esapi::Error) -> Error {
        Error::Tpm { layer, code }
    }
}
