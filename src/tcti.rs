//! TCTI binding (C1): selects and names one of three transport backends.
//!
//! Actual initialization of the chosen backend happens inside
//! `tss_esapi::Context::new`, which performs the two-phase size-query/
//! allocate/init dance described in §4.1 internally (including, for the
//! resource-manager daemon, the dynamic library lookup that makes it an
//! optional runtime dependency). This module only resolves *which* backend
//! the environment asks for; [`crate::context::Tpm::connect`] is what turns
//! a [`TctiNameConf`] into a live connection and maps failure to
//! [`Error::BackendUnavailable`].

use tss_esapi::tcti_ldr::{DeviceConfig, NetworkTPMConfig, TabrmdConfig, TctiNameConf};

use crate::error::{Error, Result};

const ENV_VAR: &str = "TSS2_TCTI";
const DEFAULT_BACKEND: &str = "tabrmd";
// /dev/tpm0 per spec §6; DeviceConfig's own default targets the same node.
const SIMULATOR_HOST: &str = "127.0.0.1";
const SIMULATOR_PORT: u16 = 2321;

/// Resolves `TSS2_TCTI` (default: `tabrmd`) to a transport configuration.
/// Does not touch the TPM; an invalid backend name is the only failure mode
/// here, everything else surfaces later as [`Error::BackendUnavailable`].
pub fn resolve() -> Result<TctiNameConf> {
    let backend = std::env::var(ENV_VAR).unwrap_or_else(|_| {
        log::info!("{ENV_VAR} unset, defaulting to {DEFAULT_BACKEND}");
        DEFAULT_BACKEND.to_string()
    });

    match backend.as_str() {
        "tabrmd" => Ok(TctiNameConf::Tabrmd(TabrmdConfig::default())),
        "device" => Ok(TctiNameConf::Device(DeviceConfig::default())),
        "socket" => Ok(TctiNameConf::Mssim(NetworkTPMConfig::new(
            SIMULATOR_HOST,
            SIMULATOR_PORT,
        ))),
        other => {
            log::error!("invalid {ENV_VAR} backend: {other}");
            Err(Error::InvalidArgument(format!(
                "invalid {ENV_VAR} backend: {other}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_is_invalid_argument() {
        std::env::set_var(ENV_VAR, "carrier-pigeon");
        let err = resolve().unwrap_err();
        std::env::remove_var(ENV_VAR);
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
