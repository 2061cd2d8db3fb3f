//! File I/O helpers for `--passphrase <path-or-literal>` and `--output
//! <file>` (§6), out of scope for the core library.

use std::fs;
use std::path::Path;

use cryptfs_tpm2::error::Result;

/// If `value` names an existing file, returns its raw contents (truncated to
/// 64 bytes); otherwise returns `value`'s bytes verbatim as the literal
/// payload.
pub fn read_passphrase_arg(value: &str) -> Result<Vec<u8>> {
    let path = Path::new(value);
    if path.is_file() {
        let mut bytes = fs::read(path)?;
        bytes.truncate(64);
        Ok(bytes)
    } else {
        Ok(value.as_bytes().to_vec())
    }
}

/// Writes the unsealed bytes verbatim, no trailing newline.
pub fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_value_passes_through_when_not_a_file() {
        let bytes = read_passphrase_arg("hunter2").unwrap();
        assert_eq!(bytes, b"hunter2");
    }

    #[test]
    fn existing_file_contents_are_read_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passphrase");
        fs::write(&path, vec![b'x'; 100]).unwrap();

        let bytes = read_passphrase_arg(path.to_str().unwrap()).unwrap();
        assert_eq!(bytes.len(), 64);
        assert!(bytes.iter().all(|&b| b == b'x'));
    }

    #[test]
    fn write_output_round_trips_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_output(path.to_str().unwrap(), b"hunter2").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hunter2");
    }
}
