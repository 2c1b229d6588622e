// lectern-common/src/fingerprint.rs
// Content addressing: MD5 fingerprints used for change detection and
// download integrity verification.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::error::Result;

/// Fingerprint of an in-memory byte buffer.
pub fn md5_of_bytes(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Fingerprint of a file, streamed so large artifacts are not held in memory.
pub fn md5_of_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn bytes_and_file_fingerprints_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.lua");
        fs::write(&path, b"return 42\n").unwrap();

        assert_eq!(md5_of_file(&path).unwrap(), md5_of_bytes(b"return 42\n"));
    }

    #[test]
    fn known_digest() {
        // md5("abc")
        assert_eq!(md5_of_bytes(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }
}
