//! SHA-256 digests of files, used as VirusTotal report keys

use crate::error::{Result, ResultExt};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 8 * 1024;

/// Hex-encoded SHA-256 of a file's contents, read in 8 KiB chunks
pub fn sha256_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(crate::error::Error::from)
        .context(format!("Opening {} for hashing", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hex-encoded SHA-256 of a byte slice
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_sha256_bytes() {
        assert_eq!(sha256_bytes(b""), EMPTY_SHA256);
        assert_eq!(
            sha256_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_file_matches_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // Larger than one buffer so the chunk loop runs several times
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();

        assert_eq!(sha256_file(file.path()).unwrap(), sha256_bytes(&data));
    }

    #[test]
    fn test_sha256_missing_file() {
        let err = sha256_file("/definitely/not/here.bin").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::FileNotFound);
        assert!(err.context.is_some());
    }
}
