//! Content fingerprinting.

use crate::core::error::{Error, Result};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Buffer size for reading files (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Three independent digests of a file's content, hex-encoded lowercase.
///
/// `md5` is the fast digest, `sha1` the medium one, and `sha256` the strong
/// one used as the reputation lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

impl Fingerprint {
    /// Fingerprint a file, reading its whole content in one pass.
    pub fn of_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
        let metadata = file.metadata().map_err(|e| Error::file_read(path, e))?;
        if !metadata.is_file() {
            return Err(Error::NotARegularFile(path.to_path_buf()));
        }

        let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
        Self::of_reader(&mut reader).map_err(|e| Error::file_read(path, e))
    }

    /// Fingerprint an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self {
            md5: hex::encode(Md5::digest(data)),
            sha1: hex::encode(Sha1::digest(data)),
            sha256: hex::encode(Sha256::digest(data)),
        }
    }

    fn of_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut md5_hasher = Md5::new();
        let mut sha1_hasher = Sha1::new();
        let mut sha256_hasher = Sha256::new();
        let mut buffer = [0u8; BUFFER_SIZE];

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let chunk = &buffer[..bytes_read];
            md5_hasher.update(chunk);
            sha1_hasher.update(chunk);
            sha256_hasher.update(chunk);
        }

        Ok(Self {
            md5: hex::encode(md5_hasher.finalize()),
            sha1: hex::encode(sha1_hasher.finalize()),
            sha256: hex::encode(sha256_hasher.finalize()),
        })
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.sha256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_known_vectors() {
        let fp = Fingerprint::of_bytes(b"hello");
        assert_eq!(fp.md5, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(fp.sha1, "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert_eq!(
            fp.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_file_matches_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();

        let from_file = Fingerprint::of_file(file.path()).unwrap();
        assert_eq!(from_file, Fingerprint::of_bytes(b"hello"));
    }

    #[test]
    fn test_deterministic() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0xAB; BUFFER_SIZE * 3 + 17]).unwrap();

        let first = Fingerprint::of_file(file.path()).unwrap();
        let second = Fingerprint::of_file(file.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = Fingerprint::of_file(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_directory_is_rejected() {
        let dir = tempdir().unwrap();
        let err = Fingerprint::of_file(dir.path()).unwrap_err();
        assert!(err.is_recoverable());
    }
}
