//! Signature entries and the on-disk signature file format.

use crate::core::error::{Error, Result};
use crate::utils::hash::Fingerprint;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// EICAR test file standard string.
/// This is the industry-standard test file for antivirus software.
pub const EICAR_STRING: &str =
    "X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

/// EICAR test file MD5 hash.
const EICAR_MD5: &str = "44d88612fea8a8f36de82e1278abb02f";

/// EICAR test file SHA1 hash.
const EICAR_SHA1: &str = "3395856ce81f2b7382dee72602f798b642f14140";

/// EICAR test file SHA256 hash.
const EICAR_SHA256: &str = "275a021bbfb6489e54d471899f7db9d1663fc695ec2fe2a2c4538aabf651fd0f";

/// A named reference fingerprint for one known-bad artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    /// Unique identifier (e.g., "MAL-00001")
    pub id: String,
    /// Human-readable name (e.g., "Trojan.GenericKD")
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl SignatureEntry {
    /// Create an entry carrying all three digests of a reference fingerprint.
    pub fn from_fingerprint(
        id: impl Into<String>,
        name: impl Into<String>,
        fingerprint: &Fingerprint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            md5: Some(fingerprint.md5.clone()),
            sha1: Some(fingerprint.sha1.clone()),
            sha256: Some(fingerprint.sha256.clone()),
        }
    }

    /// The EICAR test signature.
    pub fn eicar() -> Self {
        Self {
            id: "EICAR-TEST".to_string(),
            name: "EICAR-Test-File".to_string(),
            md5: Some(EICAR_MD5.to_string()),
            sha1: Some(EICAR_SHA1.to_string()),
            sha256: Some(EICAR_SHA256.to_string()),
        }
    }

    /// Lowercase and trim all digests; empty strings become `None`.
    pub fn normalized(mut self) -> Self {
        fn norm(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_ascii_lowercase())
                .filter(|v| !v.is_empty())
        }
        self.md5 = norm(self.md5);
        self.sha1 = norm(self.sha1);
        self.sha256 = norm(self.sha256);
        self
    }

    /// Whether the entry carries at least one digest.
    pub fn has_digest(&self) -> bool {
        self.md5.is_some() || self.sha1.is_some() || self.sha256.is_some()
    }
}

/// Signature database file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureFile {
    /// Database version (e.g., "2025.01.15")
    pub version: String,
    /// List of signatures
    pub signatures: Vec<SignatureEntry>,
}

impl SignatureFile {
    /// Load signatures from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::SignatureLoad(format!("Failed to parse signature file {:?}: {}", path, e))
        })
    }

    /// Save signatures to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_eicar_digests_match_string() {
        let fp = Fingerprint::of_bytes(EICAR_STRING.as_bytes());
        let sig = SignatureEntry::eicar();
        assert_eq!(sig.md5.as_deref(), Some(fp.md5.as_str()));
        assert_eq!(sig.sha1.as_deref(), Some(fp.sha1.as_str()));
        assert_eq!(sig.sha256.as_deref(), Some(fp.sha256.as_str()));
    }

    #[test]
    fn test_normalization() {
        let sig = SignatureEntry {
            id: "T-1".to_string(),
            name: "Test".to_string(),
            md5: Some("  ABCDEF ".to_string()),
            sha1: Some(String::new()),
            sha256: None,
        }
        .normalized();

        assert_eq!(sig.md5.as_deref(), Some("abcdef"));
        assert_eq!(sig.sha1, None);
        assert!(sig.has_digest());
    }

    #[test]
    fn test_signature_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sigs.json");
        std::fs::write(
            &path,
            r#"{
                "version": "2025.01.15",
                "signatures": [
                    { "id": "MAL-00001", "name": "Trojan.Generic", "sha256": "a1b2c3" }
                ]
            }"#,
        )
        .unwrap();

        let file = SignatureFile::load(&path).unwrap();
        assert_eq!(file.signatures.len(), 1);
        assert_eq!(file.signatures[0].md5, None);
    }

    #[test]
    fn test_signature_file_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[]").unwrap();

        assert!(matches!(
            SignatureFile::load(&path),
            Err(Error::SignatureLoad(_))
        ));
    }
}
