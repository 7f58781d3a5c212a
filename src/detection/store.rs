//! Exact-match signature lookup.

use crate::core::config::DetectionConfig;
use crate::core::error::Result;
use crate::detection::signature::{SignatureEntry, SignatureFile};
use crate::utils::hash::Fingerprint;
use std::collections::HashMap;

/// Digest algorithm that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Md5,
    Sha1,
    Sha256,
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestKind::Md5 => write!(f, "MD5"),
            DigestKind::Sha1 => write!(f, "SHA1"),
            DigestKind::Sha256 => write!(f, "SHA256"),
        }
    }
}

/// Immutable set of known-bad fingerprints.
///
/// A match on any single digest algorithm counts as a match for the whole
/// fingerprint. Safe for concurrent readers once built.
#[derive(Debug, Default)]
pub struct SignatureStore {
    entries: Vec<SignatureEntry>,
    by_md5: HashMap<String, usize>,
    by_sha1: HashMap<String, usize>,
    by_sha256: HashMap<String, usize>,
}

impl SignatureStore {
    /// Build a store from entries. Entries without any digest are dropped.
    pub fn new(entries: impl IntoIterator<Item = SignatureEntry>) -> Self {
        let mut store = Self::default();

        for entry in entries.into_iter().map(SignatureEntry::normalized) {
            if !entry.has_digest() {
                log::warn!("Ignoring signature {} without any digest", entry.id);
                continue;
            }

            let index = store.entries.len();
            if let Some(md5) = &entry.md5 {
                store.by_md5.entry(md5.clone()).or_insert(index);
            }
            if let Some(sha1) = &entry.sha1 {
                store.by_sha1.entry(sha1.clone()).or_insert(index);
            }
            if let Some(sha256) = &entry.sha256 {
                store.by_sha256.entry(sha256.clone()).or_insert(index);
            }
            store.entries.push(entry);
        }

        store
    }

    /// Build the store described by the detection configuration: the EICAR
    /// test signature (unless disabled) plus the optional signature file.
    pub fn from_config(config: &DetectionConfig) -> Result<Self> {
        let mut entries = Vec::new();

        if config.include_test_signature {
            entries.push(SignatureEntry::eicar());
        }

        if let Some(path) = &config.signature_file {
            let file = SignatureFile::load(path)?;
            log::info!(
                "Loaded {} signature(s) from {:?} (version {})",
                file.signatures.len(),
                path,
                file.version
            );
            entries.extend(file.signatures);
        }

        Ok(Self::new(entries))
    }

    /// Whether the fingerprint matches any held signature.
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        self.find(fingerprint).is_some()
    }

    /// Find the matching signature and the digest that matched.
    ///
    /// The strong digest is consulted first so the reported algorithm is the
    /// most trustworthy one available.
    pub fn find(&self, fingerprint: &Fingerprint) -> Option<(&SignatureEntry, DigestKind)> {
        let hit = self
            .by_sha256
            .get(&fingerprint.sha256.to_ascii_lowercase())
            .map(|&i| (i, DigestKind::Sha256))
            .or_else(|| {
                self.by_sha1
                    .get(&fingerprint.sha1.to_ascii_lowercase())
                    .map(|&i| (i, DigestKind::Sha1))
            })
            .or_else(|| {
                self.by_md5
                    .get(&fingerprint.md5.to_ascii_lowercase())
                    .map(|&i| (i, DigestKind::Md5))
            });

        hit.map(|(index, kind)| (&self.entries[index], kind))
    }

    /// Number of signatures held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All held signatures.
    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }
}
