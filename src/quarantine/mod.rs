//! Quarantine storage.
//!
//! Moving a file into the vault removes it from its original location without
//! deleting it; the stored name encodes when it was moved and what it was
//! called.

pub mod vault;

pub use vault::{QuarantineRecord, QuarantineVault};
