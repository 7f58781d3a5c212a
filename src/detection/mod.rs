//! Malware classification.
//!
//! Three signals, consulted in a fixed order:
//! - Signature-based detection (exact digest match)
//! - Reputation lookup against an external service
//! - Metadata heuristic (extension, recency, executability)

pub mod classifier;
pub mod heuristic;
pub mod reputation;
pub mod signature;
pub mod store;

pub use classifier::Classifier;
pub use heuristic::{FileTraits, HeuristicEvaluator};
pub use reputation::{client_from_config, DisabledReputation, ReputationClient, VirusTotalClient};
pub use signature::{SignatureEntry, SignatureFile};
pub use store::{DigestKind, SignatureStore};
