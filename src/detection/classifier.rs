//! Three-tier classification: signatures, then reputation, then heuristics.

use crate::core::error::Result;
use crate::core::types::{FileObservation, ReputationVerdict, SuspicionReason, Verdict};
use crate::detection::heuristic::{FileTraits, HeuristicEvaluator};
use crate::detection::reputation::{DisabledReputation, ReputationClient};
use crate::detection::store::SignatureStore;
use crate::utils::hash::Fingerprint;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound on a reputation lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Combines the three signals into one verdict.
///
/// Tier order is fixed. A signature hit short-circuits before any network
/// call; a reputation `Unknown` or `Clean` falls through to the heuristic.
pub struct Classifier {
    signatures: Arc<SignatureStore>,
    reputation: Arc<dyn ReputationClient>,
    heuristic: HeuristicEvaluator,
    lookup_timeout: Duration,
}

impl Classifier {
    /// Create a classifier with the reputation tier disabled.
    pub fn new(signatures: Arc<SignatureStore>, heuristic: HeuristicEvaluator) -> Self {
        Self {
            signatures,
            reputation: Arc::new(DisabledReputation),
            heuristic,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Use the given reputation client.
    pub fn with_reputation(mut self, reputation: Arc<dyn ReputationClient>) -> Self {
        self.reputation = reputation;
        self
    }

    /// Bound each reputation lookup; an elapsed timeout reads as `Unknown`.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// The signature store in use.
    pub fn signatures(&self) -> &SignatureStore {
        &self.signatures
    }

    /// Fingerprint a file and gather its metadata.
    ///
    /// Fails with a read error when the content cannot be read; in that case
    /// the file must not be classified at all.
    pub fn observe(&self, path: &Path) -> Result<FileObservation> {
        let fingerprint = Fingerprint::of_file(path)?;
        Ok(FileObservation {
            path: path.to_path_buf(),
            fingerprint,
            traits: FileTraits::read(path),
        })
    }

    /// Fingerprint and classify one file.
    pub async fn classify(&self, path: &Path) -> Result<Verdict> {
        let observation = self.observe(path)?;
        Ok(self.classify_observation(&observation).await)
    }

    /// Classify an already gathered observation.
    pub async fn classify_observation(&self, observation: &FileObservation) -> Verdict {
        let fingerprint = &observation.fingerprint;

        if let Some((signature, digest)) = self.signatures.find(fingerprint) {
            log::debug!(
                "{:?} matches signature {} ({}) on {}",
                observation.path,
                signature.id,
                signature.name,
                digest
            );
            return Verdict::Suspicious(SuspicionReason::SignatureMatch);
        }

        match self.lookup(fingerprint).await {
            ReputationVerdict::Malicious => {
                return Verdict::Suspicious(SuspicionReason::ReputationFlag);
            }
            ReputationVerdict::Clean | ReputationVerdict::Unknown => {}
        }

        if self.heuristic.suspicious(&observation.traits) {
            log::debug!("{:?} flagged by heuristics", observation.path);
            return Verdict::Suspicious(SuspicionReason::HeuristicFlag);
        }

        Verdict::Clean
    }

    async fn lookup(&self, fingerprint: &Fingerprint) -> ReputationVerdict {
        match tokio::time::timeout(self.lookup_timeout, self.reputation.lookup(fingerprint)).await
        {
            Ok(verdict) => verdict,
            Err(_) => {
                log::warn!(
                    "Reputation lookup via {} timed out after {:?} for {}",
                    self.reputation.name(),
                    self.lookup_timeout,
                    fingerprint
                );
                ReputationVerdict::Unknown
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detection::signature::{SignatureEntry, EICAR_STRING};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;
    use tempfile::tempdir;

    /// Reputation double returning a fixed answer and counting calls.
    pub(crate) struct FixedReputation {
        pub verdict: ReputationVerdict,
        pub calls: AtomicUsize,
        pub delay: Option<Duration>,
    }

    impl FixedReputation {
        pub(crate) fn new(verdict: ReputationVerdict) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                calls: AtomicUsize::new(0),
                delay: None,
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReputationClient for FixedReputation {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn lookup(&self, _fingerprint: &Fingerprint) -> ReputationVerdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.verdict
        }
    }

    fn classifier(reputation: Arc<dyn ReputationClient>) -> Classifier {
        Classifier::new(
            Arc::new(SignatureStore::new([SignatureEntry::eicar()])),
            HeuristicEvaluator::default(),
        )
        .with_reputation(reputation)
    }

    fn observation(content: &[u8], traits: FileTraits) -> FileObservation {
        FileObservation {
            path: "/virtual/file".into(),
            fingerprint: Fingerprint::of_bytes(content),
            traits,
        }
    }

    fn risky_traits() -> FileTraits {
        FileTraits {
            extension: Some("exe".to_string()),
            created: Some(SystemTime::now()),
            executable: Some(true),
            size: Some(1),
        }
    }

    #[tokio::test]
    async fn test_signature_short_circuits_reputation() {
        let reputation = FixedReputation::new(ReputationVerdict::Clean);
        let classifier = classifier(reputation.clone());

        let verdict = classifier
            .classify_observation(&observation(EICAR_STRING.as_bytes(), FileTraits::default()))
            .await;

        assert_eq!(verdict, Verdict::Suspicious(SuspicionReason::SignatureMatch));
        assert_eq!(reputation.calls(), 0);
    }

    #[tokio::test]
    async fn test_signature_wins_over_other_tiers() {
        let reputation = FixedReputation::new(ReputationVerdict::Malicious);
        let classifier = classifier(reputation);

        let verdict = classifier
            .classify_observation(&observation(EICAR_STRING.as_bytes(), risky_traits()))
            .await;
        assert_eq!(verdict, Verdict::Suspicious(SuspicionReason::SignatureMatch));
    }

    #[tokio::test]
    async fn test_reputation_flag() {
        let reputation = FixedReputation::new(ReputationVerdict::Malicious);
        let classifier = classifier(reputation.clone());

        let verdict = classifier
            .classify_observation(&observation(b"unknown binary", risky_traits()))
            .await;
        assert_eq!(verdict, Verdict::Suspicious(SuspicionReason::ReputationFlag));
        assert_eq!(reputation.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_falls_through_to_heuristic() {
        let classifier = classifier(FixedReputation::new(ReputationVerdict::Unknown));

        let flagged = classifier
            .classify_observation(&observation(b"dropper", risky_traits()))
            .await;
        assert_eq!(flagged, Verdict::Suspicious(SuspicionReason::HeuristicFlag));

        let clean = classifier
            .classify_observation(&observation(b"notes", FileTraits::default()))
            .await;
        assert_eq!(clean, Verdict::Clean);
    }

    #[tokio::test]
    async fn test_transport_failure_matches_unknown() {
        use crate::detection::reputation::VirusTotalClient;

        let failing = VirusTotalClient::new("key", "http://127.0.0.1:1", Duration::from_secs(2))
            .unwrap();
        let failing = classifier(Arc::new(failing));
        let unknown = classifier(FixedReputation::new(ReputationVerdict::Unknown));

        for traits in [risky_traits(), FileTraits::default()] {
            let obs = observation(b"some content", traits);
            assert_eq!(
                failing.classify_observation(&obs).await,
                unknown.classify_observation(&obs).await
            );
        }
    }

    #[tokio::test]
    async fn test_slow_lookup_times_out_as_unknown() {
        let slow = Arc::new(FixedReputation {
            verdict: ReputationVerdict::Malicious,
            calls: AtomicUsize::new(0),
            delay: Some(Duration::from_secs(30)),
        });
        let classifier =
            classifier(slow.clone()).with_lookup_timeout(Duration::from_millis(50));

        let verdict = classifier
            .classify_observation(&observation(b"slow", FileTraits::default()))
            .await;
        assert_eq!(verdict, Verdict::Clean);
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test]
    async fn test_classify_unreadable_path_is_error() {
        let dir = tempdir().unwrap();
        let classifier = classifier(FixedReputation::new(ReputationVerdict::Clean));
        assert!(classifier
            .classify(&dir.path().join("missing.bin"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_classify_file_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eicar.com");
        std::fs::write(&path, EICAR_STRING).unwrap();

        let classifier = classifier(FixedReputation::new(ReputationVerdict::Clean));
        assert_eq!(
            classifier.classify(&path).await.unwrap(),
            Verdict::Suspicious(SuspicionReason::SignatureMatch)
        );
    }
}
