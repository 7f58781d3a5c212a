//! External reputation lookups.
//!
//! The reputation tier asks an outside service whether a strong digest is
//! known to be malicious. The service is an unreliable dependency: every
//! failure (no key, transport error, non-success status, unexpected payload)
//! is reported as [`ReputationVerdict::Unknown`], never as an error and never
//! as malicious.

use crate::core::config::ReputationConfig;
use crate::core::types::ReputationVerdict;
use crate::utils::hash::Fingerprint;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Lookup contract for a reputation service keyed by fingerprint.
#[async_trait]
pub trait ReputationClient: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Look up a fingerprint. Must not fail: problems map to `Unknown`.
    async fn lookup(&self, fingerprint: &Fingerprint) -> ReputationVerdict;
}

/// Build the client described by the configuration.
///
/// Without an API key the tier is disabled and no network call is ever made.
pub fn client_from_config(config: &ReputationConfig) -> Arc<dyn ReputationClient> {
    match config.api_key.as_deref().filter(|_| config.is_enabled()) {
        Some(key) => match VirusTotalClient::new(key, &config.base_url, config.timeout()) {
            Ok(client) => {
                log::info!("Reputation lookups enabled ({})", config.base_url);
                Arc::new(client)
            }
            Err(e) => {
                log::warn!("Reputation lookups disabled: {}", e);
                Arc::new(DisabledReputation)
            }
        },
        None => {
            log::info!("No reputation API key configured; reputation tier disabled");
            Arc::new(DisabledReputation)
        }
    }
}

impl ReputationConfig {
    /// Lookup timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Stand-in used when no credential is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledReputation;

#[async_trait]
impl ReputationClient for DisabledReputation {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn lookup(&self, _fingerprint: &Fingerprint) -> ReputationVerdict {
        ReputationVerdict::Unknown
    }
}

/// Why a lookup produced no usable answer. Always folded into `Unknown`.
#[derive(Debug, Error)]
pub(crate) enum LookupError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("hash not known to the service")]
    NotFound,

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected payload: {0}")]
    Payload(String),
}

/// VirusTotal v3 file-report client.
pub struct VirusTotalClient {
    api_key: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl VirusTotalClient {
    /// Create a client with the given key, base URL and request timeout.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key: SecretString::from(api_key.to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn report_url(&self, sha256: &str) -> String {
        format!("{}/files/{}", self.base_url, sha256)
    }

    async fn fetch(&self, sha256: &str) -> Result<ReputationVerdict, LookupError> {
        let response = self
            .client
            .get(self.report_url(sha256))
            .header("x-apikey", self.api_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let body: serde_json::Value = response.json().await?;
        parse_report(&body)
    }
}

/// Interpret a file report: any malicious engine verdict means malicious.
pub(crate) fn parse_report(body: &serde_json::Value) -> Result<ReputationVerdict, LookupError> {
    let stats = body
        .get("data")
        .and_then(|d| d.get("attributes"))
        .and_then(|a| a.get("last_analysis_stats"))
        .ok_or_else(|| LookupError::Payload("missing last_analysis_stats".to_string()))?;

    if !stats.is_object() {
        return Err(LookupError::Payload(
            "last_analysis_stats is not an object".to_string(),
        ));
    }

    // Absent means no engine flagged it; present but not a count is unusable.
    let malicious = match stats.get("malicious") {
        None => 0,
        Some(value) => value.as_u64().ok_or_else(|| {
            LookupError::Payload(format!("malicious count is not a count: {}", value))
        })?,
    };
    if malicious > 0 {
        Ok(ReputationVerdict::Malicious)
    } else {
        Ok(ReputationVerdict::Clean)
    }
}

#[async_trait]
impl ReputationClient for VirusTotalClient {
    fn name(&self) -> &str {
        "virustotal"
    }

    async fn lookup(&self, fingerprint: &Fingerprint) -> ReputationVerdict {
        match self.fetch(&fingerprint.sha256).await {
            Ok(verdict) => {
                log::debug!("Reputation for {}: {:?}", fingerprint, verdict);
                verdict
            }
            Err(LookupError::NotFound) => {
                log::debug!("Reputation service has no record of {}", fingerprint);
                ReputationVerdict::Unknown
            }
            Err(e) => {
                log::warn!("Reputation lookup failed for {}: {}", fingerprint, e);
                ReputationVerdict::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_malicious() {
        let body = json!({
            "data": { "attributes": { "last_analysis_stats": {
                "malicious": 12, "suspicious": 1, "undetected": 50
            }}}
        });
        assert_eq!(parse_report(&body).unwrap(), ReputationVerdict::Malicious);
    }

    #[test]
    fn test_parse_clean_and_absent_count() {
        let zero = json!({
            "data": { "attributes": { "last_analysis_stats": { "malicious": 0 }}}
        });
        assert_eq!(parse_report(&zero).unwrap(), ReputationVerdict::Clean);

        let absent = json!({
            "data": { "attributes": { "last_analysis_stats": { "harmless": 70 }}}
        });
        assert_eq!(parse_report(&absent).unwrap(), ReputationVerdict::Clean);
    }

    #[test]
    fn test_parse_unexpected_shape() {
        assert!(parse_report(&json!({ "error": { "code": "NotFoundError" } })).is_err());
        assert!(parse_report(&json!({
            "data": { "attributes": { "last_analysis_stats": [1, 2] }}
        }))
        .is_err());

        for count in [json!("7"), json!(null), json!(-1), json!(1.5)] {
            let body = json!({
                "data": { "attributes": { "last_analysis_stats": { "malicious": count }}}
            });
            assert!(
                matches!(parse_report(&body), Err(LookupError::Payload(_))),
                "count {} should be rejected",
                body
            );
        }
    }

    #[tokio::test]
    async fn test_disabled_is_unknown() {
        let fp = Fingerprint::of_bytes(b"anything");
        assert_eq!(
            DisabledReputation.lookup(&fp).await,
            ReputationVerdict::Unknown
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_unknown() {
        // Nothing listens on port 1 of the loopback interface.
        let client =
            VirusTotalClient::new("key", "http://127.0.0.1:1/api/v3", Duration::from_secs(2))
                .unwrap();
        let fp = Fingerprint::of_bytes(b"anything");
        assert_eq!(client.lookup(&fp).await, ReputationVerdict::Unknown);
    }

    #[test]
    fn test_report_url() {
        let client =
            VirusTotalClient::new("key", "https://example.test/api/v3/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.report_url("abc"),
            "https://example.test/api/v3/files/abc"
        );
    }

    #[test]
    fn test_client_from_config_without_key() {
        let client = client_from_config(&ReputationConfig::default());
        assert_eq!(client.name(), "disabled");

        let mut config = ReputationConfig::default();
        config.api_key = Some("  ".to_string());
        assert_eq!(client_from_config(&config).name(), "disabled");
    }
}
