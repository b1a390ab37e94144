//! Shipping provider verification
//!
//! Replays every interaction of every `*shipping.json` pact against a running
//! shipping service. An interaction passes when the status matches, expected
//! headers are present and the body is schema-valid for its kind
//! (`ShippingQuote` for 2xx, `ErrorBody` otherwise).

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use odc_model::{ErrorBody, ShippingQuote};
use odc_schema::{Interaction, PactFile, SchemaValidator};
use serde_json::Value;

use crate::config::{join_url, AppConfig};
use crate::contracts::SHIPPING_READY;
use crate::error::VerifyError;
use crate::probe;

/// Outcome of one replayed interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionResult {
    pub description: String,
    /// Empty when the interaction passed
    pub mismatches: Vec<String>,
}

impl InteractionResult {
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Outcome of one pact file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PactVerification {
    pub path: PathBuf,
    pub consumer: String,
    pub results: Vec<InteractionResult>,
}

impl PactVerification {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.results.iter().all(InteractionResult::passed)
    }

    /// Results that did not pass
    pub fn failures(&self) -> impl Iterator<Item = &InteractionResult> {
        self.results.iter().filter(|r| !r.passed())
    }
}

/// Outcome of a provider verification run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReport {
    pub provider_url: String,
    pub pacts: Vec<PactVerification>,
}

impl ProviderReport {
    /// Every interaction of every pact passed
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.pacts.is_empty() && self.pacts.iter().all(PactVerification::passed)
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.passed())
    }

    /// Number of replayed interactions
    #[must_use]
    pub fn interaction_count(&self) -> usize {
        self.pacts.iter().map(|p| p.results.len()).sum()
    }

    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for pact in &self.pacts {
            let _ = writeln!(out, "{} ({}):", pact.path.display(), pact.consumer);
            for result in &pact.results {
                let mark = if result.passed() { "ok" } else { "FAILED" };
                let _ = writeln!(out, "  [{mark}] {}", result.description);
                for mismatch in &result.mismatches {
                    let _ = writeln!(out, "      {mismatch}");
                }
            }
        }
        let _ = write!(
            out,
            "{} interaction(s) against {}: {}",
            self.interaction_count(),
            self.provider_url,
            if self.passed() { "PASSED" } else { "FAILED" }
        );
        out
    }
}

/// Verifies a running shipping service against the pacts in a directory
#[derive(Debug)]
pub struct ShippingProviderVerifier {
    base_url: String,
    pact_dir: PathBuf,
    suffix: String,
    known_states: BTreeSet<String>,
    http: reqwest::Client,
    quote_schema: SchemaValidator,
    error_schema: SchemaValidator,
}

impl ShippingProviderVerifier {
    /// # Errors
    /// `VerifyError::Client` or `VerifyError::Schema`.
    pub fn new(
        base_url: impl Into<String>,
        pact_dir: impl Into<PathBuf>,
        request_timeout: Duration,
    ) -> Result<Self, VerifyError> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            pact_dir: pact_dir.into(),
            suffix: "shipping.json".to_string(),
            known_states: BTreeSet::from([SHIPPING_READY.to_string()]),
            http,
            quote_schema: SchemaValidator::for_type::<ShippingQuote>()?,
            error_schema: SchemaValidator::for_type::<ErrorBody>()?,
        })
    }

    /// # Errors
    /// Same as [`ShippingProviderVerifier::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, VerifyError> {
        Ok(Self::new(
            &config.shipping.provider_url,
            &config.pact_dir,
            Duration::from_millis(config.shipping.request_timeout_ms),
        )?
        .with_suffix(&config.shipping.pact_suffix))
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Accept an additional provider state
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.known_states.insert(state.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn pact_dir(&self) -> &Path {
        &self.pact_dir
    }

    /// Verify every matching pact
    ///
    /// # Errors
    /// - `VerifyError::ProviderUnavailable` if the health check fails
    /// - `VerifyError::NoPacts` if the directory holds no matching pact
    /// - `VerifyError::Contract` if a pact cannot be read
    pub async fn verify(&self) -> Result<ProviderReport, VerifyError> {
        let health_url = join_url(&self.base_url, "/health");
        if !probe::check_health(&self.http, &health_url).await {
            return Err(VerifyError::ProviderUnavailable(self.base_url.clone()));
        }
        tracing::info!("Provider at {} is healthy", self.base_url);

        let pacts = PactFile::read_dir(&self.pact_dir, &self.suffix)?;
        if pacts.is_empty() {
            return Err(VerifyError::NoPacts {
                dir: self.pact_dir.clone(),
                suffix: self.suffix.clone(),
            });
        }

        let mut verifications = Vec::with_capacity(pacts.len());
        for (path, pact) in pacts {
            tracing::info!("Verifying {} from {}", pact.pair(), path.display());
            let mut results = Vec::with_capacity(pact.interactions.len());
            for interaction in &pact.interactions {
                self.set_up_states(interaction);
                results.push(self.replay(interaction).await);
            }
            verifications.push(PactVerification {
                path,
                consumer: pact.consumer.name.clone(),
                results,
            });
        }

        Ok(ProviderReport {
            provider_url: self.base_url.clone(),
            pacts: verifications,
        })
    }

    fn set_up_states(&self, interaction: &Interaction) {
        for state in &interaction.provider_states {
            if self.known_states.contains(&state.name) {
                tracing::info!("Setting up provider state: {}", state.name);
            } else {
                tracing::warn!(
                    "No handler for provider state '{}' of '{}'",
                    state.name,
                    interaction.description
                );
            }
        }
    }

    /// Send one interaction's request and compare the response
    pub async fn replay(&self, interaction: &Interaction) -> InteractionResult {
        let mismatches = match self.send(interaction).await {
            Ok((status, content_type, body)) => self.compare(interaction, status, content_type.as_deref(), &body),
            Err(reason) => vec![reason],
        };

        if mismatches.is_empty() {
            tracing::info!("Verified '{}'", interaction.description);
        } else {
            tracing::error!("'{}' failed: {}", interaction.description, mismatches.join("; "));
        }
        InteractionResult {
            description: interaction.description.clone(),
            mismatches,
        }
    }

    async fn send(&self, interaction: &Interaction) -> Result<(u16, Option<String>, String), String> {
        let request = &interaction.request;
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| format!("unsupported method {}", request.method))?;

        let mut builder = self.http.request(method, join_url(&self.base_url, &request.path));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(match body {
                Value::String(text) if !declares_json(&request.headers) => text.clone(),
                other => other.to_string(),
            });
        }

        let response = builder.send().await.map_err(|e| format!("request failed: {e}"))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.text().await.map_err(|e| format!("cannot read body: {e}"))?;
        Ok((status, content_type, body))
    }

    fn compare(&self, interaction: &Interaction, status: u16, content_type: Option<&str>, body: &str) -> Vec<String> {
        let expected = &interaction.response;
        let mut mismatches = Vec::new();

        if status != expected.status {
            mismatches.push(format!("expected status {} but got {}", expected.status, status));
        }

        let expected_type = expected
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str());
        if let Some(expected_type) = expected_type {
            let matches = content_type.is_some_and(|actual| actual.starts_with(expected_type));
            if !matches {
                mismatches.push(format!(
                    "expected Content-Type {} but got {}",
                    expected_type,
                    content_type.unwrap_or("none")
                ));
            }
        }

        if expected.body.is_none() {
            return mismatches;
        }
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                mismatches.push(format!("body is not JSON ({e}): {body}"));
                return mismatches;
            }
        };
        let schema = if expected.is_success() {
            &self.quote_schema
        } else {
            &self.error_schema
        };
        if let Err(report) = schema.check(&value) {
            mismatches.extend(
                report
                    .errors()
                    .iter()
                    .map(|e| format!("{}: {}", schema.type_name(), e)),
            );
        }
        mismatches
    }
}

fn declares_json(headers: &std::collections::BTreeMap<String, String>) -> bool {
    headers
        .iter()
        .any(|(name, value)| name.eq_ignore_ascii_case("content-type") && value.contains("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::frontend_shipping_pact;
    use odc_schema::{PactRequest, PactResponse, PactWriteMode, Pattern};
    use odc_shipping::ShippingServer;
    use serde_json::json;
    use std::net::SocketAddr;

    fn local() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    fn verifier(url: &str, dir: &Path) -> ShippingProviderVerifier {
        ShippingProviderVerifier::new(url, dir, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn mock_service_satisfies_the_catalog() {
        let dir = tempfile::tempdir().unwrap();
        frontend_shipping_pact().write(dir.path(), PactWriteMode::Overwrite).unwrap();
        let server = ShippingServer::bind(local()).unwrap();

        let report = verifier(&server.url(), dir.path()).verify().await.unwrap();
        assert!(report.passed(), "{}", report.summary());
        assert_eq!(report.interaction_count(), 13);
        assert_eq!(report.exit_code(), 0);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn wrong_status_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        PactFile::new("frontend", "shipping")
            .with_interaction(
                Interaction::new("zero items are rejected")
                    .given("an unknown state")
                    .with_request(PactRequest::post("/getquote").json_body(&Pattern::exact(json!({"numberOfItems": 0}))))
                    .will_respond_with(PactResponse::status(400).json_body(&Pattern::like(json!({"error": "x"})))),
            )
            .write(dir.path(), PactWriteMode::Overwrite)
            .unwrap();
        let server = ShippingServer::bind(local()).unwrap();

        let report = verifier(&server.url(), dir.path()).verify().await.unwrap();
        assert!(!report.passed());
        assert_eq!(report.exit_code(), 1);
        let failure = report.pacts[0].failures().next().unwrap();
        assert!(failure.mismatches[0].contains("expected status 400 but got 200"));
        assert!(failure.mismatches.iter().any(|m| m.starts_with("ErrorBody")));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn missing_pacts_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a pact").unwrap();
        let server = ShippingServer::bind(local()).unwrap();

        let err = verifier(&server.url(), dir.path()).verify().await.unwrap_err();
        assert!(matches!(err, VerifyError::NoPacts { .. }));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn stopped_provider_is_unavailable() {
        let server = ShippingServer::bind(local()).unwrap();
        let url = server.url();
        server.shutdown().await;

        let dir = tempfile::tempdir().unwrap();
        let err = verifier(&url, dir.path()).verify().await.unwrap_err();
        assert!(matches!(err, VerifyError::ProviderUnavailable(u) if u == url));
    }

    #[test]
    fn empty_report_does_not_pass() {
        let report = ProviderReport {
            provider_url: "http://localhost:9001".to_string(),
            pacts: Vec::new(),
        };
        assert!(!report.passed());
    }
}
