//! Translation gateway over an external machine-translation service.
//!
//! The gateway never raises a hard failure to its caller: every outcome is
//! a tagged [`Translation`] value, so callers branch on the tag instead of
//! comparing output to input. Success and failure counters live in an
//! injected [`TranslationStats`] handle.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::TranslationConfig;
use crate::error::{AppError, AppResult};
use crate::lang::Lang;

/// Texts longer than this are truncated before submission to bound
/// external-call cost.
pub const MAX_TRANSLATABLE_CHARS: usize = 5000;
/// Texts at or below this length are returned unchanged; they are not worth
/// a network round trip and are frequently mis-translated.
pub const MIN_TRANSLATABLE_CHARS: usize = 3;

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Failure classification from the underlying service.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("translation service rate limit hit")]
    RateLimited,
    #[error("translation service error: {0}")]
    Upstream(String),
}

/// The raw translation capability, kept behind a trait so tests can inject
/// failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(&self, text: &str, target: Lang) -> Result<String, BackendError>;
}

/// Tagged translation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// The service produced a translation.
    Translated(String),
    /// Input was too short to be worth translating; carried unchanged.
    Skipped(String),
    /// The service failed; the original text is carried so callers can fall
    /// back to it.
    Failed {
        original: String,
        reason: TranslationFailure,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationFailure {
    RateLimited,
    Upstream(String),
}

impl Translation {
    /// The best available text, translated or not.
    pub fn into_text(self) -> String {
        match self {
            Translation::Translated(text) | Translation::Skipped(text) => text,
            Translation::Failed { original, .. } => original,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, Translation::Translated(_))
    }
}

/// Process-lifetime translation counters. Constructed once and shared by
/// handle, so tests get a fresh collector per test.
#[derive(Debug, Default)]
pub struct TranslationStats {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rate_limit_hits: AtomicU64,
    /// Milliseconds since the epoch; zero while no failure has happened.
    last_failure_ms: AtomicI64,
}

/// Read-only view of the counters.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TranslationStatsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub rate_limit_hits: u64,
    pub success_rate: f64,
    pub last_failure: Option<DateTime<Utc>>,
}

impl TranslationStats {
    fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.last_failure_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn record_rate_limit(&self) {
        self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        self.record_failure();
    }

    pub fn snapshot(&self) -> TranslationStatsSnapshot {
        let attempts = self.attempts.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let last_failure_ms = self.last_failure_ms.load(Ordering::Relaxed);
        TranslationStatsSnapshot {
            attempts,
            successes,
            failures: self.failures.load(Ordering::Relaxed),
            rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed),
            success_rate: if attempts == 0 {
                0.0
            } else {
                successes as f64 / attempts as f64
            },
            last_failure: if last_failure_ms == 0 {
                None
            } else {
                Utc.timestamp_millis_opt(last_failure_ms).single()
            },
        }
    }
}

/// Truncate over-long text, marking the cut with an ellipsis.
fn truncate_for_translation(text: &str) -> String {
    if text.chars().count() <= MAX_TRANSLATABLE_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_TRANSLATABLE_CHARS).collect();
    truncated.push('…');
    truncated
}

/// Resilient wrapper around a [`TranslationBackend`].
#[derive(Clone)]
pub struct TranslationGateway {
    backend: Arc<dyn TranslationBackend>,
    stats: Arc<TranslationStats>,
}

impl TranslationGateway {
    pub fn new(backend: Arc<dyn TranslationBackend>, stats: Arc<TranslationStats>) -> Self {
        Self { backend, stats }
    }

    pub fn stats(&self) -> &TranslationStats {
        &self.stats
    }

    /// Translate `text` into `target`.
    ///
    /// Returns `None` for empty input. Rate-limited calls are not retried;
    /// any other failure gets exactly one retry after a short backoff. The
    /// original text always survives inside the returned value.
    pub async fn translate(&self, text: &str, target: Lang) -> Option<Translation> {
        if text.is_empty() {
            return None;
        }
        if text.chars().count() <= MIN_TRANSLATABLE_CHARS {
            return Some(Translation::Skipped(text.to_string()));
        }

        let payload = truncate_for_translation(text);
        self.stats.record_attempt();

        match self.backend.translate(&payload, target).await {
            Ok(translated) => {
                self.stats.record_success();
                Some(Translation::Translated(translated))
            }
            Err(BackendError::RateLimited) => {
                tracing::warn!("Translation rate limit hit, returning original text");
                self.stats.record_rate_limit();
                Some(Translation::Failed {
                    original: text.to_string(),
                    reason: TranslationFailure::RateLimited,
                })
            }
            Err(BackendError::Upstream(first_error)) => {
                tracing::warn!("Translation failed ({}), retrying once", first_error);
                tokio::time::sleep(RETRY_BACKOFF).await;
                match self.backend.translate(&payload, target).await {
                    Ok(translated) => {
                        self.stats.record_success();
                        Some(Translation::Translated(translated))
                    }
                    Err(BackendError::RateLimited) => {
                        self.stats.record_rate_limit();
                        Some(Translation::Failed {
                            original: text.to_string(),
                            reason: TranslationFailure::RateLimited,
                        })
                    }
                    Err(BackendError::Upstream(retry_error)) => {
                        tracing::warn!("Translation retry failed: {}", retry_error);
                        self.stats.record_failure();
                        Some(Translation::Failed {
                            original: text.to_string(),
                            reason: TranslationFailure::Upstream(retry_error),
                        })
                    }
                }
            }
        }
    }
}

/// LibreTranslate-style HTTP backend.
pub struct HttpTranslationBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl HttpTranslationBackend {
    pub fn new(config: &TranslationConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl TranslationBackend for HttpTranslationBackend {
    async fn translate(&self, text: &str, target: Lang) -> Result<String, BackendError> {
        let request = TranslateRequest {
            q: text,
            source: "auto",
            target: target.code(),
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Upstream(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited);
        }

        let response = response
            .error_for_status()
            .map_err(|e| BackendError::Upstream(e.to_string()))?;
        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Upstream(e.to_string()))?;
        Ok(body.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    fn gateway(backend: MockTranslationBackend) -> (TranslationGateway, Arc<TranslationStats>) {
        let stats = Arc::new(TranslationStats::default());
        (
            TranslationGateway::new(Arc::new(backend), stats.clone()),
            stats,
        )
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let backend = MockTranslationBackend::new();
        let (gateway, stats) = gateway(backend);

        assert_eq!(gateway.translate("", Lang::Ar).await, None);
        assert_eq!(stats.snapshot().attempts, 0);
    }

    #[tokio::test]
    async fn test_trivial_input_is_skipped() {
        let backend = MockTranslationBackend::new();
        let (gateway, stats) = gateway(backend);

        let outcome = gateway.translate("ok", Lang::Ar).await.unwrap();
        assert_eq!(outcome, Translation::Skipped("ok".to_string()));
        assert_eq!(stats.snapshot().attempts, 0);
    }

    #[tokio::test]
    async fn test_successful_translation() {
        let mut backend = MockTranslationBackend::new();
        backend
            .expect_translate()
            .times(1)
            .returning(|_, _| Ok("مرحبا بالعالم".to_string()));
        let (gateway, stats) = gateway(backend);

        let outcome = gateway.translate("Hello world", Lang::Ar).await.unwrap();
        assert_eq!(outcome, Translation::Translated("مرحبا بالعالم".to_string()));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.attempts, 1);
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.failures, 0);
        assert_eq!(snapshot.success_rate, 1.0);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let mut backend = MockTranslationBackend::new();
        backend
            .expect_translate()
            .times(1)
            .returning(|_, _| Err(BackendError::RateLimited));
        let (gateway, stats) = gateway(backend);

        let outcome = gateway.translate("Hello world", Lang::Ar).await.unwrap();
        assert_eq!(
            outcome,
            Translation::Failed {
                original: "Hello world".to_string(),
                reason: TranslationFailure::RateLimited,
            }
        );

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.rate_limit_hits, 1);
        assert_eq!(snapshot.failures, 1);
        assert!(snapshot.last_failure.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_retried_once_then_succeeds() {
        let mut backend = MockTranslationBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_translate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(BackendError::Upstream("connection reset".to_string())));
        backend
            .expect_translate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("مرحبا".to_string()));
        let (gateway, stats) = gateway(backend);

        let outcome = gateway.translate("Hello world", Lang::Ar).await.unwrap();
        assert!(outcome.is_translated());
        assert_eq!(stats.snapshot().successes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_failure_carries_original() {
        let mut backend = MockTranslationBackend::new();
        backend
            .expect_translate()
            .times(2)
            .returning(|_, _| Err(BackendError::Upstream("boom".to_string())));
        let (gateway, stats) = gateway(backend);

        let outcome = gateway.translate("Hello world", Lang::Ar).await.unwrap();
        assert_eq!(outcome.into_text(), "Hello world");
        assert_eq!(stats.snapshot().failures, 1);
        assert_eq!(stats.snapshot().successes, 0);
    }

    #[tokio::test]
    async fn test_long_input_is_truncated() {
        let mut backend = MockTranslationBackend::new();
        backend
            .expect_translate()
            .withf(|text, _| {
                text.chars().count() == MAX_TRANSLATABLE_CHARS + 1 && text.ends_with('…')
            })
            .times(1)
            .returning(|_, _| Ok("ترجمة".to_string()));
        let (gateway, _stats) = gateway(backend);

        let long_text = "a".repeat(MAX_TRANSLATABLE_CHARS + 1000);
        let outcome = gateway.translate(&long_text, Lang::Ar).await.unwrap();
        assert!(outcome.is_translated());
    }

    #[test]
    fn test_truncate_boundary() {
        let exact = "b".repeat(MAX_TRANSLATABLE_CHARS);
        assert_eq!(truncate_for_translation(&exact), exact);
    }
}
