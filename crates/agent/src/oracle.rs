//! Decision oracle — turns a prompt into a structurally valid [`Decision`].
//!
//! Transport faults (connection refused, timeouts) are retried immediately,
//! up to `max_attempts` calls in total. Anything else, including a reply that
//! is not a JSON object, is surfaced on the first occurrence.

use curator_core::decision::Decision;
use curator_core::error::OracleError;
use curator_core::oracle::{OracleBackend, OutputMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

pub struct DecisionOracle {
    backend: Arc<dyn OracleBackend>,
    max_attempts: u32,
    timeout: Duration,
}

impl DecisionOracle {
    pub fn new(backend: Arc<dyn OracleBackend>) -> Self {
        Self {
            backend,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Total calls allowed per decision when the transport keeps failing.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Ask for the next decision.
    pub async fn decide(&self, prompt: &str) -> Result<Decision, OracleError> {
        let raw = self.generate_with_retry(prompt, OutputMode::Json).await?;
        Self::decode(&raw)
    }

    /// Re-issue `prompt` without output constraints and return whatever text
    /// comes back, for an operator to read after a fatal decode failure.
    pub async fn raw_fallback(&self, prompt: &str) -> Result<String, OracleError> {
        self.generate_with_retry(prompt, OutputMode::Text).await
    }

    async fn generate_with_retry(&self, prompt: &str, mode: OutputMode) -> Result<String, OracleError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(backend = %self.backend.name(), attempt, ?mode, "Requesting oracle completion");

            match self.backend.generate(prompt, mode, self.timeout).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transport() && attempt < self.max_attempts => {
                    warn!(
                        backend = %self.backend.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Oracle transport failure, retrying"
                    );
                }
                Err(source) => return Err(OracleError::Backend { attempts: attempt, source }),
            }
        }
    }

    /// Decode raw model output into a decision. The top level must be an object.
    pub fn decode(raw: &str) -> Result<Decision, OracleError> {
        let value: serde_json::Value = serde_json::from_str(raw.trim()).map_err(|e| OracleError::Decode {
            message: format!("invalid JSON: {e}"),
        })?;
        Decision::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedBackend;
    use curator_core::error::BackendError;

    #[tokio::test]
    async fn decodes_object_reply() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(
            r#"{"action":"noop","args":{},"reason":"t","stop":false}"#.into(),
        )]));
        let oracle = DecisionOracle::new(backend.clone());

        let decision = oracle.decide("prompt").await.unwrap();
        assert_eq!(decision.action, "noop");
        assert_eq!(backend.calls(), 1);
        assert_eq!(backend.modes(), vec![OutputMode::Json]);
    }

    #[tokio::test]
    async fn array_reply_is_decode_error_without_retry() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("[1, 2, 3]".into())]));
        let oracle = DecisionOracle::new(backend.clone());

        let err = oracle.decide("prompt").await.unwrap_err();
        assert!(matches!(err, OracleError::Decode { .. }));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn garbage_reply_is_decode_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("sure! here you go".into())]));
        let err = DecisionOracle::new(backend).decide("p").await.unwrap_err();
        assert!(matches!(err, OracleError::Decode { .. }));
    }

    #[tokio::test]
    async fn transport_failures_are_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::Transport("connection refused".into())),
            Err(BackendError::Timeout("180s".into())),
            Ok(r#"{"action":"noop"}"#.into()),
        ]));
        let oracle = DecisionOracle::new(backend.clone());

        let decision = oracle.decide("prompt").await.unwrap();
        assert_eq!(decision.action, "noop");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::Transport("down".into())),
            Err(BackendError::Transport("down".into())),
            Err(BackendError::Transport("down".into())),
            Ok(r#"{"action":"never reached"}"#.into()),
        ]));
        let oracle = DecisionOracle::new(backend.clone());

        let err = oracle.decide("prompt").await.unwrap_err();
        assert!(matches!(err, OracleError::Backend { attempts: 3, .. }));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn non_transport_failure_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(BackendError::ApiError {
            status_code: 500,
            message: "boom".into(),
        })]));
        let oracle = DecisionOracle::new(backend.clone()).with_max_attempts(5);

        let err = oracle.decide("prompt").await.unwrap_err();
        assert!(matches!(err, OracleError::Backend { attempts: 1, .. }));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn raw_fallback_uses_text_mode() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("I think the answer is...".into())]));
        let oracle = DecisionOracle::new(backend.clone());

        let raw = oracle.raw_fallback("prompt").await.unwrap();
        assert_eq!(raw, "I think the answer is...");
        assert_eq!(backend.modes(), vec![OutputMode::Text]);
    }
}
