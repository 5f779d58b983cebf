//! Oracle backend trait — the abstraction over the language model server.
//!
//! A backend turns a prompt into text, optionally constrained to JSON output.
//! Retry policy and decision validation live one layer up, in the agent crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::BackendError;

/// Requested output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Constrained to a single JSON value.
    #[default]
    Json,
    /// Unconstrained free text.
    Text,
}

/// The core OracleBackend trait.
///
/// Implementations: Ollama, scripted mocks for tests.
#[async_trait]
pub trait OracleBackend: Send + Sync {
    /// Human-readable backend name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// Network-level faults must be reported as `BackendError::Transport` or
    /// `BackendError::Timeout` so callers can tell them apart.
    async fn generate(
        &self,
        prompt: &str,
        mode: OutputMode,
        timeout: Duration,
    ) -> std::result::Result<String, BackendError>;
}
