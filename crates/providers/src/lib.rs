//! Oracle backend implementations for Curator.
//!
//! All backends implement the `curator_core::OracleBackend` trait.
//! [`build_from_config`] selects one based on configuration.

pub mod ollama;

pub use ollama::OllamaBackend;

use curator_config::OracleConfig;
use curator_core::OracleBackend;
use curator_core::error::BackendError;
use std::sync::Arc;

/// Build the configured oracle backend.
pub fn build_from_config(config: &OracleConfig) -> Result<Arc<dyn OracleBackend>, BackendError> {
    match config.backend.as_str() {
        "ollama" => Ok(Arc::new(OllamaBackend::new(&config.api_url, &config.model))),
        other => Err(BackendError::NotConfigured(format!(
            "unknown oracle backend '{other}'"
        ))),
    }
}
