//! Error types for the Curator domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Curator operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Oracle errors ---
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Action errors ---
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Faults raised by an oracle backend (the model server).
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

impl BackendError {
    /// Whether this fault happened while reaching the backend, as opposed to
    /// the backend answering with something unusable.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

/// Failures surfaced by the decision oracle. Both kinds end the loop.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("Decision could not be decoded: {message}")]
    Decode { message: String },

    #[error("Oracle backend failed after {attempts} attempt(s): {source}")]
    Backend {
        attempts: u32,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already has a result: {0}")]
    AlreadyResolved(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Action not found: {0}")]
    NotFound(String),

    #[error("Action execution failed: {action} — {reason}")]
    ExecutionFailed { action: String, reason: String },

    #[error("Invalid action arguments: {0}")]
    InvalidArguments(String),

    #[error("Collaborator error: {0}")]
    Backend(String),
}

/// A malformed textual value for a `mapping` parameter.
#[derive(Debug, Clone, Error)]
#[error("Parameter '{param}' is not a valid mapping: {reason}")]
pub struct CoercionError {
    pub param: String,
    pub reason: String,
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Duplicate action name: {0}")]
    DuplicateAction(String),
}
