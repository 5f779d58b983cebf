//! Decision memory — the append-only log of what a loop decided and what happened.
//!
//! Records are partitioned by scope (one per agent type). Within a scope they
//! are strictly ordered by creation time. A record is appended with its result
//! pending and resolved exactly once after the action runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decision::Decision;
use crate::error::MemoryError;

/// Identifies an appended record so its result can be filled in later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordHandle {
    pub id: String,
    pub scope: String,
}

/// A stored decision together with its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,

    pub scope: String,

    #[serde(flatten)]
    pub decision: Decision,

    /// `None` while the action is still pending.
    #[serde(default)]
    pub result: Option<Value>,

    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(scope: impl Into<String>, decision: Decision) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scope: scope.into(),
            decision,
            result: None,
            created_at: Utc::now(),
        }
    }

    pub fn handle(&self) -> RecordHandle {
        RecordHandle {
            id: self.id.clone(),
            scope: self.scope.clone(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }

    /// The record value: decision fields plus `result` when present.
    pub fn value(&self) -> Value {
        let mut value = self.decision.to_value();
        if let (Value::Object(map), Some(result)) = (&mut value, &self.result) {
            map.insert("result".into(), result.clone());
        }
        value
    }
}

/// Durable storage for decision records.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait DecisionMemory: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Append a decision with a pending result. Visible to `list` on return.
    async fn append(&self, scope: &str, decision: &Decision) -> std::result::Result<RecordHandle, MemoryError>;

    /// Attach the result to a pending record. Fails if the record is unknown
    /// or already resolved.
    async fn update(&self, handle: &RecordHandle, result: Value) -> std::result::Result<(), MemoryError>;

    /// All records of a scope, oldest first.
    async fn list(&self, scope: &str) -> std::result::Result<Vec<MemoryRecord>, MemoryError>;

    /// Remove every record of a scope, returning how many were removed.
    async fn clear(&self, scope: &str) -> std::result::Result<usize, MemoryError>;

    /// The most recent record of a scope.
    async fn latest(&self, scope: &str) -> std::result::Result<Option<MemoryRecord>, MemoryError> {
        Ok(self.list(scope).await?.pop())
    }
}
