//! In-memory backend — useful for testing and ephemeral runs.

use async_trait::async_trait;
use curator_core::decision::Decision;
use curator_core::error::MemoryError;
use curator_core::memory::{DecisionMemory, MemoryRecord, RecordHandle};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stores records in a Vec in append order.
/// Nothing survives the process.
pub struct InMemoryDecisionMemory {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
}

impl InMemoryDecisionMemory {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Total records across all scopes.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryDecisionMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionMemory for InMemoryDecisionMemory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, scope: &str, decision: &Decision) -> Result<RecordHandle, MemoryError> {
        let record = MemoryRecord::new(scope, decision.clone());
        let handle = record.handle();
        self.records.write().await.push(record);
        Ok(handle)
    }

    async fn update(&self, handle: &RecordHandle, result: Value) -> Result<(), MemoryError> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == handle.id && r.scope == handle.scope)
            .ok_or_else(|| MemoryError::NotFound(handle.id.clone()))?;

        if record.result.is_some() {
            return Err(MemoryError::AlreadyResolved(handle.id.clone()));
        }
        record.result = Some(result);
        Ok(())
    }

    async fn list(&self, scope: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| r.scope == scope).cloned().collect())
    }

    async fn clear(&self, scope: &str) -> Result<usize, MemoryError> {
        let mut records = self.records.write().await;
        let len_before = records.len();
        records.retain(|r| r.scope != scope);
        Ok(len_before - records.len())
    }

    async fn latest(&self, scope: &str) -> Result<Option<MemoryRecord>, MemoryError> {
        let records = self.records.read().await;
        Ok(records.iter().rev().find(|r| r.scope == scope).cloned())
    }
}
