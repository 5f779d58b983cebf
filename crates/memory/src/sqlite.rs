//! SQLite decision memory.
//!
//! A single table, `decision_memory`, holds every scope. Rows are ordered by
//! creation time with the autoincrement `iid` as a tiebreak, so two appends
//! within the same microsecond still list in append order.
//!
//! `result` is SQL `NULL` while pending and JSON text once resolved (a JSON
//! `null` result is stored as the text `null`, not as SQL `NULL`).

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use curator_core::decision::Decision;
use curator_core::error::MemoryError;
use curator_core::memory::{DecisionMemory, MemoryRecord, RecordHandle};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable decision memory backed by a SQLite file.
pub struct SqliteDecisionMemory {
    pool: SqlitePool,
}

impl SqliteDecisionMemory {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Each connection to an in-memory database sees its own empty copy,
        // so those get a single connection that is never recycled.
        let in_memory = path.contains(":memory:") || path.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let backend = Self { pool };
        backend.run_migrations().await?;
        info!("SQLite decision memory initialized at {path}");
        Ok(backend)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let backend = Self { pool };
        backend.run_migrations().await?;
        Ok(backend)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS decision_memory (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                id           TEXT UNIQUE NOT NULL,
                scope        TEXT NOT NULL,
                value        TEXT NOT NULL,
                result       TEXT,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("decision_memory table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_decision_memory_scope ON decision_memory(scope, created_at, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("scope index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn timestamp() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<MemoryRecord, MemoryError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| MemoryError::QueryFailed(format!("id column: {e}")))?;
        let scope: String = row
            .try_get("scope")
            .map_err(|e| MemoryError::QueryFailed(format!("scope column: {e}")))?;
        let value_json: String = row
            .try_get("value")
            .map_err(|e| MemoryError::QueryFailed(format!("value column: {e}")))?;
        let result_json: Option<String> = row
            .try_get("result")
            .map_err(|e| MemoryError::QueryFailed(format!("result column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| MemoryError::QueryFailed(format!("created_at column: {e}")))?;

        let decision: Decision = serde_json::from_str(&value_json)
            .map_err(|e| MemoryError::QueryFailed(format!("Corrupted decision {id}: {e}")))?;

        let result = result_json
            .map(|text| serde_json::from_str::<Value>(&text))
            .transpose()
            .map_err(|e| MemoryError::QueryFailed(format!("Corrupted result {id}: {e}")))?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(MemoryRecord {
            id,
            scope,
            decision,
            result,
            created_at,
        })
    }
}

#[async_trait]
impl DecisionMemory for SqliteDecisionMemory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, scope: &str, decision: &Decision) -> Result<RecordHandle, MemoryError> {
        let record = MemoryRecord::new(scope, decision.clone());
        let value_json = serde_json::to_string(&record.decision)
            .map_err(|e| MemoryError::Storage(format!("Decision serialization: {e}")))?;
        let now = Self::timestamp();

        sqlx::query(
            r#"
            INSERT INTO decision_memory (id, scope, value, result, created_at, updated_at)
            VALUES (?1, ?2, ?3, NULL, ?4, ?4)
            "#,
        )
        .bind(&record.id)
        .bind(scope)
        .bind(&value_json)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT failed: {e}")))?;

        debug!(scope, id = %record.id, action = %decision.action, "Appended decision");
        Ok(record.handle())
    }

    async fn update(&self, handle: &RecordHandle, result: Value) -> Result<(), MemoryError> {
        let result_json = serde_json::to_string(&result)
            .map_err(|e| MemoryError::Storage(format!("Result serialization: {e}")))?;

        let affected = sqlx::query(
            r#"
            UPDATE decision_memory
            SET result = ?1, updated_at = ?2
            WHERE id = ?3 AND scope = ?4 AND result IS NULL
            "#,
        )
        .bind(&result_json)
        .bind(Self::timestamp())
        .bind(&handle.id)
        .bind(&handle.scope)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("UPDATE failed: {e}")))?
        .rows_affected();

        if affected == 0 {
            let exists = sqlx::query("SELECT 1 FROM decision_memory WHERE id = ?1 AND scope = ?2")
                .bind(&handle.id)
                .bind(&handle.scope)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| MemoryError::QueryFailed(format!("Existence check: {e}")))?;
            return Err(match exists {
                Some(_) => MemoryError::AlreadyResolved(handle.id.clone()),
                None => MemoryError::NotFound(handle.id.clone()),
            });
        }

        debug!(scope = %handle.scope, id = %handle.id, "Recorded result");
        Ok(())
    }

    async fn list(&self, scope: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let rows = sqlx::query(
            "SELECT * FROM decision_memory WHERE scope = ?1 ORDER BY created_at ASC, iid ASC",
        )
        .bind(scope)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("List failed: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn clear(&self, scope: &str) -> Result<usize, MemoryError> {
        let result = sqlx::query("DELETE FROM decision_memory WHERE scope = ?1")
            .bind(scope)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("DELETE failed: {e}")))?;

        let removed = result.rows_affected() as usize;
        info!(scope, removed, "Cleared decision memory scope");
        Ok(removed)
    }

    async fn latest(&self, scope: &str) -> Result<Option<MemoryRecord>, MemoryError> {
        let row = sqlx::query(
            "SELECT * FROM decision_memory WHERE scope = ?1 ORDER BY created_at DESC, iid DESC LIMIT 1",
        )
        .bind(scope)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Latest failed: {e}")))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_backend(dir: &tempfile::TempDir) -> SqliteDecisionMemory {
        let path = dir.path().join("memory.db");
        SqliteDecisionMemory::new(&format!("sqlite://{}", path.display()))
            .await
            .unwrap()
    }

    fn decision(action: &str) -> Decision {
        let mut args = serde_json::Map::new();
        args.insert("slug".into(), json!("hello-world"));
        Decision::new(action, args, "because")
    }

    #[tokio::test]
    async fn append_list_update() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_backend(&dir).await;

        let handle = db.append("post_agent", &decision("get_post_details")).await.unwrap();
        let records = db.list("post_agent").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_pending());
        assert_eq!(records[0].decision.args["slug"], "hello-world");

        db.update(&handle, json!({"title": "Hello"})).await.unwrap();
        let record = db.latest("post_agent").await.unwrap().unwrap();
        assert_eq!(record.result, Some(json!({"title": "Hello"})));
    }

    #[tokio::test]
    async fn in_memory_database_is_shared_by_all_queries() {
        let db = SqliteDecisionMemory::new("sqlite::memory:").await.unwrap();
        let handle = db.append("main", &decision("get_top_bounce_urls")).await.unwrap();

        // Concurrent queries would open extra connections on a larger pool.
        let (a, b, c) = tokio::join!(db.list("main"), db.list("main"), db.latest("main"));
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 1);
        assert_eq!(c.unwrap().unwrap().id, handle.id);

        db.update(&handle, json!([])).await.unwrap();
        assert_eq!(db.clear("main").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn null_result_is_not_pending() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_backend(&dir).await;

        let handle = db.append("main", &decision("get_post_by_slug")).await.unwrap();
        db.update(&handle, Value::Null).await.unwrap();

        let record = db.latest("main").await.unwrap().unwrap();
        assert_eq!(record.result, Some(Value::Null));
        assert!(!record.is_pending());
    }

    #[tokio::test]
    async fn update_is_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_backend(&dir).await;

        let handle = db.append("main", &decision("noop")).await.unwrap();
        db.update(&handle, json!(1)).await.unwrap();
        let err = db.update(&handle, json!(2)).await.unwrap_err();
        assert!(matches!(err, MemoryError::AlreadyResolved(_)));

        let missing = RecordHandle {
            id: "nope".into(),
            scope: "main".into(),
        };
        let err = db.update(&missing, json!(3)).await.unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn ordering_survives_interleaved_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_backend(&dir).await;

        for i in 0..5 {
            db.append("post_agent", &decision(&format!("p{i}"))).await.unwrap();
            db.append("main", &decision(&format!("m{i}"))).await.unwrap();
        }

        let actions: Vec<String> = db
            .list("post_agent")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.decision.action)
            .collect();
        assert_eq!(actions, vec!["p0", "p1", "p2", "p3", "p4"]);
    }

    #[tokio::test]
    async fn clear_only_touches_one_scope() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_backend(&dir).await;

        db.append("post_agent", &decision("a")).await.unwrap();
        db.append("post_agent", &decision("b")).await.unwrap();
        db.append("tutorial_agent", &decision("c")).await.unwrap();

        assert_eq!(db.clear("post_agent").await.unwrap(), 2);
        assert!(db.list("post_agent").await.unwrap().is_empty());
        assert_eq!(db.list("tutorial_agent").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn records_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = test_backend(&dir).await;
            db.append("main", &decision("persisted")).await.unwrap();
        }
        let db = test_backend(&dir).await;
        let latest = db.latest("main").await.unwrap().unwrap();
        assert_eq!(latest.decision.action, "persisted");
    }

    #[tokio::test]
    async fn backend_name() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_backend(&dir).await;
        assert_eq!(db.name(), "sqlite");
    }
}
