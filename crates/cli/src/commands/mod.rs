pub mod config_cmd;
pub mod memory;
pub mod run;

use anyhow::Context;
use curator_agent::{DecisionOracle, FixedDelay};
use curator_capabilities::{AgentDeps, AgentSet, SnapshotStore};
use curator_config::AppConfig;
use curator_core::event::{DomainEvent, EventBus};
use curator_core::memory::DecisionMemory;
use curator_memory::{InMemoryDecisionMemory, SqliteDecisionMemory};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn default_config_path() -> PathBuf {
    AppConfig::config_dir().join("config.toml")
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load_from(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Open the configured decision memory backend.
pub async fn open_memory(config: &AppConfig) -> anyhow::Result<Arc<dyn DecisionMemory>> {
    match config.memory.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryDecisionMemory::new())),
        _ => {
            let path = config.memory.resolved_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let memory = SqliteDecisionMemory::new(&format!("sqlite://{}", path.display())).await?;
            Ok(Arc::new(memory))
        }
    }
}

/// Wire oracle, memory, content and the three agents from configuration.
pub async fn build_agents(config: &AppConfig) -> anyhow::Result<Arc<AgentSet>> {
    let backend = curator_providers::build_from_config(&config.oracle)?;
    let oracle = DecisionOracle::new(backend)
        .with_max_attempts(config.oracle.max_attempts)
        .with_timeout(config.oracle.timeout());

    let store = Arc::new(SnapshotStore::open(&config.content.resolved_snapshot_path()).await?);
    let memory = open_memory(config).await?;

    let agents = AgentSet::new(AgentDeps {
        store: store.clone(),
        analytics: store,
        memory,
        oracle: Arc::new(oracle),
        throttle: Arc::new(FixedDelay(config.dispatch.throttle())),
        event_bus: Some(spawn_event_logger()),
        max_iterations: config.dispatch.max_iterations,
        site_ids: config.content.site_ids.clone(),
        context_file: config.persona.context_file.as_ref().map(PathBuf::from),
    })?;
    Ok(agents)
}

/// An event bus whose events are echoed to the debug log.
fn spawn_event_logger() -> Arc<EventBus> {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event.as_ref() {
                DomainEvent::ActionExecuted { scope, action, success, duration_ms, .. } => {
                    tracing::debug!(%scope, %action, success, duration_ms, "event: action executed");
                }
                DomainEvent::LoopFinished { scope, phase, iterations, .. } => {
                    tracing::debug!(%scope, %phase, iterations, "event: loop finished");
                }
                other => tracing::trace!(event = ?other, "event"),
            }
        }
    });
    bus
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_core::decision::Decision;

    #[tokio::test]
    async fn sqlite_memory_is_created_under_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.memory.path = Some(dir.path().join("nested/memory.db").display().to_string());

        let memory = open_memory(&config).await.unwrap();
        memory.append("main", &Decision::stop("probe")).await.unwrap();
        assert_eq!(memory.list("main").await.unwrap().len(), 1);
        assert!(dir.path().join("nested/memory.db").exists());
    }

    #[tokio::test]
    async fn agents_build_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.memory.backend = "memory".into();
        config.content.snapshot_path = Some(dir.path().join("content.json").display().to_string());

        let agents = build_agents(&config).await.unwrap();
        let main = agents.main_loop().unwrap();
        assert_eq!(main.scope(), "main");
        assert_eq!(main.registry().len(), 4);
    }
}
