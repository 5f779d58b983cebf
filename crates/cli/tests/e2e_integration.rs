//! End-to-end integration tests for the Curator dispatch runtime.
//!
//! These tests wire the real capability catalogs, a SQLite decision memory
//! and a scripted oracle, then drive whole main → delegate → stop runs.

use std::sync::Arc;
use std::time::Duration;

use curator_agent::{DecisionOracle, LoopPhase, NoDelay};
use curator_capabilities::{
    AgentDeps, AgentSet, ContentKind, ContentStore, MAIN_SCOPE, POST_SCOPE, Snapshot, SnapshotStore, TUTORIAL_SCOPE,
};
use curator_core::error::BackendError;
use curator_core::event::{DomainEvent, EventBus};
use curator_core::memory::DecisionMemory;
use curator_core::oracle::{OracleBackend, OutputMode};
use curator_memory::SqliteDecisionMemory;
use serde_json::json;

// ── Mock Oracle ──────────────────────────────────────────────────────────

/// A mock backend that returns scripted replies in sequence.
struct ScriptedOracle {
    replies: std::sync::Mutex<Vec<String>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedOracle {
    fn new(replies: Vec<serde_json::Value>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into_iter().rev().map(|r| r.to_string()).collect()),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl OracleBackend for ScriptedOracle {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, prompt: &str, _mode: OutputMode, _timeout: Duration) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.replies.lock().unwrap().pop();
        match reply {
            Some(reply) => Ok(reply),
            None => panic!("ScriptedOracle exhausted after {} call(s)", self.prompts.lock().unwrap().len()),
        }
    }
}

fn act(action: &str, args: serde_json::Value) -> serde_json::Value {
    json!({"action": action, "args": args, "reason": format!("run {action}"), "stop": false})
}

fn stop(reason: &str) -> serde_json::Value {
    json!({"action": "", "args": {}, "reason": reason, "stop": true})
}

fn snapshot() -> Snapshot {
    serde_json::from_value(json!({
        "posts": [{
            "id": 11,
            "slug": "intro",
            "title": "Intro",
            "body": {"en": "Short and thin."},
            "status": "published",
            "counter": 120,
            "categories": ["news"]
        }],
        "tutorials": [{
            "id": 7,
            "slug": {"en": "setup", "it": "installazione"},
            "title": {"en": "Setup"},
            "body": {"en": "<h1>Setup</h1><p>Install the tool.</p>"},
            "status": "draft"
        }],
        "analytics": {
            "1": [
                {"label": "/blog/intro", "bounce_rate": "82%", "nb_visits": 50},
                {"label": "/tutorial/setup", "bounce_rate": "64%", "nb_visits": 30}
            ]
        }
    }))
    .unwrap()
}

struct World {
    agents: Arc<AgentSet>,
    store: Arc<SnapshotStore>,
    memory: Arc<dyn DecisionMemory>,
    oracle: Arc<ScriptedOracle>,
    events: Arc<EventBus>,
    _dir: tempfile::TempDir,
}

async fn world(replies: Vec<serde_json::Value>) -> World {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("memory.db").display());
    let memory: Arc<dyn DecisionMemory> = Arc::new(SqliteDecisionMemory::new(&url).await.unwrap());
    let store = Arc::new(SnapshotStore::in_memory(snapshot()));
    let oracle = Arc::new(ScriptedOracle::new(replies));
    let events = Arc::new(EventBus::default());

    let agents = AgentSet::new(AgentDeps {
        store: store.clone(),
        analytics: store.clone(),
        memory: memory.clone(),
        oracle: Arc::new(DecisionOracle::new(oracle.clone())),
        throttle: Arc::new(NoDelay),
        event_bus: Some(events.clone()),
        max_iterations: Some(20),
        site_ids: vec![1],
        context_file: None,
    })
    .unwrap();

    World {
        agents,
        store,
        memory,
        oracle,
        events,
        _dir: dir,
    }
}

// ── E2E: Main → Post delegation ──────────────────────────────────────────

#[tokio::test]
async fn e2e_main_agent_delegates_post_rewrite() {
    let w = world(vec![
        act("get_top_bounce_urls", json!({"site_id": "1", "limit": 2})),
        act("delegate_to_post_agent", json!({"slug": "intro"})),
        act("get_post_details", json!({"slug": "intro"})),
        act("analyze_post_quality", json!({"slug": "intro"})),
        act("update_post_content", json!({"slug": "intro", "new_content": {"en": "A longer, clearer intro."}})),
        stop("post improved"),
        stop("nothing left to do"),
    ])
    .await;

    let outcome = w.agents.main_loop().unwrap().run().await.unwrap();
    assert_eq!(outcome.phase, LoopPhase::Stopped);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.state["success"], true);
    assert_eq!(outcome.state["agent"], "post_agent");
    assert_eq!(outcome.state["slug"], "intro");
    assert_eq!(outcome.state["outcome"], "stopped");
    assert_eq!(outcome.state["last_action"]["action"], "update_post_content");
    assert_eq!(outcome.state["last_action"]["result"]["post_id"], 11);

    // The rewrite reached the store.
    let post = w.store.find(ContentKind::Post, "intro").await.unwrap().unwrap();
    assert_eq!(post.body, json!({"en": "A longer, clearer intro."}));

    // Each agent kept its own scope.
    let main = w.memory.list(MAIN_SCOPE).await.unwrap();
    let actions: Vec<&str> = main.iter().map(|r| r.decision.action.as_str()).collect();
    assert_eq!(actions, vec!["get_top_bounce_urls", "delegate_to_post_agent"]);
    assert!(main.iter().all(|r| !r.is_pending()));

    let bounce = main[0].result.as_ref().unwrap();
    assert_eq!(bounce[0]["url"], "/blog/intro");
    assert_eq!(bounce[0]["bounce_rate"], 82.0);

    let post_records = w.memory.list(POST_SCOPE).await.unwrap();
    assert_eq!(post_records.len(), 3);
    assert_eq!(post_records[1].result.as_ref().unwrap()["word_counts"]["en"], 3);
    assert!(w.memory.list(TUTORIAL_SCOPE).await.unwrap().is_empty());

    assert_eq!(w.oracle.prompts().len(), 7);
}

#[tokio::test]
async fn e2e_sub_agent_sees_delegation_context() {
    let w = world(vec![
        act("delegate_to_tutorial_agent", json!({"slug": "setup", "task": "review"})),
        act("get_tutorial_details", json!({"slug": "installazione"})),
        stop("done"),
        stop("done"),
    ])
    .await;

    let outcome = w.agents.main_loop().unwrap().run().await.unwrap();
    assert!(outcome.is_stopped());
    assert_eq!(outcome.state["agent"], "tutorial_agent");

    // Second prompt is the tutorial agent's first one.
    let prompts = w.oracle.prompts();
    assert!(prompts[1].contains("TutorialAgent"));
    assert!(prompts[1].contains("\"task\": \"review\""));

    let details = &outcome.state["last_action"]["result"];
    assert_eq!(details["id"], 7);
    let body = details["body"]["en"].as_str().unwrap();
    assert!(body.contains("Install the tool."));
    assert!(!body.contains("<p>"));
}

#[tokio::test]
async fn e2e_unknown_action_is_recorded_and_loop_continues() {
    let w = world(vec![
        act("delete_everything", json!({})),
        act("get_post_by_slug", json!({"slug": "missing"})),
        stop("gave up"),
    ])
    .await;

    let outcome = w.agents.main_loop().unwrap().run().await.unwrap();
    assert!(outcome.is_stopped());
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.state["error"], "Post with slug 'missing' not found");

    let records = w.memory.list(MAIN_SCOPE).await.unwrap();
    assert_eq!(records[0].result, Some(json!({"error": "method not found"})));
}

#[tokio::test]
async fn e2e_memory_survives_across_runs() {
    let w = world(vec![
        act("get_post_by_slug", json!({"slug": "intro"})),
        stop("first run"),
        stop("second run"),
    ])
    .await;

    w.agents.main_loop().unwrap().run().await.unwrap();
    assert_eq!(w.memory.list(MAIN_SCOPE).await.unwrap().len(), 1);

    // Prior records are rendered into the next run's prompt.
    w.agents.main_loop().unwrap().run().await.unwrap();
    let prompts = w.oracle.prompts();
    assert!(!prompts[0].contains("Actions already executed"));
    assert!(prompts[2].contains("1. Action: get_post_by_slug"));
    assert_eq!(w.memory.clear(MAIN_SCOPE).await.unwrap(), 1);
}

#[tokio::test]
async fn e2e_malformed_oracle_reply_fails_with_raw_text() {
    let w = world(vec![json!(["not", "an", "object"]), json!("free text explanation")]).await;

    let outcome = w.agents.main_loop().unwrap().run().await.unwrap();
    assert_eq!(outcome.phase, LoopPhase::Failed);
    let failure = outcome.failure.unwrap();
    assert_eq!(failure.raw_response.as_deref(), Some("\"free text explanation\""));
    assert!(w.memory.list(MAIN_SCOPE).await.unwrap().is_empty());
}

#[tokio::test]
async fn e2e_events_track_nested_loops() {
    let w = world(vec![
        act("delegate_to_post_agent", json!({"slug": "intro"})),
        stop("sub done"),
        stop("main done"),
    ])
    .await;
    let mut rx = w.events.subscribe();

    w.agents.main_loop().unwrap().run().await.unwrap();

    let mut finished = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let DomainEvent::LoopFinished { scope, phase, .. } = event.as_ref() {
            finished.push(format!("{scope}:{phase}"));
        }
    }
    assert_eq!(finished, vec!["post_agent:stopped", "main:stopped"]);
}
