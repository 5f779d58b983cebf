//! Sub-loop delegation — an action that runs a narrower dispatch loop inline.
//!
//! The parent blocks until the sub-loop stops or fails, then receives a
//! summary of the sub-scope's last record as an ordinary action result.

use async_trait::async_trait;
use curator_core::action::{ActionSpec, Args, Capability};
use curator_core::error::ActionError;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::dispatch::DispatchLoop;

/// Builds a ready-to-run sub-loop from the delegation's arguments.
pub trait SubLoopFactory: Send + Sync {
    fn build(&self, context: Value) -> DispatchLoop;
}

impl<F> SubLoopFactory for F
where
    F: Fn(Value) -> DispatchLoop + Send + Sync,
{
    fn build(&self, context: Value) -> DispatchLoop {
        self(context)
    }
}

pub struct DelegateAction {
    spec: ActionSpec,
    agent_name: String,
    factory: Arc<dyn SubLoopFactory>,
}

impl DelegateAction {
    pub fn new(spec: ActionSpec, agent_name: impl Into<String>, factory: Arc<dyn SubLoopFactory>) -> Self {
        Self {
            spec,
            agent_name: agent_name.into(),
            factory,
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }
}

#[async_trait]
impl Capability for DelegateAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        let slug = args.get("slug").cloned().unwrap_or(Value::Null);
        let sub = self.factory.build(Value::Object(args));
        info!(action = %self.spec.name, agent = %self.agent_name, scope = %sub.scope(), slug = %slug, "Delegating to sub-loop");

        let outcome = sub.run().await.map_err(|e| ActionError::ExecutionFailed {
            action: self.spec.name.clone(),
            reason: format!("sub-loop '{}' failed: {e}", sub.scope()),
        })?;

        let latest = sub
            .memory()
            .latest(sub.scope())
            .await
            .map_err(|e| ActionError::Backend(format!("reading sub-scope '{}': {e}", sub.scope())))?;

        info!(scope = %sub.scope(), phase = outcome.phase.as_str(), iterations = outcome.iterations, "Sub-loop returned");

        // A failed sub-loop may leave an older record as the scope's latest.
        let mut summary = json!({
            "success": outcome.is_stopped(),
            "agent": self.agent_name,
            "slug": slug,
        });
        match latest {
            Some(record) => summary["last_action"] = record.value(),
            None => summary["message"] = json!("completed without final memory"),
        }
        summary["outcome"] = json!(outcome.phase.as_str());
        Ok(summary)
    }
}
