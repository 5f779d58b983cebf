//! The dispatch loop — decide, execute, record, repeat.
//!
//! Each iteration renders a prompt from the loop's persona, catalog, current
//! state and memory scope, asks the oracle for a decision, records it, runs
//! the chosen action and records the result:
//!
//! ```text
//! AwaitingDecision ─► Decided ─► Executing ─► Recorded ─┐
//!        ▲                                              │
//!        └──────────────────── throttle ◄───────────────┘
//!        │
//!        ├─► Stopped   (oracle said stop, or iteration cap)
//!        └─► Failed    (oracle output unusable)
//! ```
//!
//! Action failures never end the loop. They become `{"error": ..}` results
//! the oracle sees on the next prompt.

use chrono::Utc;
use curator_core::action::ActionRegistry;
use curator_core::decision::Decision;
use curator_core::error::OracleError;
use curator_core::event::{DomainEvent, EventBus};
use curator_core::memory::DecisionMemory;
use curator_core::persona::Persona;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use crate::coerce;
use crate::oracle::DecisionOracle;
use crate::prompt;
use crate::throttle::{FixedDelay, Throttle};

/// Result recorded when the oracle names an action the registry lacks.
pub const METHOD_NOT_FOUND: &str = "method not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    AwaitingDecision,
    Decided,
    Executing,
    Recorded,
    Stopped,
    Failed,
}

impl LoopPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingDecision => "awaiting_decision",
            Self::Decided => "decided",
            Self::Executing => "executing",
            Self::Recorded => "recorded",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

/// Why a loop ended in `Failed`.
#[derive(Debug, Clone)]
pub struct LoopFailure {
    pub error: OracleError,
    /// Free-text reply to the same prompt, when it could be obtained.
    pub raw_response: Option<String>,
}

/// How a run ended.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub scope: String,
    pub phase: LoopPhase,
    /// Number of executed (recorded) actions.
    pub iterations: u32,
    /// The last action result, `null` if nothing ran.
    pub state: Value,
    pub failure: Option<LoopFailure>,
}

impl LoopOutcome {
    pub fn is_stopped(&self) -> bool {
        self.phase == LoopPhase::Stopped
    }
}

/// A single-threaded decide → execute → record state machine over one memory scope.
pub struct DispatchLoop {
    scope: String,
    persona: Persona,
    registry: Arc<ActionRegistry>,
    memory: Arc<dyn DecisionMemory>,
    oracle: Arc<DecisionOracle>,
    context: Value,
    throttle: Arc<dyn Throttle>,
    event_bus: Option<Arc<EventBus>>,
    max_iterations: Option<u32>,
    clear_on_start: bool,
}

impl DispatchLoop {
    pub fn new(
        scope: impl Into<String>,
        persona: Persona,
        registry: Arc<ActionRegistry>,
        memory: Arc<dyn DecisionMemory>,
        oracle: Arc<DecisionOracle>,
    ) -> Self {
        Self {
            scope: scope.into(),
            persona,
            registry,
            memory,
            oracle,
            context: Value::Null,
            throttle: Arc::new(FixedDelay::default()),
            event_bus: None,
            max_iterations: None,
            clear_on_start: false,
        }
    }

    /// Read-only task context folded into every prompt.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Stop after this many executed actions even if the oracle has not.
    pub fn with_max_iterations(mut self, max: Option<u32>) -> Self {
        self.max_iterations = max;
        self
    }

    /// Clear this loop's memory scope before the first iteration.
    pub fn with_clear_memory(mut self, clear: bool) -> Self {
        self.clear_on_start = clear;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn memory(&self) -> &Arc<dyn DecisionMemory> {
        &self.memory
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    fn enter(&self, phase: &mut LoopPhase, next: LoopPhase) {
        trace!(scope = %self.scope, from = phase.as_str(), to = next.as_str(), "Loop transition");
        *phase = next;
    }

    /// Run until the oracle stops the loop or fails.
    ///
    /// Returns `Err` only when decision memory itself fails; oracle failures
    /// are reported through [`LoopOutcome::failure`].
    pub async fn run(&self) -> Result<LoopOutcome, curator_core::Error> {
        info!(scope = %self.scope, agent = %self.persona.name, actions = self.registry.len(), "Starting dispatch loop");

        if self.clear_on_start {
            let removed = self.memory.clear(&self.scope).await?;
            info!(scope = %self.scope, removed, "Cleared memory before run");
        }

        let catalog = self.registry.catalog();
        let mut phase = LoopPhase::AwaitingDecision;
        let mut state = Value::Null;
        let mut iterations: u32 = 0;
        let mut failure = None;

        loop {
            if self.max_iterations.is_some_and(|max| iterations >= max) {
                warn!(scope = %self.scope, iterations, "Iteration cap reached, stopping");
                self.enter(&mut phase, LoopPhase::Stopped);
                break;
            }

            let records = self.memory.list(&self.scope).await?;
            let prompt = prompt::render(&self.persona, &catalog, &state, &records, &self.context);
            debug!(scope = %self.scope, iteration = iterations + 1, prompt_len = prompt.len(), "Asking oracle");
            trace!(scope = %self.scope, %prompt, "Rendered prompt");

            let decision = match self.oracle.decide(&prompt).await {
                Ok(decision) => decision,
                Err(e) => {
                    error!(scope = %self.scope, error = %e, "Oracle failed, aborting loop");
                    let raw_response = self.fallback(&prompt, &e).await;
                    self.publish(DomainEvent::ErrorOccurred {
                        context: format!("oracle:{}", self.scope),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    failure = Some(LoopFailure { error: e, raw_response });
                    self.enter(&mut phase, LoopPhase::Failed);
                    break;
                }
            };

            self.publish(DomainEvent::DecisionReceived {
                scope: self.scope.clone(),
                action: decision.action.clone(),
                stop: decision.stop,
                timestamp: Utc::now(),
            });

            if decision.stop {
                info!(scope = %self.scope, reason = %decision.reason, "Oracle stopped the loop");
                self.enter(&mut phase, LoopPhase::Stopped);
                break;
            }

            self.enter(&mut phase, LoopPhase::Decided);
            info!(scope = %self.scope, action = %decision.action, reason = %decision.reason, "Decision");
            let handle = self.memory.append(&self.scope, &decision).await?;

            self.enter(&mut phase, LoopPhase::Executing);
            let result = self.execute(&decision).await;

            self.enter(&mut phase, LoopPhase::Recorded);
            self.memory.update(&handle, result.clone()).await?;
            state = result;
            iterations += 1;

            self.throttle.pause().await;
            self.enter(&mut phase, LoopPhase::AwaitingDecision);
        }

        info!(scope = %self.scope, phase = phase.as_str(), iterations, "Dispatch loop finished");
        self.publish(DomainEvent::LoopFinished {
            scope: self.scope.clone(),
            phase: phase.as_str().into(),
            iterations,
            timestamp: Utc::now(),
        });

        Ok(LoopOutcome {
            scope: self.scope.clone(),
            phase,
            iterations,
            state,
            failure,
        })
    }

    /// Ask for free text after a fatal oracle failure so an operator can see
    /// what the model was trying to say.
    async fn fallback(&self, prompt: &str, cause: &OracleError) -> Option<String> {
        debug!(scope = %self.scope, cause = %cause, "Requesting raw oracle response");
        match self.oracle.raw_fallback(prompt).await {
            Ok(text) => {
                warn!(scope = %self.scope, raw = %text, "Raw oracle response");
                Some(text)
            }
            Err(e) => {
                warn!(scope = %self.scope, error = %e, "Raw fallback request failed");
                None
            }
        }
    }

    /// Resolve, coerce and invoke. Every failure becomes an `{"error": ..}` value.
    async fn execute(&self, decision: &Decision) -> Value {
        let Some(capability) = self.registry.resolve(&decision.action) else {
            warn!(scope = %self.scope, action = %decision.action, "Action not found in registry");
            return json!({ "error": METHOD_NOT_FOUND });
        };
        let spec = capability.spec();

        let mut args = match coerce::coerce(&decision.args, spec) {
            Ok(args) => args,
            Err(e) => {
                warn!(scope = %self.scope, action = %spec.name, error = %e, "Argument coercion failed");
                return json!({ "error": e.to_string() });
            }
        };
        coerce::fill_defaults(&mut args, spec);

        let start = std::time::Instant::now();
        let outcome = capability.invoke(args).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.publish(DomainEvent::ActionExecuted {
            scope: self.scope.clone(),
            action: spec.name.clone(),
            success: outcome.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        match outcome {
            Ok(value) => {
                debug!(scope = %self.scope, action = %spec.name, duration_ms, "Action completed");
                value
            }
            Err(e) => {
                error!(scope = %self.scope, action = %spec.name, error = ?e, "Action failed");
                json!({ "error": e.to_string() })
            }
        }
    }
}
