//! Shared test helpers for loop tests.

use async_trait::async_trait;
use curator_core::action::{ActionSpec, Args, Capability};
use curator_core::error::{ActionError, BackendError};
use curator_core::oracle::{OracleBackend, OutputMode};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

/// A mock backend that returns a sequence of scripted replies.
///
/// Each call to `generate` returns the next reply in the queue.
/// Panics if more calls are made than replies provided.
pub struct ScriptedBackend {
    replies: Mutex<Vec<Result<String, BackendError>>>,
    prompts: Mutex<Vec<String>>,
    modes: Mutex<Vec<OutputMode>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<String, BackendError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
            modes: Mutex::new(Vec::new()),
        }
    }

    /// Replies given as raw JSON text, all successful.
    pub fn json(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn modes(&self) -> Vec<OutputMode> {
        self.modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl OracleBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, mode: OutputMode, _timeout: Duration) -> Result<String, BackendError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        self.modes.lock().unwrap().push(mode);

        let replies = self.replies.lock().unwrap();
        if call > replies.len() {
            panic!("ScriptedBackend: no more replies (call #{call}, have {})", replies.len());
        }
        replies[call - 1].clone()
    }
}

/// A capability that records its arguments and returns a fixed result.
pub struct RecordingAction {
    spec: ActionSpec,
    result: Result<Value, String>,
    seen: Mutex<Vec<Args>>,
}

impl RecordingAction {
    pub fn ok(spec: ActionSpec, result: Value) -> Self {
        Self {
            spec,
            result: Ok(result),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(spec: ActionSpec, message: &str) -> Self {
        Self {
            spec,
            result: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<Args> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Capability for RecordingAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        self.seen.lock().unwrap().push(args);
        self.result.clone().map_err(|reason| ActionError::ExecutionFailed {
            action: self.spec.name.clone(),
            reason,
        })
    }
}
