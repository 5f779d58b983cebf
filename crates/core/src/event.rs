//! Domain event system — decoupled observation of running loops.
//!
//! Loops publish events as they decide, execute and finish.
//! Other components can subscribe to react without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The oracle produced a decision
    DecisionReceived {
        scope: String,
        action: String,
        stop: bool,
        timestamp: DateTime<Utc>,
    },

    /// An action ran (or failed to)
    ActionExecuted {
        scope: String,
        action: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A loop reached a terminal phase
    LoopFinished {
        scope: String,
        phase: String, // "stopped", "failed"
        iterations: u32,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
