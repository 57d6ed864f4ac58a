//! Progress events: what the agent is doing while it answers a question.
//!
//! Events are published on an [`EventBus`] as the orchestrator moves through
//! its phases. Front ends subscribe to show progress; nothing in the pipeline
//! depends on anyone listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All agent progress events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Query expansion finished.
    QueryExpanded {
        queries: Vec<String>,
        /// True when expansion failed and the raw question is used instead.
        fell_back: bool,
        timestamp: DateTime<Utc>,
    },

    /// A tool is about to be invoked.
    HopStarted {
        hop: u32,
        tool: String,
        args: serde_json::Value,
        timestamp: DateTime<Utc>,
    },

    /// A tool invocation finished.
    HopCompleted {
        hop: u32,
        tool: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Something failed and the agent recovered by degrading.
    Degraded {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The final answer was produced.
    Answered {
        hops: u32,
        low_confidence: bool,
        cited: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for agent events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<AgentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AgentEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AgentEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
