//! Event types for observing pipeline passes
//!
//! Events are sent from a `Pipeline` to any consumer (a UI, a recorder, a
//! test) to report passes, node executions and lifecycle changes.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Receiver of pipeline events
///
/// Implemented by anything that observes passes: a channel forwarder, a
/// recorder, a test buffer. Sinks are shared across pipelines, so `send`
/// takes `&self`.
pub trait EventSink: Send + Sync {
    fn send(&self, event: PipelineEvent) -> Result<(), EventError>;
}

/// Reasons a sink can refuse an event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The consumer behind the sink has gone away
    #[error("Event sink is disconnected")]
    Disconnected,

    /// The sink declined this particular event
    #[error("Event rejected: {0}")]
    Rejected(String),
}

/// Events emitted by a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PipelineEvent {
    /// A pass is about to run its entry nodes
    #[serde(rename_all = "camelCase")]
    PassStarted { pipeline: String },

    /// A member node ran its transform
    #[serde(rename_all = "camelCase")]
    NodeExecuted { pipeline: String, label: String },

    /// A pass finished
    #[serde(rename_all = "camelCase")]
    PassCompleted {
        pipeline: String,
        /// Members that ran during this pass
        executed: usize,
        /// Members that did not run (not reachable or not ready)
        skipped: usize,
    },

    /// Every member was reset
    #[serde(rename_all = "camelCase")]
    PipelineReset { pipeline: String },

    /// The pipeline released its members
    #[serde(rename_all = "camelCase")]
    PipelineDestroyed { pipeline: String },
}

impl PipelineEvent {
    /// Label of the pipeline that emitted the event
    pub fn pipeline(&self) -> &str {
        match self {
            Self::PassStarted { pipeline }
            | Self::NodeExecuted { pipeline, .. }
            | Self::PassCompleted { pipeline, .. }
            | Self::PipelineReset { pipeline }
            | Self::PipelineDestroyed { pipeline } => pipeline,
        }
    }
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: PipelineEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// An event sink that buffers every event it receives
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for CollectingEventSink {
    fn send(&self, event: PipelineEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collecting_event_sink() {
        let sink = CollectingEventSink::new();
        sink.send(PipelineEvent::NodeExecuted {
            pipeline: "p".to_string(),
            label: "n".to_string(),
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            PipelineEvent::NodeExecuted { label, .. } => assert_eq!(label, "n"),
            _ => panic!("Expected NodeExecuted event"),
        }

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        sink.send(PipelineEvent::PassStarted {
            pipeline: "p".to_string(),
        })
        .unwrap();
    }

    #[test]
    fn test_event_error_messages() {
        assert_eq!(
            EventError::Disconnected.to_string(),
            "Event sink is disconnected"
        );
        assert_eq!(
            EventError::Rejected("buffer full".to_string()).to_string(),
            "Event rejected: buffer full"
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::PassCompleted {
            pipeline: "p".to_string(),
            executed: 3,
            skipped: 1,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "passCompleted", "pipeline": "p", "executed": 3, "skipped": 1})
        );
        assert_eq!(event.pipeline(), "p");

        let back: PipelineEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
