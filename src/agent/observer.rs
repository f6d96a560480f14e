//! Live progress sink for a running turn.
//!
//! Observers only display what the reasoner is doing. Nothing they receive is
//! stored in the transcript.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// One progress event from a reasoner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Thought { text: String },
    ToolCall { tool: String, input: String },
    ToolResult { tool: String, output: String },
    Token { text: String },
}

impl TurnEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            TurnEvent::Thought { .. } => "thought",
            TurnEvent::ToolCall { .. } => "tool_call",
            TurnEvent::ToolResult { .. } => "tool_result",
            TurnEvent::Token { .. } => "token",
        }
    }
}

/// Write-only sink for reasoner progress
pub trait TurnObserver: Send + Sync {
    fn on_event(&self, event: TurnEvent);

    fn on_thought(&self, text: &str) {
        self.on_event(TurnEvent::Thought { text: text.to_string() });
    }

    fn on_tool_call(&self, tool: &str, input: &str) {
        self.on_event(TurnEvent::ToolCall { tool: tool.to_string(), input: input.to_string() });
    }

    fn on_tool_result(&self, tool: &str, output: &str) {
        self.on_event(TurnEvent::ToolResult { tool: tool.to_string(), output: output.to_string() });
    }

    fn on_token(&self, text: &str) {
        self.on_event(TurnEvent::Token { text: text.to_string() });
    }
}

/// Discards everything.
pub struct NullObserver;

impl TurnObserver for NullObserver {
    fn on_event(&self, _event: TurnEvent) {}
}

/// Sends events to a channel, e.g. the web UI's SSE stream.
pub struct ChannelObserver {
    tx: UnboundedSender<TurnEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<TurnEvent>) -> Self {
        Self { tx }
    }
}

impl TurnObserver for ChannelObserver {
    fn on_event(&self, event: TurnEvent) {
        // Receiver gone means the client disconnected; the turn still completes
        if self.tx.send(event).is_err() {
            debug!("Turn observer receiver dropped");
        }
    }
}

/// Collects events in memory.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingObserver {
    pub events: std::sync::Mutex<Vec<TurnEvent>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub fn events(&self) -> Vec<TurnEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl TurnObserver for RecordingObserver {
    fn on_event(&self, event: TurnEvent) {
        self.events.lock().unwrap().push(event);
    }
}
