//! Payload events emitted to run observers.
//!
//! Payloads are the normalized units of streamed output: response text
//! deltas, tool invocations, and the end-of-run marker. They are produced
//! while a run streams, delivered through the dispatcher, and never
//! persisted.

use serde::{Deserialize, Serialize};

use crate::backend::TokenUsage;

/// A normalized unit of streamed output delivered to observers.
///
/// Closed sum type: consumers match exhaustively, transports use the serde
/// tag as the wire event name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// A streamed slice of assistant output
    Response(ResponsePayload),
    /// The model requested a tool invocation
    Tool(ToolPayload),
    /// The run reached a terminal state; this is always the last payload
    End,
}

impl Payload {
    /// Stable name for wire transports (SSE event names, logs).
    pub fn payload_type(&self) -> &'static str {
        match self {
            Payload::Response(_) => "response",
            Payload::Tool(_) => "tool",
            Payload::End => "end",
        }
    }

    /// The display text carried by this payload, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Payload::Response(r) => r.content.as_deref(),
            Payload::Tool(t) => Some(&t.content),
            Payload::End => None,
        }
    }

    /// Content text when it is present and non-empty.
    pub fn nonempty_content(&self) -> Option<&str> {
        self.content().filter(|c| !c.is_empty())
    }
}

/// A slice of streamed assistant text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// The content delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Role advertised by the backend, usually on the first chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Which completion choice this slice belongs to
    #[serde(default)]
    pub choice_index: u32,

    /// Token usage counters, when the backend attaches them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ResponsePayload {
    /// A plain text slice, as most fragments produce.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// Notification that the model asked for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPayload {
    /// Display text (the tool name)
    pub content: String,

    /// The tool being invoked
    pub name: String,

    /// Decoded invocation arguments
    pub arguments: serde_json::Value,
}
