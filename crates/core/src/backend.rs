//! ChatBackend trait — the abstraction over streaming chat-completion APIs.
//!
//! A backend accepts the current history plus the tool schemas enabled for
//! the run and returns a live stream of raw chunk fragments. It only frames
//! the wire protocol: fragment interpretation and tool-call assembly happen
//! downstream in the agent's stream decoder.
//!
//! Implementations: OpenAI-compatible HTTP endpoints, and a scripted
//! in-process backend for tests and offline use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::BackendError;
use crate::message::Message;

/// A request to a chat backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "gpt-4o", "llama3")
    pub model: String,

    /// The conversation history, oldest first
    pub messages: Vec<Message>,

    /// Schemas for the tools enabled for this run; None sends no catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSchema>>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            stream: true,
        }
    }

    /// Attach the enabled tool schemas. An empty set means no catalog.
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }
}

/// A tool schema sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Token usage counters attached to a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One raw streamed fragment from the backend.
///
/// Mirrors a single chunk of an OpenAI-style completion stream, reduced to
/// the fields the decoder consumes. A fragment without a delta is one the
/// decoder skips (keep-alives, usage-only trailers, malformed chunks).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkFragment {
    /// The delta carried by this fragment, absent for non-delta chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<FragmentDelta>,

    /// Which completion choice this fragment belongs to
    #[serde(default)]
    pub choice_index: u32,

    /// Why the stream stopped, on the final fragment of a turn
    /// ("stop", "tool_calls", or a provider-specific reason)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Usage counters, when the backend attaches them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ChunkFragment {
    /// A content-bearing fragment.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            delta: Some(FragmentDelta {
                content: Some(text.into()),
                ..FragmentDelta::default()
            }),
            ..Self::default()
        }
    }

    /// A fragment announcing the assistant role (typically the first chunk).
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            delta: Some(FragmentDelta {
                role: Some(role.into()),
                ..FragmentDelta::default()
            }),
            ..Self::default()
        }
    }

    /// A fragment carrying one partial tool call.
    pub fn tool_call(call_id: Option<&str>, name: Option<&str>, arguments: &str) -> Self {
        Self {
            delta: Some(FragmentDelta {
                tool_calls: vec![ToolCallFragment {
                    call_id: call_id.map(str::to_string),
                    name: name.map(str::to_string),
                    arguments: arguments.to_string(),
                }],
                ..FragmentDelta::default()
            }),
            ..Self::default()
        }
    }

    /// A bare finish fragment with an empty delta.
    pub fn finish(reason: impl Into<String>) -> Self {
        Self {
            delta: Some(FragmentDelta::default()),
            finish_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Attach a finish reason to this fragment.
    pub fn with_finish(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    /// Attach usage counters to this fragment.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// The delta carried by one fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FragmentDelta {
    /// Partial content text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Role advertised by the backend, usually on the first chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Partial tool calls
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallFragment>,
}

/// A partial tool call inside a fragment delta.
///
/// Arguments stream as text chunks across fragments; a fragment that omits
/// the call id continues the most recently seen call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallFragment {
    /// Backend-assigned call id; absent on continuation chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,

    /// Tool name; usually present only on the chunk that opens the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// A slice of the serialized argument payload
    #[serde(default)]
    pub arguments: String,
}

/// The receiving end of a backend fragment stream.
pub type FragmentStream = mpsc::Receiver<std::result::Result<ChunkFragment, BackendError>>;

/// The core backend trait.
///
/// The agent loop calls `stream_chat` without knowing which backend is
/// behind it.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai", "scripted").
    fn name(&self) -> &str;

    /// Send a request and stream back raw chunk fragments.
    ///
    /// The stream ends when the sender side is dropped; transport failures
    /// arrive as `Err` items.
    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<FragmentStream, BackendError>;
}
