//! Message and thread identity domain types.
//!
//! These are the core value objects that flow through the entire runtime:
//! a user objective arrives, the loop streams assistant output, tool calls
//! and their results are appended, and the full history is persisted per
//! thread. Messages are immutable once appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model
    Assistant,
    /// System instructions (identity, rules)
    System,
    /// Developer-supplied instructions (newer wire formats)
    Developer,
    /// Tool execution result
    Tool,
}

impl Role {
    /// Wire name of this role, as sent to chat-completion backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Developer => "developer",
            Role::Tool => "tool",
        }
    }
}

/// A single message in a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content; None for assistant messages that only carry
    /// tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls issued by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn base(role: Role, content: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::base(Role::User, Some(content.into()))
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::base(Role::Assistant, Some(content.into()))
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::base(Role::System, Some(content.into()))
    }

    /// Create a new developer message.
    pub fn developer(content: impl Into<String>) -> Self {
        Self::base(Role::Developer, Some(content.into()))
    }

    /// Create an assistant message that carries tool invocations and no text.
    pub fn tool_invocation(tool_calls: Vec<MessageToolCall>) -> Self {
        let mut msg = Self::base(Role::Assistant, None);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::base(Role::Tool, Some(content.into()));
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// The text content, if present.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Whether this message carries tool invocations.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an assistant message.
///
/// Arguments stay in their serialized wire form here; the materialized
/// [`crate::tool::ToolCall`] holds the decoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), Some("Hello, agent!"));
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn tool_invocation_has_no_text() {
        let msg = Message::tool_invocation(vec![MessageToolCall {
            id: "c1".into(),
            name: "lookup".into(),
            arguments: r#"{"q":"x"}"#.into(),
        }]);
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.text().is_none());
        assert!(msg.has_tool_calls());
    }

    #[test]
    fn tool_result_correlates_call_id() {
        let msg = Message::tool_result("c1", "42");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(msg.text(), Some("42"));
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.text(), Some("Test message"));
        assert_eq!(deserialized.role, Role::User);
    }

    #[test]
    fn textless_message_omits_content_field() {
        let msg = Message::tool_invocation(vec![]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("\"content\""));
    }

    #[test]
    fn role_wire_names() {
        assert_eq!(Role::Developer.as_str(), "developer");
        assert_eq!(
            serde_json::to_string(&Role::Tool).unwrap(),
            "\"tool\""
        );
    }

    #[test]
    fn thread_ids_are_unique() {
        assert_ne!(ThreadId::new(), ThreadId::new());
        assert_eq!(ThreadId::from("t-1").as_str(), "t-1");
    }
}
