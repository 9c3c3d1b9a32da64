//! Tool trait and catalog — the abstraction over agent capabilities.
//!
//! Tools are what let the agent act on a request: evaluate an expression,
//! look something up, read the clock. The loop resolves tools by name from
//! a catalog and feeds the results back into the conversation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::backend::ToolSchema;
use crate::error::ToolError;
use crate::message::ThreadId;

/// A fully materialized tool invocation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Backend-assigned call id, unique within a run
    pub call_id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Decoded arguments; always a JSON object
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Decode an accumulated argument buffer into a materialized call.
    ///
    /// An empty buffer decodes to the empty object; anything that does not
    /// decode to a JSON object is rejected as malformed.
    pub fn from_buffer(
        call_id: impl Into<String>,
        name: impl Into<String>,
        buffer: &str,
    ) -> std::result::Result<Self, ToolError> {
        let name = name.into();
        let arguments = if buffer.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            match serde_json::from_str::<serde_json::Value>(buffer) {
                Ok(value @ serde_json::Value::Object(_)) => value,
                Ok(_) => {
                    return Err(ToolError::MalformedArguments {
                        tool: name,
                        reason: "arguments are not a JSON object".into(),
                    });
                }
                Err(e) => {
                    return Err(ToolError::MalformedArguments {
                        tool: name,
                        reason: e.to_string(),
                    });
                }
            }
        };
        Ok(Self {
            call_id: call_id.into(),
            name,
            arguments,
        })
    }

    /// The arguments re-serialized for embedding in a history message.
    pub fn arguments_json(&self) -> String {
        self.arguments.to_string()
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Human-readable tool output
    pub content: String,
}

/// Ambient information handed to a tool at execution time.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The thread this run belongs to
    pub thread_id: ThreadId,

    /// The call being executed
    pub call_id: String,

    /// Whether the run requested elevated rights; enforcement is up to
    /// tools that guard side effects
    pub privileged: bool,
}

/// The core Tool trait.
///
/// Each tool implements this trait and is registered in the ToolCatalog,
/// which the agent loop uses to advertise schemas and execute calls.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator", "lookup").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        cx: &ToolContext,
    ) -> std::result::Result<String, ToolError>;

    /// Convert this tool into a schema for the outbound request.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A catalog of available tools.
///
/// The agent loop uses this to:
/// 1. Get schemas for the tools enabled on a run
/// 2. Look up and execute tools when the model requests them
pub struct ToolCatalog {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Schemas for every registered tool.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Schemas for the named tools, in the given order.
    ///
    /// Names that are not in the catalog are skipped with a warning so a
    /// stale profile degrades instead of failing the run.
    pub fn schemas_for(&self, enabled: &[String]) -> Vec<ToolSchema> {
        enabled
            .iter()
            .filter_map(|name| match self.tools.get(name) {
                Some(tool) => Some(tool.schema()),
                None => {
                    warn!(tool = %name, "enabled tool not in catalog, skipping");
                    None
                }
            })
            .collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}
