//! Clock tool — reads the current date and time.
//!
//! Models have no reliable sense of "now"; this gives the agent a way to
//! anchor answers about dates, deadlines, and elapsed time.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use threadclaw_core::error::ToolError;
use threadclaw_core::tool::{Tool, ToolContext};

pub struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &str {
        "clock"
    }

    fn description(&self) -> &str {
        "Read the current UTC date and time. Returns RFC 3339 by default, or a Unix timestamp."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "enum": ["rfc3339", "unix"],
                    "description": "Output format (default: rfc3339)",
                    "default": "rfc3339"
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _cx: &ToolContext,
    ) -> Result<String, ToolError> {
        let now = Utc::now();

        match arguments["format"].as_str().unwrap_or("rfc3339") {
            "unix" => Ok(now.timestamp().to_string()),
            "rfc3339" => Ok(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown format '{other}', expected 'rfc3339' or 'unix'"
            ))),
        }
    }
}
