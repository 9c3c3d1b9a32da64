//! Lookup tool — queries a local reference index.
//!
//! In production this would hit a real search service or knowledge base.
//! The stub returns deterministic records derived from the query, so the
//! agent loop and ReAct pattern can be tested end-to-end without network
//! access.

use async_trait::async_trait;
use threadclaw_core::error::ToolError;
use threadclaw_core::tool::{Tool, ToolContext};
use tracing::debug;

pub struct LookupTool;

#[async_trait]
impl Tool for LookupTool {
    fn name(&self) -> &str {
        "lookup"
    }

    fn description(&self) -> &str {
        "Look up a record in the local reference index. Returns the best match for the query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "q": {
                    "type": "string",
                    "description": "The query to look up"
                }
            },
            "required": ["q"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _cx: &ToolContext,
    ) -> Result<String, ToolError> {
        let query = arguments["q"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'q' argument".into()))?;

        debug!(query = %query, "Lookup query");
        let record = generate_record(query);
        Ok(serde_json::to_string_pretty(&record).unwrap_or_default())
    }
}

#[derive(serde::Serialize)]
struct LookupRecord {
    query: String,
    record_id: String,
    category: String,
    confidence: f64,
    summary: String,
}

/// Generate a deterministic record based on the query hash.
fn generate_record(query: &str) -> LookupRecord {
    // Simple hash for deterministic but varied results.
    let hash: u32 = query
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

    let categories = [
        "reference",
        "definition",
        "how-to",
        "policy",
        "contact",
        "dataset",
    ];

    LookupRecord {
        query: query.to_string(),
        record_id: format!("rec-{:08x}", hash),
        category: categories[(hash as usize / 7) % categories.len()].to_string(),
        confidence: ((50 + hash % 50) as f64) / 100.0,
        summary: format!("Indexed entry matching '{query}'"),
    }
}
