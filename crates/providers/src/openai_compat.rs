//! OpenAI-compatible chat backend.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, Fireworks AI,
//! and any endpoint that speaks the `/chat/completions` protocol.
//!
//! Streams responses as raw chunk fragments over a channel. This backend
//! does no tool-call assembly: each SSE `data:` line maps to the fragments
//! it carries, exactly as they arrived on the wire, and the agent's stream
//! decoder interprets them.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use threadclaw_config::BackendConfig;
use threadclaw_core::backend::{
    ChatBackend, ChatRequest, ChunkFragment, FragmentDelta, FragmentStream, TokenUsage,
    ToolCallFragment, ToolSchema,
};
use threadclaw_core::error::BackendError;
use threadclaw_core::message::Message;
use tracing::{debug, trace, warn};

/// An OpenAI-compatible chat backend.
///
/// This covers the vast majority of hosted and local LLM servers since
/// most expose an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI backend (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama backend (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Build a backend from the `[backend]` config section.
    ///
    /// Local endpoints accept any key; hosted ones without a configured key
    /// fail here rather than with a 401 mid-run.
    pub fn from_config(config: &BackendConfig) -> std::result::Result<Self, BackendError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None if is_local_url(&config.base_url) => "local".to_string(),
            None => {
                return Err(BackendError::NotConfigured(
                    "no API key set; export THREADCLAW_API_KEY or set backend.api_key".into(),
                ));
            }
        };

        Ok(Self::new(
            infer_backend_name(&config.base_url),
            &config.base_url,
            api_key,
        ))
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool schemas to OpenAI API format.
    fn to_api_tools(tools: &[ToolSchema]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<FragmentStream, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        if let Some(ref tools) = request.tools {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
        }

        debug!(backend = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(BackendError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(BackendError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend streaming error");
            return Err(BackendError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let backend_name = self.name.clone();

        // Spawn task to read the SSE byte stream and forward raw fragments
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(BackendError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                // Append new bytes to our line buffer
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    // Skip empty lines and SSE comments
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    // Handle "data: ..." lines
                    if let Some(data) = line.strip_prefix("data: ") {
                        let data = data.trim();

                        // "[DONE]" signals end of stream; dropping the
                        // sender closes the fragment channel
                        if data == "[DONE]" {
                            return;
                        }

                        match serde_json::from_str::<StreamResponse>(data) {
                            Ok(chunk) => {
                                for fragment in fragments_from_chunk(chunk) {
                                    if tx.send(Ok(fragment)).await.is_err() {
                                        return; // receiver dropped
                                    }
                                }
                            }
                            Err(e) => {
                                trace!(
                                    backend = %backend_name,
                                    data = %data,
                                    error = %e,
                                    "Ignoring unparseable SSE chunk"
                                );
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Name a backend after the endpoint it points at.
fn infer_backend_name(base_url: &str) -> &'static str {
    if base_url.contains("api.openai.com") {
        "openai"
    } else if base_url.contains("openrouter.ai") {
        "openrouter"
    } else if base_url.contains(":11434") {
        "ollama"
    } else {
        "openai-compat"
    }
}

fn is_local_url(base_url: &str) -> bool {
    base_url.contains("localhost") || base_url.contains("127.0.0.1")
}

/// Map one parsed wire chunk to the raw fragments it carries.
///
/// One fragment per choice, in wire order. A usage block arrives on its own
/// trailer chunk with no choices and becomes a bare counters-only fragment.
/// No assembly happens here.
fn fragments_from_chunk(chunk: StreamResponse) -> Vec<ChunkFragment> {
    let usage = chunk.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let mut fragments: Vec<ChunkFragment> = chunk
        .choices
        .into_iter()
        .map(|choice| ChunkFragment {
            delta: Some(FragmentDelta {
                content: choice.delta.content,
                role: choice.delta.role,
                tool_calls: choice
                    .delta
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|tc| ToolCallFragment {
                        call_id: tc.id,
                        name: tc.function.as_ref().and_then(|f| f.name.clone()),
                        arguments: tc.function.and_then(|f| f.arguments).unwrap_or_default(),
                    })
                    .collect(),
            }),
            choice_index: choice.index,
            finish_reason: choice.finish_reason,
            usage: None,
        })
        .collect();

    if let Some(usage) = usage {
        fragments.push(ChunkFragment {
            delta: None,
            choice_index: 0,
            finish_reason: None,
            usage: Some(usage),
        });
    }

    fragments
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta — arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadclaw_core::message::MessageToolCall;

    #[test]
    fn openai_constructor() {
        let backend = OpenAiCompatBackend::openai("sk-test");
        assert_eq!(backend.name(), "openai");
        assert!(backend.base_url.contains("api.openai.com"));
    }

    #[test]
    fn ollama_constructor() {
        let backend = OpenAiCompatBackend::ollama(None);
        assert_eq!(backend.name(), "ollama");
        assert!(backend.base_url.contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = OpenAiCompatBackend::new("test", "https://example.com/v1/", "key");
        assert_eq!(backend.base_url, "https://example.com/v1");
    }

    #[test]
    fn from_config_requires_key_for_hosted_endpoints() {
        let config = BackendConfig {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "gpt-4o".into(),
        };
        let err = OpenAiCompatBackend::from_config(&config).err();
        assert!(matches!(err, Some(BackendError::NotConfigured(_))));
    }

    #[test]
    fn from_config_allows_keyless_local_endpoints() {
        let config = BackendConfig {
            base_url: "http://localhost:11434/v1".into(),
            api_key: None,
            model: "llama3".into(),
        };
        let backend = OpenAiCompatBackend::from_config(&config).ok();
        assert_eq!(
            backend.map(|b| b.name().to_string()).as_deref(),
            Some("ollama")
        );
    }

    #[test]
    fn backend_name_inference() {
        assert_eq!(infer_backend_name("https://api.openai.com/v1"), "openai");
        assert_eq!(
            infer_backend_name("https://openrouter.ai/api/v1"),
            "openrouter"
        );
        assert_eq!(infer_backend_name("http://127.0.0.1:11434/v1"), "ollama");
        assert_eq!(infer_backend_name("https://example.com/v1"), "openai-compat");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatBackend::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let msg = Message::tool_invocation(vec![MessageToolCall {
            id: "call_1".into(),
            name: "calculator".into(),
            arguments: r#"{"expression":"2+2"}"#.into(),
        }]);
        let api_msgs = OpenAiCompatBackend::to_api_messages(&[msg]);
        assert_eq!(api_msgs.len(), 1);
        assert!(api_msgs[0].content.is_none());
        let tc = api_msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc.len(), 1);
        assert_eq!(tc[0].function.name, "calculator");
        assert_eq!(tc[0].r#type, "function");
    }

    #[test]
    fn message_conversion_tool_result() {
        let msg = Message::tool_result("call_1", "result data");
        let api_msgs = OpenAiCompatBackend::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_schema_conversion() {
        let tools = vec![ToolSchema {
            name: "lookup".into(),
            description: "Look up a record".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatBackend::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "lookup");
        assert_eq!(api_tools[0].r#type, "function");
    }

    // --- SSE parsing tests ---

    #[test]
    fn parse_stream_content_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"},"index":0,"finish_reason":null}]}"#;
        let parsed: StreamResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("Hello"));
        assert!(parsed.choices[0].finish_reason.is_none());
    }

    #[test]
    fn parse_stream_finish_chunk() {
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        let parsed: StreamResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices[0].finish_reason.as_deref(), Some("stop"));
        assert!(parsed.choices[0].delta.content.is_none());
    }

    #[test]
    fn parse_stream_tool_call_delta() {
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_abc","function":{"name":"calculator","arguments":""}}]},"finish_reason":null}]}"#;
        let parsed: StreamResponse = serde_json::from_str(data).unwrap();
        let tc = &parsed.choices[0].delta.tool_calls.as_ref().unwrap()[0];
        assert_eq!(tc.id.as_deref(), Some("call_abc"));
        assert_eq!(
            tc.function.as_ref().unwrap().name.as_deref(),
            Some("calculator")
        );
    }

    #[test]
    fn parse_stream_tool_call_arguments_delta() {
        // Arguments arrive incrementally; the id appears only on the
        // opening delta
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"expr\""}}]},"finish_reason":null}]}"#;
        let parsed: StreamResponse = serde_json::from_str(data).unwrap();
        let tc = &parsed.choices[0].delta.tool_calls.as_ref().unwrap()[0];
        assert!(tc.id.is_none());
        assert_eq!(
            tc.function.as_ref().unwrap().arguments.as_deref(),
            Some("{\"expr\"")
        );
    }

    #[test]
    fn parse_stream_usage_trailer() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        let parsed: StreamResponse = serde_json::from_str(data).unwrap();
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 5);
        assert_eq!(usage.total_tokens, 15);
    }

    // --- Fragment mapping tests ---

    #[test]
    fn content_chunk_maps_to_raw_fragment() {
        let data = r#"{"choices":[{"delta":{"role":"assistant","content":"Hi"},"index":0,"finish_reason":null}]}"#;
        let chunk: StreamResponse = serde_json::from_str(data).unwrap();
        let fragments = fragments_from_chunk(chunk);
        assert_eq!(fragments.len(), 1);
        let delta = fragments[0].delta.as_ref().unwrap();
        assert_eq!(delta.content.as_deref(), Some("Hi"));
        assert_eq!(delta.role.as_deref(), Some("assistant"));
        assert!(fragments[0].finish_reason.is_none());
    }

    #[test]
    fn tool_call_chunk_is_not_assembled() {
        // A continuation delta stays a partial fragment; assembly is the
        // stream decoder's job
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"1}"}}]},"index":0,"finish_reason":null}]}"#;
        let chunk: StreamResponse = serde_json::from_str(data).unwrap();
        let fragments = fragments_from_chunk(chunk);
        let delta = fragments[0].delta.as_ref().unwrap();
        assert_eq!(delta.tool_calls.len(), 1);
        assert!(delta.tool_calls[0].call_id.is_none());
        assert!(delta.tool_calls[0].name.is_none());
        assert_eq!(delta.tool_calls[0].arguments, "1}");
    }

    #[test]
    fn finish_chunk_carries_reason() {
        let data = r#"{"choices":[{"delta":{},"index":0,"finish_reason":"tool_calls"}]}"#;
        let chunk: StreamResponse = serde_json::from_str(data).unwrap();
        let fragments = fragments_from_chunk(chunk);
        assert_eq!(fragments[0].finish_reason.as_deref(), Some("tool_calls"));
        let delta = fragments[0].delta.as_ref().unwrap();
        assert!(delta.content.is_none());
        assert!(delta.tool_calls.is_empty());
    }

    #[test]
    fn usage_trailer_maps_to_counters_only_fragment() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":7,"completion_tokens":3,"total_tokens":10}}"#;
        let chunk: StreamResponse = serde_json::from_str(data).unwrap();
        let fragments = fragments_from_chunk(chunk);
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].delta.is_none());
        assert_eq!(fragments[0].usage.as_ref().unwrap().total_tokens, 10);
    }

    #[test]
    fn multiple_choices_map_to_separate_fragments() {
        let data = r#"{"choices":[{"delta":{"content":"a"},"index":0,"finish_reason":null},{"delta":{"content":"b"},"index":1,"finish_reason":null}]}"#;
        let chunk: StreamResponse = serde_json::from_str(data).unwrap();
        let fragments = fragments_from_chunk(chunk);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].choice_index, 0);
        assert_eq!(fragments[1].choice_index, 1);
    }
}
