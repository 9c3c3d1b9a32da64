//! Scripted in-process backend for tests and offline runs.
//!
//! Each call to `stream_chat` replays the next fragment script in order,
//! so a test can stage a full multi-turn exchange (tool-call turn, then
//! final answer) and assert how many times the loop went back to the
//! backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use threadclaw_core::backend::{ChatBackend, ChatRequest, ChunkFragment, FragmentStream};
use threadclaw_core::error::BackendError;
use tokio::sync::Mutex;

type ScriptItem = std::result::Result<ChunkFragment, BackendError>;

/// A backend that replays pre-staged fragment scripts.
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Vec<ScriptItem>>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    /// Stage one script per expected backend call.
    pub fn new(scripts: Vec<Vec<ChunkFragment>>) -> Self {
        Self::from_results(
            scripts
                .into_iter()
                .map(|script| script.into_iter().map(Ok).collect())
                .collect(),
        )
    }

    /// Stage scripts that may carry mid-stream errors.
    pub fn from_results(scripts: Vec<Vec<ScriptItem>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `stream_chat` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The requests received so far, in call order.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    /// Fragments for a streamed plain-text reply.
    pub fn text_reply(content: &str) -> Vec<ChunkFragment> {
        vec![
            ChunkFragment::role("assistant"),
            ChunkFragment::content(content),
            ChunkFragment::finish("stop"),
        ]
    }

    /// Fragments for a tool-call reply whose arguments stream in parts.
    ///
    /// The id and name ride only on the opening fragment; the rest are
    /// id-less continuations, matching how OpenAI-style backends chunk
    /// arguments.
    pub fn tool_reply(call_id: &str, name: &str, argument_parts: &[&str]) -> Vec<ChunkFragment> {
        let mut fragments = vec![ChunkFragment::role("assistant")];

        match argument_parts.split_first() {
            Some((first, rest)) => {
                fragments.push(ChunkFragment::tool_call(Some(call_id), Some(name), first));
                for part in rest {
                    fragments.push(ChunkFragment::tool_call(None, None, part));
                }
            }
            None => {
                fragments.push(ChunkFragment::tool_call(Some(call_id), Some(name), ""));
            }
        }

        fragments.push(ChunkFragment::finish("tool_calls"));
        fragments
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<FragmentStream, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request);

        let script = self.scripts.lock().await.pop_front().ok_or_else(|| {
            BackendError::NotConfigured(format!("scripted backend has no response for call {call}"))
        })?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            for item in script {
                if tx.send(item).await.is_err() {
                    return; // receiver dropped
                }
            }
        });

        Ok(rx)
    }
}
