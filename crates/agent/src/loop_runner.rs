//! One pass of the agent loop.
//!
//! A pass sends the thread history to the backend, decodes the fragment
//! stream, and either finishes with a text answer or executes the tool
//! calls the model asked for. Tool passes consume one unit of the
//! iteration budget; exhausting the budget ends the run normally.
//!
//! Observer notifications ride alongside: every non-empty content payload
//! is forwarded as it decodes, a tool payload announces each call before
//! execution, and the end payload is dispatched exactly once when the run
//! reaches a terminal state. A failed pass dispatches no end payload.

use std::sync::Arc;

use threadclaw_core::backend::{ChatBackend, ChatRequest};
use threadclaw_core::error::Result;
use threadclaw_core::message::Message;
use threadclaw_core::payload::{Payload, ToolPayload};
use threadclaw_core::store::ThreadStore;
use threadclaw_core::tool::{ToolCall, ToolCatalog};
use threadclaw_core::{Dispatcher, RunContext};
use tracing::{debug, warn};

use crate::decoder::{DecodeEvent, StreamDecoder};
use crate::executor::ToolExecutor;
use crate::profile::AgentProfile;

/// What the loop should do after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Tools ran and budget remains; run another pass.
    Continue,

    /// Terminal state reached; the end payload has been dispatched.
    Done,
}

/// Drives single iterations of the request/stream/execute cycle for one
/// agent profile.
pub struct AgentLoop {
    backend: Arc<dyn ChatBackend>,
    catalog: Arc<ToolCatalog>,
    store: Arc<dyn ThreadStore>,
    executor: ToolExecutor,
    dispatcher: Dispatcher,
    profile: AgentProfile,
}

impl AgentLoop {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        catalog: Arc<ToolCatalog>,
        store: Arc<dyn ThreadStore>,
        profile: AgentProfile,
    ) -> Self {
        let executor = ToolExecutor::new(catalog.clone(), store.clone());
        Self {
            backend,
            catalog,
            store,
            executor,
            dispatcher: Dispatcher::new(),
            profile,
        }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Run one pass against the backend.
    pub async fn run_iteration(&self, ctx: &mut RunContext) -> Result<StepOutcome> {
        debug!(
            thread = %ctx.thread_id(),
            iteration = ctx.iteration_count(),
            history_len = ctx.history().len(),
            "Requesting completion"
        );
        let request = ChatRequest::new(&self.profile.model, ctx.history().to_vec())
            .with_tools(self.catalog.schemas_for(&self.profile.tools));
        let stream = self.backend.stream_chat(request).await?;

        let mut decoder = StreamDecoder::new(stream);
        let mut streamed = String::new();
        let mut pending_calls: Option<Vec<ToolCall>> = None;

        while let Some(event) = decoder.next_event().await? {
            match event {
                DecodeEvent::Content(payload) => {
                    let Some(text) = payload.content.as_deref().filter(|c| !c.is_empty()) else {
                        continue;
                    };
                    streamed.push_str(text);
                    self.dispatcher
                        .notify(ctx, &self.profile.id, &Payload::Response(payload))
                        .await?;
                }
                DecodeEvent::ToolCallsReady(calls) => {
                    pending_calls = Some(calls);
                    break;
                }
            }
        }

        if !streamed.is_empty() {
            ctx.push(Message::assistant(&streamed));
            self.store.put(ctx.thread_id(), ctx.history()).await?;
        }

        let Some(calls) = pending_calls else {
            return self.finish(ctx).await;
        };

        for call in &calls {
            let payload = Payload::Tool(ToolPayload {
                content: call.name.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            });
            self.dispatcher
                .notify(ctx, &self.profile.id, &payload)
                .await?;
        }

        self.executor.run_batch(ctx, &calls).await?;
        ctx.record_iteration();

        if ctx.budget_remaining() {
            Ok(StepOutcome::Continue)
        } else {
            warn!(
                thread = %ctx.thread_id(),
                iterations = ctx.iteration_count(),
                "Iteration budget exhausted"
            );
            self.finish(ctx).await
        }
    }

    /// Dispatch the end payload. Sole emission point, so a run sees it
    /// exactly once, after every other payload.
    async fn finish(&self, ctx: &RunContext) -> Result<StepOutcome> {
        self.dispatcher
            .notify(ctx, &self.profile.id, &Payload::End)
            .await?;
        debug!(thread = %ctx.thread_id(), "Run reached terminal state");
        Ok(StepOutcome::Done)
    }
}
