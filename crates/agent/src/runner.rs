//! Run entry point and continuation strategies.
//!
//! [`Runner::start`] hydrates the thread from the store, seeds the system
//! prompt on first contact, appends the user objective, and drives loop
//! iterations until the run reaches a terminal state. Where the next
//! iteration executes is a [`Continuation`] decision: inline on the
//! caller's task, or handed to the work queue when the context runs
//! detached.

use std::sync::Arc;

use async_trait::async_trait;
use threadclaw_config::AppConfig;
use threadclaw_core::backend::ChatBackend;
use threadclaw_core::error::Result;
use threadclaw_core::message::{Message, ThreadId};
use threadclaw_core::observer::Observer;
use threadclaw_core::queue::{RunJob, WorkQueue};
use threadclaw_core::store::ThreadStore;
use threadclaw_core::tool::ToolCatalog;
use threadclaw_core::RunContext;
use tracing::{debug, info};

use crate::loop_runner::{AgentLoop, StepOutcome};
use crate::profile::AgentProfile;

/// Decides where a continuing run's next iteration executes.
#[async_trait]
pub trait Continuation: Send + Sync {
    /// Hand over a context that wants another iteration.
    ///
    /// Returns the context when the next iteration should run on the
    /// current task, or `None` when it was scheduled elsewhere.
    async fn schedule(&self, agent_id: &str, ctx: RunContext) -> Result<Option<RunContext>>;
}

/// Keeps every iteration on the caller's task.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineContinuation;

#[async_trait]
impl Continuation for InlineContinuation {
    async fn schedule(&self, _agent_id: &str, ctx: RunContext) -> Result<Option<RunContext>> {
        if ctx.detached() {
            debug!(thread = %ctx.thread_id(), "No work queue wired; continuing inline");
        }
        Ok(Some(ctx))
    }
}

/// Routes detached contexts through the work queue; attached ones stay
/// on the caller's task.
pub struct QueuedContinuation {
    queue: Arc<dyn WorkQueue>,
}

impl QueuedContinuation {
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Continuation for QueuedContinuation {
    async fn schedule(&self, agent_id: &str, ctx: RunContext) -> Result<Option<RunContext>> {
        if !ctx.detached() {
            return Ok(Some(ctx));
        }
        self.queue.submit(RunJob::new(agent_id, ctx)).await?;
        Ok(None)
    }
}

/// Per-run options supplied by the caller.
#[derive(Default)]
pub struct RunOptions {
    observers: Vec<Arc<dyn Observer>>,
    max_iterations: Option<u32>,
    detached: Option<bool>,
    privileged: bool,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_detached(mut self, detached: bool) -> Self {
        self.detached = Some(detached);
        self
    }

    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }
}

/// Composes the loop's collaborators and owns run lifecycles.
pub struct Runner {
    backend: Arc<dyn ChatBackend>,
    catalog: Arc<ToolCatalog>,
    store: Arc<dyn ThreadStore>,
    config: AppConfig,
    continuation: Arc<dyn Continuation>,
}

impl Runner {
    /// Continuations run inline unless [`Runner::with_continuation`]
    /// swaps in a queue-backed strategy.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        catalog: Arc<ToolCatalog>,
        store: Arc<dyn ThreadStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            backend,
            catalog,
            store,
            config,
            continuation: Arc::new(InlineContinuation),
        }
    }

    pub fn with_continuation(mut self, continuation: Arc<dyn Continuation>) -> Self {
        self.continuation = continuation;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Start a run: seed the thread with the objective and drive it.
    pub async fn start(
        &self,
        agent_id: &str,
        thread_id: ThreadId,
        objective: &str,
        options: RunOptions,
    ) -> Result<()> {
        let profile = AgentProfile::resolve(&self.config, agent_id)?;
        let history = self.store.get(&thread_id).await?;

        info!(
            agent = %agent_id,
            thread = %thread_id,
            history_len = history.len(),
            "Starting run"
        );

        let mut ctx = RunContext::new(thread_id)
            .with_history(history)
            .with_system_prompt(&profile.system_prompt)
            .with_max_iterations(options.max_iterations.unwrap_or(profile.max_iterations))
            .with_detached(options.detached.unwrap_or(self.config.agent.detached))
            .with_privileged(options.privileged);
        for observer in options.observers {
            ctx.register_observer(observer);
        }

        // First contact seeds the system prompt; the objective always
        // lands as a user turn. Both are persisted before the backend
        // sees the thread.
        if ctx.history_is_empty() {
            ctx.push(Message::system(&profile.system_prompt));
        }
        ctx.push(Message::user(objective));
        self.store.put(ctx.thread_id(), ctx.history()).await?;

        self.drive(&profile, ctx).await
    }

    /// Resume a previously queued continuation.
    pub async fn resume(&self, agent_id: &str, ctx: RunContext) -> Result<()> {
        let profile = AgentProfile::resolve(&self.config, agent_id)?;
        debug!(
            agent = %agent_id,
            thread = %ctx.thread_id(),
            iteration = ctx.iteration_count(),
            "Resuming run"
        );
        self.drive(&profile, ctx).await
    }

    async fn drive(&self, profile: &AgentProfile, mut ctx: RunContext) -> Result<()> {
        let agent_loop = AgentLoop::new(
            self.backend.clone(),
            self.catalog.clone(),
            self.store.clone(),
            profile.clone(),
        );
        loop {
            match agent_loop.run_iteration(&mut ctx).await? {
                StepOutcome::Done => return Ok(()),
                StepOutcome::Continue => {
                    match self.continuation.schedule(&profile.id, ctx).await? {
                        Some(returned) => ctx = returned,
                        None => return Ok(()),
                    }
                }
            }
        }
    }
}
