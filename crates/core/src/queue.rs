//! WorkQueue trait — decoupled continuation of detached runs.
//!
//! A detached run hands its next iteration to the queue as an independent
//! unit of work; a worker resumes it with the same context later. The
//! in-process implementation lives in the agent crate.

use async_trait::async_trait;

use crate::context::RunContext;
use crate::error::QueueError;

/// One unit of continuation work: resume this run for this agent.
#[derive(Debug)]
pub struct RunJob {
    pub agent_id: String,
    pub ctx: RunContext,
}

impl RunJob {
    pub fn new(agent_id: impl Into<String>, ctx: RunContext) -> Self {
        Self {
            agent_id: agent_id.into(),
            ctx,
        }
    }
}

/// Fire-and-forget hand-off of run continuations.
///
/// `submit` returns as soon as the job is enqueued; no result flows back
/// to the submitter.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn submit(&self, job: RunJob) -> std::result::Result<(), QueueError>;
}
