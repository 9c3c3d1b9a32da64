//! In-process work queue for detached continuations.
//!
//! Detached runs hand their next iteration to the queue instead of
//! looping on the caller's task. A single worker drains jobs in
//! submission order, so no two iterations of the same thread ever run
//! concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use threadclaw_core::error::QueueError;
use threadclaw_core::queue::{RunJob, WorkQueue};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::runner::Runner;

/// Channel-backed [`WorkQueue`].
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<RunJob>,
}

impl TaskQueue {
    /// Create the queue and the receiver its worker drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl WorkQueue for TaskQueue {
    async fn submit(&self, job: RunJob) -> Result<(), QueueError> {
        debug!(agent = %job.agent_id, thread = %job.ctx.thread_id(), "Queueing continuation");
        self.tx
            .send(job)
            .map_err(|_| QueueError::Closed("queue worker is gone".to_string()))
    }
}

/// Drains queued jobs back through the runner.
pub struct QueueWorker;

impl QueueWorker {
    /// Spawn the worker task. It exits when every queue handle is dropped.
    pub fn spawn(runner: Arc<Runner>, mut rx: mpsc::UnboundedReceiver<RunJob>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Queue worker started");
            while let Some(job) = rx.recv().await {
                let thread = job.ctx.thread_id().clone();
                if let Err(e) = runner.resume(&job.agent_id, job.ctx).await {
                    // The queue is fire-and-forget; a failed job is logged
                    // and the worker moves on.
                    error!(thread = %thread, error = %e, "Detached run failed");
                }
            }
            info!("Queue worker stopped");
        })
    }
}
