//! Observer implementations.
//!
//! Observers receive every payload a run dispatches. The gateway bridges
//! them onto SSE connections with [`ChannelObserver`], batch callers
//! gather a full response with [`CollectingObserver`], and
//! [`LogObserver`] writes the run transcript to the log.

use async_trait::async_trait;
use threadclaw_core::error::ObserverError;
use threadclaw_core::observer::Observer;
use threadclaw_core::payload::Payload;
use threadclaw_core::RunContext;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Forwards payloads over a bounded channel.
///
/// Delivery fails once the receiver is dropped, which aborts the run.
/// That is the contract a disconnecting streaming client wants.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: mpsc::Sender<Payload>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<Payload>) -> Self {
        Self { tx }
    }

    /// Build an observer and the receiver that drains it.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl Observer for ChannelObserver {
    async fn on_payload(
        &self,
        _agent: &str,
        payload: &Payload,
        _ctx: &RunContext,
    ) -> Result<(), ObserverError> {
        self.tx
            .send(payload.clone())
            .await
            .map_err(|_| ObserverError::Delivery("payload receiver dropped".to_string()))
    }
}

/// Collects every payload in memory.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    payloads: Mutex<Vec<Payload>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything observed so far, in dispatch order.
    pub async fn collected(&self) -> Vec<Payload> {
        self.payloads.lock().await.clone()
    }

    /// The response text assembled from the content payloads.
    pub async fn response_text(&self) -> String {
        self.payloads
            .lock()
            .await
            .iter()
            .filter_map(|p| match p {
                Payload::Response(_) => p.nonempty_content().map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Observer for CollectingObserver {
    async fn on_payload(
        &self,
        _agent: &str,
        payload: &Payload,
        _ctx: &RunContext,
    ) -> Result<(), ObserverError> {
        self.payloads.lock().await.push(payload.clone());
        Ok(())
    }
}

/// Writes the run transcript to the tracing log.
///
/// Content accumulates in a buffer; tool invocations are marked inline;
/// the end payload flushes the assembled transcript at debug level.
#[derive(Debug, Default)]
pub struct LogObserver {
    transcript: Mutex<String>,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Observer for LogObserver {
    async fn on_payload(
        &self,
        agent: &str,
        payload: &Payload,
        ctx: &RunContext,
    ) -> Result<(), ObserverError> {
        match payload {
            Payload::Response(_) => {
                if let Some(content) = payload.nonempty_content() {
                    self.transcript.lock().await.push_str(content);
                }
            }
            Payload::Tool(tool) => {
                let mut transcript = self.transcript.lock().await;
                transcript.push_str(&format!("\n[Tool Invoked: {}]\n", tool.name));
            }
            Payload::End => {
                let mut transcript = self.transcript.lock().await;
                info!(
                    agent = %agent,
                    thread = %ctx.thread_id(),
                    chars = transcript.len(),
                    "Run finished"
                );
                debug!(transcript = %transcript, "Run transcript");
                transcript.clear();
            }
        }
        Ok(())
    }
}
