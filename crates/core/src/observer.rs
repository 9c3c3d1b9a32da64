//! Run observers and the payload dispatcher.
//!
//! Observers watch a run without coupling to it: a live transport, a
//! logger, and a batch collector can all follow the same payload stream.
//! Delivery is synchronous (each observer is awaited to completion) and
//! follows registration order. An observer error aborts the run, because
//! observers include the transport that carries output to the caller and
//! continuing past a broken one would silently drop output.

use async_trait::async_trait;

use crate::context::RunContext;
use crate::error::ObserverError;
use crate::payload::Payload;

/// A consumer of run payloads.
///
/// Implementations decide their own side effects (emit to a live channel,
/// log, accumulate for batch output) and must not mutate the run context.
#[async_trait]
pub trait Observer: Send + Sync {
    async fn on_payload(
        &self,
        agent: &str,
        payload: &Payload,
        ctx: &RunContext,
    ) -> std::result::Result<(), ObserverError>;
}

/// Fans payloads out to the observers registered on a run context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher;

impl Dispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Deliver one payload to every registered observer, in registration
    /// order.
    ///
    /// No buffering, no retries: each payload is delivered at most once,
    /// exactly when produced. The first observer error propagates.
    pub async fn notify(
        &self,
        ctx: &RunContext,
        agent: &str,
        payload: &Payload,
    ) -> std::result::Result<(), ObserverError> {
        for observer in ctx.observers() {
            observer.on_payload(agent, payload, ctx).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ThreadId;
    use crate::payload::ResponsePayload;
    use std::sync::{Arc, Mutex};

    /// Records the order it was called in, shared across observers.
    struct OrderObserver {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Observer for OrderObserver {
        async fn on_payload(
            &self,
            _agent: &str,
            _payload: &Payload,
            _ctx: &RunContext,
        ) -> std::result::Result<(), ObserverError> {
            self.log.lock().unwrap().push(self.tag);
            Ok(())
        }
    }

    struct FailingObserver;

    #[async_trait]
    impl Observer for FailingObserver {
        async fn on_payload(
            &self,
            _agent: &str,
            _payload: &Payload,
            _ctx: &RunContext,
        ) -> std::result::Result<(), ObserverError> {
            Err(ObserverError::Delivery("channel closed".into()))
        }
    }

    fn payload() -> Payload {
        Payload::Response(ResponsePayload::text("hi"))
    }

    #[tokio::test]
    async fn notify_follows_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ctx = RunContext::new(ThreadId::from("t-1"))
            .with_observer(Arc::new(OrderObserver { tag: "first", log: log.clone() }))
            .with_observer(Arc::new(OrderObserver { tag: "second", log: log.clone() }));

        Dispatcher::new()
            .notify(&ctx, "agent", &payload())
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn notify_with_no_observers_is_ok() {
        let ctx = RunContext::new(ThreadId::from("t-1"));
        Dispatcher::new()
            .notify(&ctx, "agent", &payload())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn observer_error_propagates_and_stops_fanout() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ctx = RunContext::new(ThreadId::from("t-1"))
            .with_observer(Arc::new(FailingObserver))
            .with_observer(Arc::new(OrderObserver { tag: "late", log: log.clone() }));

        let err = Dispatcher::new()
            .notify(&ctx, "agent", &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, ObserverError::Delivery(_)));
        assert!(log.lock().unwrap().is_empty());
    }
}
