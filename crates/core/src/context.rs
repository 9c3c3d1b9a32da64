//! RunContext — the mutable state of one thread's run.
//!
//! A context is created per run dispatch, hydrated from the thread store,
//! mutated as the loop appends messages, and handed whole to the work
//! queue when a run continues detached. It is owned exclusively by the
//! run executing it.

use std::sync::Arc;

use crate::message::{Message, ThreadId};
use crate::observer::Observer;

/// Default iteration budget when none is configured.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// The mutable state of one thread's run.
pub struct RunContext {
    thread_id: ThreadId,
    history: Vec<Message>,
    system_prompt: String,
    observers: Vec<Arc<dyn Observer>>,
    iteration_count: u32,
    max_iterations: u32,
    detached: bool,
    privileged: bool,
}

impl RunContext {
    pub fn new(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            history: Vec::new(),
            system_prompt: String::new(),
            observers: Vec::new(),
            iteration_count: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            detached: false,
            privileged: false,
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Route continuations through the work queue instead of inline.
    /// Set once at run start, never changed mid-run.
    pub fn with_detached(mut self, detached: bool) -> Self {
        self.detached = detached;
        self
    }

    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Register an observer. Delivery order follows registration order.
    pub fn register_observer(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn observers(&self) -> &[Arc<dyn Observer>] {
        &self.observers
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn history_is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    /// Append a message to the history. The caller persists the snapshot
    /// through the thread store before taking any further step.
    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Count one completed tool-executing iteration.
    pub fn record_iteration(&mut self) {
        self.iteration_count += 1;
    }

    /// Whether the budget allows scheduling another iteration.
    pub fn budget_remaining(&self) -> bool {
        self.iteration_count < self.max_iterations
    }

    pub fn detached(&self) -> bool {
        self.detached
    }

    pub fn privileged(&self) -> bool {
        self.privileged
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("thread_id", &self.thread_id)
            .field("history_len", &self.history.len())
            .field("iteration_count", &self.iteration_count)
            .field("max_iterations", &self.max_iterations)
            .field("detached", &self.detached)
            .field("privileged", &self.privileged)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_empty() {
        let ctx = RunContext::new(ThreadId::from("t-1"));
        assert!(ctx.history_is_empty());
        assert_eq!(ctx.iteration_count(), 0);
        assert!(!ctx.detached());
        assert!(!ctx.privileged());
        assert!(ctx.budget_remaining());
    }

    #[test]
    fn push_appends_in_order() {
        let mut ctx = RunContext::new(ThreadId::from("t-1"));
        ctx.push(Message::system("You are helpful"));
        ctx.push(Message::user("2+2?"));
        assert_eq!(ctx.history().len(), 2);
        assert_eq!(ctx.last_message().unwrap().text(), Some("2+2?"));
    }

    #[test]
    fn budget_exhausts_after_max_iterations() {
        let mut ctx = RunContext::new(ThreadId::from("t-1")).with_max_iterations(1);
        assert!(ctx.budget_remaining());
        ctx.record_iteration();
        assert!(!ctx.budget_remaining());
    }

    #[test]
    fn builder_flags_stick() {
        let ctx = RunContext::new(ThreadId::from("t-1"))
            .with_detached(true)
            .with_privileged(true)
            .with_system_prompt("You are helpful");
        assert!(ctx.detached());
        assert!(ctx.privileged());
        assert_eq!(ctx.system_prompt(), "You are helpful");
    }

    #[test]
    fn debug_omits_observer_contents() {
        let ctx = RunContext::new(ThreadId::from("t-1"));
        let debug = format!("{ctx:?}");
        assert!(debug.contains("t-1"));
        assert!(debug.contains("observers"));
    }
}
