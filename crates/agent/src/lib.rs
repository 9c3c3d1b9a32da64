//! The agent loop — the heart of ThreadClaw.
//!
//! A run moves through a **request → stream → act** cycle:
//!
//! 1. **Seed** the thread (system prompt on first contact, then the
//!    user's objective)
//! 2. **Request** a streamed completion with the profile's tool schemas
//! 3. **Decode** the fragment stream, forwarding content payloads as
//!    they arrive
//! 4. **If tool calls**: record and execute them, then loop back to
//!    step 2 while iteration budget remains
//! 5. **If text only**: the run is done
//!
//! Every terminal state dispatches a single end payload after all other
//! payloads. Thread history is persisted at each mutation, so a detached
//! continuation picked up by the queue worker sees exactly what an
//! inline run would.

pub mod decoder;
pub mod executor;
pub mod loop_runner;
pub mod observers;
pub mod profile;
pub mod queue;
pub mod runner;

pub use decoder::{DecodeEvent, StreamDecoder};
pub use executor::ToolExecutor;
pub use loop_runner::{AgentLoop, StepOutcome};
pub use observers::{ChannelObserver, CollectingObserver, LogObserver};
pub use profile::AgentProfile;
pub use queue::{QueueWorker, TaskQueue};
pub use runner::{Continuation, InlineContinuation, QueuedContinuation, RunOptions, Runner};
