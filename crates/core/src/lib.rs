//! # Threadclaw Core
//!
//! Domain types, traits, and error definitions for the threadclaw agent
//! runtime. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here: the chat backend, the
//! tool catalog, the thread store, the work queue, and the observers.
//! Implementations live in their respective crates and are injected where
//! runs are composed. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod backend;
pub mod context;
pub mod error;
pub mod message;
pub mod observer;
pub mod payload;
pub mod queue;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use backend::{
    ChatBackend, ChatRequest, ChunkFragment, FragmentDelta, FragmentStream, TokenUsage,
    ToolCallFragment, ToolSchema,
};
pub use context::{DEFAULT_MAX_ITERATIONS, RunContext};
pub use error::{
    BackendError, Error, ObserverError, QueueError, Result, StoreError, ToolError,
};
pub use message::{Message, MessageToolCall, Role, ThreadId};
pub use observer::{Dispatcher, Observer};
pub use payload::{Payload, ResponsePayload, ToolPayload};
pub use queue::{RunJob, WorkQueue};
pub use store::ThreadStore;
pub use tool::{Tool, ToolCall, ToolCatalog, ToolContext, ToolResult};
