//! Chat backend implementations for threadclaw.
//!
//! All backends implement the `threadclaw_core::ChatBackend` trait and
//! emit raw chunk fragments; interpretation happens in the agent's
//! stream decoder.

pub mod openai_compat;
pub mod scripted;

pub use openai_compat::OpenAiCompatBackend;
pub use scripted::ScriptedBackend;
