//! Thread history persistence for threadclaw.
//!
//! All stores implement the `threadclaw_core::ThreadStore` trait: whole
//! histories in, whole histories out, keyed by thread id.

pub mod file;
pub mod memory;

pub use file::FileThreadStore;
pub use memory::MemoryThreadStore;
