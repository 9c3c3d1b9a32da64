//! ThreadStore trait — keyed persistence for conversation histories.
//!
//! The engine only needs an ordered key-to-blob map: fetch a thread's
//! history, replace it wholesale after each mutation. Implementations
//! live in the store crate (in-memory, file-backed).

use async_trait::async_trait;

use crate::error::StoreError;
use crate::message::{Message, ThreadId};

/// Keyed storage for thread histories.
///
/// `put` has replace-or-create semantics: callers pass the full desired
/// history, not a delta. Concurrent writers to the same thread are not
/// coordinated here; the scheduler keeps one writer per thread.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Fetch the ordered history for a thread; empty if unknown.
    async fn get(&self, thread_id: &ThreadId) -> std::result::Result<Vec<Message>, StoreError>;

    /// Replace the stored history for a thread.
    async fn put(
        &self,
        thread_id: &ThreadId,
        history: &[Message],
    ) -> std::result::Result<(), StoreError>;
}
