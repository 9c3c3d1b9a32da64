//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use threadclaw_core::error::StoreError;
use threadclaw_core::message::{Message, ThreadId};
use threadclaw_core::store::ThreadStore;
use tokio::sync::RwLock;

/// An in-memory store that keeps thread histories in a HashMap.
/// Useful for testing and sessions where persistence isn't needed.
pub struct MemoryThreadStore {
    threads: Arc<RwLock<HashMap<ThreadId, Vec<Message>>>>,
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of threads currently held.
    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

impl Default for MemoryThreadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn get(&self, thread_id: &ThreadId) -> Result<Vec<Message>, StoreError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned().unwrap_or_default())
    }

    async fn put(&self, thread_id: &ThreadId, messages: &[Message]) -> Result<(), StoreError> {
        let mut threads = self.threads.write().await;
        threads.insert(thread_id.clone(), messages.to_vec());
        Ok(())
    }
}
