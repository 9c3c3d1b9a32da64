//! File-based thread store — one JSON document per thread.
//!
//! Each thread lives at `<dir>/<thread_id>.json` as a pretty-printed array
//! of messages. Simple, portable, human-inspectable, and requires zero
//! external dependencies (no SQLite, no Postgres).
//!
//! Default location: `~/.threadclaw/threads/`

use async_trait::async_trait;
use std::path::PathBuf;
use threadclaw_core::error::StoreError;
use threadclaw_core::message::{Message, ThreadId};
use threadclaw_core::store::ThreadStore;
use tracing::debug;

/// A file-backed store that persists each thread as its own JSON file.
///
/// Writes go to a temp file first and are renamed into place, so a crash
/// mid-write never leaves a half-written history behind.
pub struct FileThreadStore {
    dir: PathBuf,
}

impl FileThreadStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory is created on first write, not here.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn thread_path(&self, thread_id: &ThreadId) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_id(thread_id.as_str())))
    }
}

/// Map a thread id to a safe file stem.
///
/// Thread ids can come from HTTP paths and CLI flags, so anything outside
/// [A-Za-z0-9._-] is replaced to keep the file inside the store directory.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl ThreadStore for FileThreadStore {
    async fn get(&self, thread_id: &ThreadId) -> Result<Vec<Message>, StoreError> {
        let path = self.thread_path(thread_id);

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read thread file {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            StoreError::Serialization(format!(
                "Corrupt thread file {}: {e}",
                path.display()
            ))
        })
    }

    async fn put(&self, thread_id: &ThreadId, messages: &[Message]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            StoreError::Storage(format!("Failed to create thread directory: {e}"))
        })?;

        let content = serde_json::to_string_pretty(messages)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize thread: {e}")))?;

        let path = self.thread_path(thread_id);
        let tmp = path.with_extension("json.tmp");

        std::fs::write(&tmp, &content).map_err(|e| {
            StoreError::Storage(format!("Failed to write thread file: {e}"))
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            StoreError::Storage(format!("Failed to commit thread file: {e}"))
        })?;

        debug!(thread = %thread_id, messages = messages.len(), path = %path.display(), "Thread persisted");
        Ok(())
    }
}
