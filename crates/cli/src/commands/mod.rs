pub mod gateway;
pub mod history;
pub mod onboard;
pub mod run;

use std::sync::Arc;

use threadclaw_config::AppConfig;
use threadclaw_core::store::ThreadStore;
use threadclaw_store::{FileThreadStore, MemoryThreadStore};

/// Build the thread store the config selects.
pub(crate) fn build_store(config: &AppConfig) -> Arc<dyn ThreadStore> {
    match config.store.backend.as_str() {
        "memory" => Arc::new(MemoryThreadStore::new()),
        _ => Arc::new(FileThreadStore::new(config.store_dir())),
    }
}
