pub mod disk;
pub mod ledger_file;
pub mod memory;

use crate::core::cache::CacheStore;
use crate::core::config::AppConfig;
use disk::DiskStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::{debug, warn};

pub use ledger_file::LedgerFile;

/// Picks the quote cache backend. A disk cache that cannot be opened
/// degrades to memory so quotes are still served.
pub fn open_cache_store(config: &AppConfig) -> Arc<dyn CacheStore> {
    if !config.cache.persist {
        debug!("Using in-memory quote cache");
        return Arc::new(MemoryStore::new());
    }

    let opened = config
        .default_data_path()
        .map_err(|e| e.to_string())
        .and_then(|path| {
            let cache_dir = path.join("cache");
            DiskStore::open(&cache_dir)
                .map(|store| (cache_dir, store))
                .map_err(|e| e.to_string())
        });

    match opened {
        Ok((path, store)) => {
            debug!(path = %path.display(), "Using on-disk quote cache");
            Arc::new(store)
        }
        Err(e) => {
            warn!(error = %e, "Quote cache on disk unavailable, falling back to memory");
            Arc::new(MemoryStore::new())
        }
    }
}
