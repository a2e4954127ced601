use crate::core::cache::{CacheError, CacheStore, KeyValueCollection};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// In-memory namespace backed by a HashMap.
#[derive(Default)]
pub struct MemoryCollection {
    inner: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let map = self.inner.lock().await;
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let mut map = self.inner.lock().await;
        map.insert(key.to_string(), value);
        Ok(())
    }
}

/// Process-local cache store; namespaces are created on first use.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn collection(&self, namespace: &str) -> Result<Arc<dyn KeyValueCollection>, CacheError> {
        if let Some(existing) = self
            .collections
            .read()
            .map_err(|_| CacheError::Backend("memory store lock poisoned".to_string()))?
            .get(namespace)
        {
            return Ok(existing.clone());
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| CacheError::Backend("memory store lock poisoned".to_string()))?;
        let collection = collections
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new()));
        Ok(collection.clone())
    }
}
