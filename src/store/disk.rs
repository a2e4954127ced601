use crate::core::cache::{CacheError, CacheStore, KeyValueCollection};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::debug;

impl From<fjall::Error> for CacheError {
    fn from(e: fjall::Error) -> Self {
        CacheError::Backend(e.to_string())
    }
}

/// A namespace stored as one fjall partition.
pub struct DiskCollection {
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.partition.get(key)?.map(|slice| slice.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.partition.insert(key, value)?;
        Ok(())
    }
}

/// Cache store that survives restarts, so daily metal quotes are fetched once per day.
pub struct DiskStore {
    keyspace: Keyspace,
    partitions: RwLock<HashMap<String, Arc<DiskCollection>>>,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(path)
            .map_err(|e| CacheError::Backend(format!("{}: {e}", path.display())))?;
        let keyspace = fjall::Config::new(path).open()?;
        debug!("Opened disk cache at {}", path.display());
        Ok(Self {
            keyspace,
            partitions: RwLock::new(HashMap::new()),
        })
    }
}

impl CacheStore for DiskStore {
    fn collection(&self, namespace: &str) -> Result<Arc<dyn KeyValueCollection>, CacheError> {
        if let Some(existing) = self
            .partitions
            .read()
            .map_err(|_| CacheError::Backend("disk store lock poisoned".to_string()))?
            .get(namespace)
        {
            return Ok(existing.clone());
        }

        let mut partitions = self
            .partitions
            .write()
            .map_err(|_| CacheError::Backend("disk store lock poisoned".to_string()))?;
        if let Some(existing) = partitions.get(namespace) {
            return Ok(existing.clone());
        }
        let partition = self
            .keyspace
            .open_partition(namespace, PartitionCreateOptions::default())?;
        let collection = Arc::new(DiskCollection::new(partition));
        partitions.insert(namespace.to_string(), collection.clone());
        Ok(collection)
    }
}
