//! Durable key-value storage backing the place store, the saved set and
//! the itinerary repository.

use anyhow::Result;
use async_trait::async_trait;
use fjall::Keyspace;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tokio::task;

/// Whole-value storage addressed by fixed string keys
#[async_trait]
pub trait DurableStorage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn store(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// On-disk storage in a fjall keyspace
pub struct FjallStorage {
    _db: fjall::Database,
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl FjallStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(path.as_ref())?;
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("wanderlens", fjall::KeyspaceCreateOptions::default)?;
        Ok(FjallStorage {
            _db: db,
            store: items,
        })
    }
}

#[async_trait]
impl DurableStorage for FjallStorage {
    #[tracing::instrument(name = "load_durable", level = "debug", skip(self))]
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || get_from_store(store, key)).await?
    }

    #[tracing::instrument(name = "store_durable", level = "debug", skip(self, bytes), fields(len = bytes.len()))]
    async fn store(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    #[tracing::instrument(name = "remove_durable", level = "debug", skip(self))]
    async fn remove(&self, key: &str) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// Process-local storage for ephemeral sessions and tests
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }
}

#[async_trait]
impl DurableStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn store(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.entries.lock().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
