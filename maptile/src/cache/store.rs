//! Persistent tile storage.
//!
//! The loader consults a [`TileStore`] before going to the network and writes
//! freshly fetched tiles back into it. The trait is dyn-compatible so a host
//! can inject any blob store as `Arc<dyn TileStore>`. Keys come from
//! [`TileKey::store_key`](crate::coord::TileKey::store_key).

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported by a persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error in the backing storage
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store is closed or otherwise unavailable
    #[error("Tile store unavailable: {0}")]
    Unavailable(String),

    /// Backend-specific failure
    #[error("Tile store error: {0}")]
    Backend(String),
}

/// Key/value blob storage for encoded tile images.
pub trait TileStore: Send + Sync {
    /// Retrieve a tile, `Ok(None)` if absent.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Bytes>, StoreError>>;

    /// Store or replace a tile.
    fn set(&self, key: &str, value: Bytes) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Delete a tile. Returns whether it existed.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Remove every stored tile.
    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Number of stored tiles, or `None` if the backend cannot tell cheaply.
    fn len(&self) -> BoxFuture<'_, Result<Option<u64>, StoreError>> {
        Box::pin(async { Ok(None) })
    }
}

/// In-memory store on moka, weighted by payload size.
///
/// Useful for hosts without durable storage, where it acts as a second-level
/// cache behind the bounded [`TileCache`](super::TileCache).
pub struct MemoryStore {
    cache: MokaCache<String, Bytes>,
}

impl MemoryStore {
    /// Create a store holding at most `max_size_bytes` of tile data.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            .weigher(|_key: &String, value: &Bytes| -> u32 {
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();
        Self { cache }
    }

    /// Number of stored tiles after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        // 64 MiB
        Self::new(64 * 1024 * 1024)
    }
}

impl TileStore for MemoryStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Bytes>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.get(&key).await) })
    }

    fn set(&self, key: &str, value: Bytes) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.cache.insert(key, value).await;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.remove(&key).await.is_some()) })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.cache.invalidate_all();
            self.cache.run_pending_tasks().await;
            Ok(())
        })
    }

    fn len(&self) -> BoxFuture<'_, Result<Option<u64>, StoreError>> {
        Box::pin(async move { Ok(Some(self.entry_count().await)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::default();
        store
            .set("tile:1:0:0", Bytes::from_static(b"png"))
            .await
            .unwrap();

        let value = store.get("tile:1:0:0").await.unwrap();
        assert_eq!(value, Some(Bytes::from_static(b"png")));
        assert_eq!(store.get("tile:1:1:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::default();
        store.set("k", Bytes::from_static(b"v")).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::default();
        store.set("a", Bytes::from_static(b"1")).await.unwrap();
        store.set("b", Bytes::from_static(b"2")).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.entry_count().await, 0);
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_len_counts_entries() {
        let store: Arc<dyn TileStore> = Arc::new(MemoryStore::default());
        assert_eq!(store.len().await.unwrap(), Some(0));
        store.set("a", Bytes::from_static(b"1")).await.unwrap();
        store.set("b", Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(store.len().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_dyn_compatible() {
        let store: Arc<dyn TileStore> = Arc::new(MemoryStore::default());
        store.set("k", Bytes::from_static(b"v")).await.unwrap();
        assert!(store.get("k").await.unwrap().is_some());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::Unavailable("closed".to_string());
        assert_eq!(err.to_string(), "Tile store unavailable: closed");
    }
}
