//! Tile caching.
//!
//! Two layers:
//!
//! - [`TileCache`]: bounded, strictly LRU, in memory, owned by the loader
//! - [`TileStore`]: injected key/value blob storage that survives the memory
//!   cache (IndexedDB, disk, ...). [`MemoryStore`] is a moka-backed stand-in.

mod memory;
mod stats;
mod store;

pub use memory::{CacheError, TileCache, DEFAULT_CACHE_CAPACITY};
pub use stats::CacheStats;
pub use store::{BoxFuture, MemoryStore, StoreError, TileStore};
