//! Tile loading with request de-duplication.
//!
//! [`TileLoader`] owns the memory cache and the set of in-flight loads behind
//! one mutex. A load request either finds the tile cached, joins nothing
//! because a fetch for the same key is already running, or spawns a task that
//! resolves the tile:
//!
//! ```text
//! load_tile(x, y, z)
//!   ├─ cached & Loaded ─────────────► AlreadyLoaded
//!   ├─ in flight ───────────────────► AlreadyLoading
//!   └─ spawn ─► persistent store ─hit──────────────┐
//!                  └─miss─► URL ─► fetch ─► sniff ─┴─► cache + store + callback
//! ```
//!
//! Every spawned load carries a generation number. [`TileLoader::clear`]
//! forgets all in-flight bookkeeping, so a load finishing afterwards finds its
//! generation gone and is discarded without touching the cache or firing
//! callbacks.

mod state;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheError, CacheStats, StoreError, TileCache, TileStore};
use crate::coord::{TileKey, ZoomRange};
use crate::config::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use crate::events::EventHub;
use crate::provider::{AsyncHttpClient, ProviderRegistry, DEFAULT_TIMEOUT_SECS};
use crate::tile::{TileError, TileRecord, TileStatus};
use crate::view::MapView;

use state::LoaderState;

/// Outcome of [`TileLoader::load_tile`].
#[derive(Debug)]
pub enum LoadRequest {
    /// The tile is already in the cache
    AlreadyLoaded,
    /// A fetch for this tile is already running; no new work was started
    AlreadyLoading,
    /// A load task was spawned; it resolves to the tile's final status
    Started(JoinHandle<TileStatus>),
}

impl LoadRequest {
    pub fn is_started(&self) -> bool {
        matches!(self, LoadRequest::Started(_))
    }
}

/// Result of [`TileLoader::load_visible_tiles`].
#[derive(Debug, Default)]
pub struct VisibleLoad {
    /// Every tile covering the view, row-major.
    pub tiles: Vec<TileKey>,
    /// Loads spawned by this call, in issuance order.
    pub started: Vec<(TileKey, JoinHandle<TileStatus>)>,
}

impl VisibleLoad {
    /// Wait for every started load and collect the final statuses.
    pub async fn wait(self) -> Vec<(TileKey, TileStatus)> {
        let (keys, handles): (Vec<_>, Vec<_>) = self.started.into_iter().unzip();
        let results = join_all(handles).await;

        keys.into_iter()
            .zip(results)
            .filter_map(|(key, result)| match result {
                Ok(status) => Some((key, status)),
                Err(e) => {
                    warn!(tile = %key, error = %e, "Tile load task did not complete");
                    None
                }
            })
            .collect()
    }
}

/// Loader tuning knobs.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Upper bound on a single network fetch
    pub fetch_timeout: Duration,
    /// Reject responses that are not a recognised image format
    pub validate_images: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            validate_images: true,
        }
    }
}

/// Where a tile's bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileSource {
    Store,
    Network,
}

struct LoaderInner<C> {
    state: Mutex<LoaderState>,
    registry: Arc<RwLock<ProviderRegistry>>,
    client: C,
    store: Option<Arc<dyn TileStore>>,
    events: Arc<EventHub>,
    options: LoaderOptions,
}

/// De-duplicating tile loader.
///
/// Cheap to clone; clones share the same cache and in-flight set.
pub struct TileLoader<C> {
    inner: Arc<LoaderInner<C>>,
    runtime: Handle,
}

impl<C> Clone for TileLoader<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            runtime: self.runtime.clone(),
        }
    }
}

/// Assembles a [`TileLoader`].
pub struct TileLoaderBuilder<C> {
    client: C,
    registry: Arc<RwLock<ProviderRegistry>>,
    events: Arc<EventHub>,
    cache: TileCache,
    zoom_range: ZoomRange,
    store: Option<Arc<dyn TileStore>>,
    options: LoaderOptions,
}

impl<C: AsyncHttpClient + 'static> TileLoaderBuilder<C> {
    pub fn cache(mut self, cache: TileCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn zoom_range(mut self, range: ZoomRange) -> Self {
        self.zoom_range = range;
        self
    }

    pub fn events(mut self, events: Arc<EventHub>) -> Self {
        self.events = events;
        self
    }

    pub fn store(mut self, store: Arc<dyn TileStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Finishes the loader; its fetches are spawned on `runtime`.
    pub fn build(self, runtime: Handle) -> TileLoader<C> {
        TileLoader {
            inner: Arc::new(LoaderInner {
                state: Mutex::new(LoaderState::new(self.cache, self.zoom_range)),
                registry: self.registry,
                client: self.client,
                store: self.store,
                events: self.events,
                options: self.options,
            }),
            runtime,
        }
    }
}

impl<C: AsyncHttpClient + 'static> TileLoader<C> {
    /// Starts a builder with a default cache, the default zoom range and no
    /// persistent store.
    pub fn builder(client: C, registry: Arc<RwLock<ProviderRegistry>>) -> TileLoaderBuilder<C> {
        TileLoaderBuilder {
            client,
            registry,
            events: Arc::new(EventHub::new()),
            cache: TileCache::default(),
            zoom_range: ZoomRange::new(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM),
            store: None,
            options: LoaderOptions::default(),
        }
    }

    /// Request a tile.
    ///
    /// Zoom and world bounds are checked synchronously. Everything else,
    /// including a missing provider, is reported through the tile-error
    /// callback once the spawned task runs.
    pub fn load_tile(&self, x: u32, y: u32, zoom: u8) -> Result<LoadRequest, TileError> {
        let key = TileKey::new(x, y, zoom);
        let generation = {
            let mut state = self.inner.state.lock();

            let range = state.zoom_range;
            if !range.contains(zoom) {
                return Err(TileError::ZoomOutOfRange {
                    zoom,
                    min: range.min,
                    max: range.max,
                });
            }
            if !key.is_within_world() {
                return Err(TileError::OutOfBounds(key));
            }

            if state.in_flight.contains_key(&key) {
                debug!(tile = %key, "Load already in flight");
                return Ok(LoadRequest::AlreadyLoading);
            }
            if state.cache.contains(&key) {
                // refresh recency
                if state.cache.get(&key).is_some_and(TileRecord::is_loaded) {
                    return Ok(LoadRequest::AlreadyLoaded);
                }
            }

            state.begin(key)
        };

        let mut record = TileRecord::new(key);
        record.begin_loading();

        let inner = Arc::clone(&self.inner);
        let handle = self
            .runtime
            .spawn(async move { inner.run_load(record, generation).await });
        Ok(LoadRequest::Started(handle))
    }

    /// Cached tile, counting a hit or miss.
    pub fn get_tile(&self, x: u32, y: u32, zoom: u8) -> Option<TileRecord> {
        let key = TileKey::new(x, y, zoom);
        self.inner.state.lock().cache.get(&key).cloned()
    }

    pub fn is_tile_loaded(&self, x: u32, y: u32, zoom: u8) -> bool {
        let key = TileKey::new(x, y, zoom);
        self.inner
            .state
            .lock()
            .cache
            .peek(&key)
            .is_some_and(TileRecord::is_loaded)
    }

    pub fn is_tile_loading(&self, x: u32, y: u32, zoom: u8) -> bool {
        let key = TileKey::new(x, y, zoom);
        self.inner.state.lock().in_flight.contains_key(&key)
    }

    /// Load every tile covering `view` that is neither loaded nor loading.
    pub fn load_visible_tiles(&self, view: &MapView) -> Result<VisibleLoad, TileError> {
        let tiles = view.visible_tiles()?;
        let mut started = Vec::new();

        for key in &tiles {
            let skip = {
                let state = self.inner.state.lock();
                state.in_flight.contains_key(key)
                    || state.cache.peek(key).is_some_and(TileRecord::is_loaded)
            };
            if skip {
                continue;
            }
            if let LoadRequest::Started(handle) = self.load_tile(key.x, key.y, key.zoom)? {
                started.push((*key, handle));
            }
        }

        debug!(
            zoom = view.zoom,
            visible = tiles.len(),
            started = started.len(),
            "Visible tiles requested"
        );
        Ok(VisibleLoad { tiles, started })
    }

    /// Empty the cache and forget in-flight loads.
    ///
    /// Fetches already running keep going, but their results are dropped.
    pub fn clear(&self) {
        let abandoned = {
            let mut state = self.inner.state.lock();
            state.cache.clear();
            let abandoned = state.in_flight.len();
            state.in_flight.clear();
            abandoned
        };
        info!(abandoned_loads = abandoned, "Tile cache cleared");
    }

    /// Empty the memory cache and the persistent store.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.clear();
        if let Some(store) = &self.inner.store {
            store.clear().await?;
            info!("Persistent tile store cleared");
        }
        Ok(())
    }

    pub fn cache_capacity(&self) -> usize {
        self.inner.state.lock().cache.capacity()
    }

    pub fn set_cache_capacity(&self, capacity: usize) -> Result<(), CacheError> {
        let evicted = self.inner.state.lock().cache.set_capacity(capacity)?;
        debug!(capacity, evicted = evicted.len(), "Cache capacity changed");
        Ok(())
    }

    pub fn cache_tile_count(&self) -> usize {
        self.inner.state.lock().cache.len()
    }

    pub fn cleanup_cache(&self) -> usize {
        self.inner.state.lock().cache.cleanup()
    }

    pub fn zoom_range(&self) -> ZoomRange {
        self.inner.state.lock().zoom_range
    }

    /// Change the accepted zoom range, pruning cached tiles outside it.
    pub fn set_zoom_range(&self, range: ZoomRange) {
        let pruned = {
            let mut state = self.inner.state.lock();
            state.zoom_range = range;
            state.cache.retain_zooms(range)
        };
        debug!(?range, pruned, "Zoom range changed");
    }

    /// Cache statistics with in-flight loads folded in.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        let mut stats = state.cache.stats();
        stats.loading_tiles = state.in_flight.len();
        stats.total_tiles += stats.loading_tiles;
        stats
    }

    /// Like [`stats`](Self::stats), plus the persistent store's tile count.
    ///
    /// A store that cannot count, or fails to, leaves `stored_tiles` empty.
    pub async fn stats_with_store(&self) -> CacheStats {
        let mut stats = self.stats();
        if let Some(store) = &self.inner.store {
            stats.stored_tiles = match store.len().await {
                Ok(count) => count,
                Err(e) => {
                    warn!(error = %e, "Could not count stored tiles");
                    None
                }
            };
        }
        stats
    }
}

impl<C: AsyncHttpClient> LoaderInner<C> {
    async fn run_load(self: Arc<Self>, mut record: TileRecord, generation: u64) -> TileStatus {
        let key = record.key;
        let outcome = self.resolve(&mut record).await;

        let source = match outcome {
            Ok((data, source)) => {
                record.mark_loaded(data);
                Some(source)
            }
            Err(e) => {
                record.mark_failed(e);
                None
            }
        };

        {
            let mut state = self.state.lock();
            if !state.finish(key, generation) {
                debug!(tile = %key, generation, "Discarding stale tile load");
                return record.status;
            }
            if record.is_loaded() && state.zoom_range.contains(key.zoom) {
                state.cache.put(record.clone());
            }
        }

        match (&record.status, source) {
            (TileStatus::Loaded, Some(source)) => {
                if source == TileSource::Network {
                    self.persist(&record).await;
                }
                debug!(tile = %key, bytes = record.data_len(), ?source, "Tile loaded");
                self.events.tile_loaded(&record);
            }
            (TileStatus::Failed(error), _) => {
                warn!(tile = %key, url = %record.url, error = %error, "Tile load failed");
                self.events.tile_failed(&record, error);
            }
            _ => {}
        }

        record.status
    }

    /// Produce the tile bytes from the store or the network.
    async fn resolve(&self, record: &mut TileRecord) -> Result<(Bytes, TileSource), TileError> {
        let key = record.key;

        if let Some(store) = &self.store {
            match store.get(&key.store_key()).await {
                Ok(Some(data)) => match self.validate(&data) {
                    Ok(()) => {
                        let url = self.registry.read().generate_tile_url(key.x, key.y, key.zoom);
                        if let Ok(url) = url {
                            record.url = url;
                        }
                        return Ok((data, TileSource::Store));
                    }
                    Err(e) => {
                        warn!(tile = %key, error = %e, "Ignoring unreadable stored tile");
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    warn!(tile = %key, error = %e, "Persistent store lookup failed");
                }
            }
        }

        let url = self
            .registry
            .read()
            .generate_tile_url(key.x, key.y, key.zoom)?;
        record.url = url.clone();

        let body = match tokio::time::timeout(self.options.fetch_timeout, self.client.get(&url)).await {
            Ok(result) => result?,
            Err(_) => return Err(TileError::Timeout),
        };

        let data = Bytes::from(body);
        self.validate(&data)?;
        Ok((data, TileSource::Network))
    }

    fn validate(&self, data: &[u8]) -> Result<(), TileError> {
        if data.is_empty() {
            return Err(TileError::Decode("empty response body".to_string()));
        }
        if self.options.validate_images {
            image::guess_format(data).map_err(|e| TileError::Decode(e.to_string()))?;
        }
        Ok(())
    }

    async fn persist(&self, record: &TileRecord) {
        let (Some(store), Some(data)) = (&self.store, &record.image_data) else {
            return;
        };
        if let Err(e) = store.set(&record.key.store_key(), data.clone()).await {
            warn!(tile = %record.key, error = %e, "Failed to persist tile");
        }
    }
}

#[cfg(test)]
mod tests;
