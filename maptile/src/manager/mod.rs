//! The `MapTileManager` facade.
//!
//! One manager owns one of each component: provider registry, tile loader
//! (with its cache), geocoder, view state and event hub. It is an ordinary
//! value; hosts that need several independent maps create several managers.
//!
//! ```ignore
//! use maptile::{ManagerConfig, MapTileManager};
//!
//! let manager = MapTileManager::new(ManagerConfig::default())?;
//! manager.set_center(40.7128, -74.0060)?;
//! manager.set_zoom(10);
//! manager.set_tile_loaded_callback(|tile| println!("loaded {}", tile.key));
//! manager.load_visible_tiles()?;
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheError, CacheStats, TileCache, TileStore};
use crate::config::{ManagerConfig, MAX_SUPPORTED_ZOOM};
use crate::coord::{self, CoordError, GeoCoordinate, TileCoordinate, TileKey, ZoomRange};
use crate::error::MapError;
use crate::events::{EventHub, MapEvent};
use crate::geocode::{GeocodeError, GeocodeResult, Geocoder};
use crate::loader::{LoadRequest, LoaderOptions, TileLoader, VisibleLoad};
use crate::provider::{
    AsyncHttpClient, AsyncReqwestClient, ProviderConfig, ProviderError, ProviderKind,
    ProviderRegistry, TileProvider,
};
use crate::tile::{TileError, TileRecord};
use crate::view::{MapView, Viewport};

/// Entry point for hosts: tiles, view state, geocoding and notifications.
pub struct MapTileManager<C = AsyncReqwestClient> {
    registry: Arc<RwLock<ProviderRegistry>>,
    loader: TileLoader<C>,
    geocoder: Arc<Geocoder<C>>,
    events: Arc<EventHub>,
    view: Arc<RwLock<MapView>>,
    runtime: Handle,
}

impl MapTileManager<AsyncReqwestClient> {
    /// Creates a manager that fetches over HTTPS with reqwest.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ManagerConfig) -> Result<Self, MapError> {
        let client = AsyncReqwestClient::with_options(config.fetch_timeout, &config.user_agent)?;
        Self::with_client(config, client)
    }
}

impl<C: AsyncHttpClient + Clone + 'static> MapTileManager<C> {
    /// Creates a manager over the given transport, without a persistent store.
    pub fn with_client(config: ManagerConfig, client: C) -> Result<Self, MapError> {
        Self::build(config, client, None)
    }

    /// Creates a manager over the given transport and persistent store.
    pub fn with_client_and_store(
        config: ManagerConfig,
        client: C,
        store: Arc<dyn TileStore>,
    ) -> Result<Self, MapError> {
        Self::build(config, client, Some(store))
    }

    fn build(
        config: ManagerConfig,
        client: C,
        store: Option<Arc<dyn TileStore>>,
    ) -> Result<Self, MapError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| MapError::NoRuntime(e.to_string()))?;

        let mut registry = ProviderRegistry::with_provider(config.provider.clone());
        if let Some(key) = &config.google_api_key {
            registry.set_api_key(ProviderKind::GoogleMaps, key.as_str());
        }
        if let Some(key) = &config.bing_api_key {
            registry.set_api_key(ProviderKind::BingMaps, key.as_str());
        }
        if let Some(attribution) = &config.attribution {
            registry.set_attribution(attribution.as_str());
        }
        let registry = Arc::new(RwLock::new(registry));

        let events = Arc::new(EventHub::new());
        let zoom_range = config.zoom_range();

        let mut builder = TileLoader::builder(client.clone(), Arc::clone(&registry))
            .cache(TileCache::new(config.cache_capacity)?)
            .zoom_range(zoom_range)
            .events(Arc::clone(&events))
            .options(LoaderOptions {
                fetch_timeout: config.fetch_timeout,
                validate_images: config.validate_images,
            });
        if let Some(store) = store {
            builder = builder.store(store);
        }
        let loader = builder.build(runtime.clone());

        let geocoder = Geocoder::with_endpoint(client, config.geocoder_endpoint.clone())
            .with_timeout(config.fetch_timeout);

        let center = GeoCoordinate::new(config.center.latitude, config.center.longitude)?;
        let view = MapView {
            center,
            zoom: zoom_range.clamp(config.zoom),
            viewport: config.viewport,
            tile_size: config.tile_size,
        };

        info!(
            provider = %config.provider,
            capacity = config.cache_capacity,
            min_zoom = zoom_range.min,
            max_zoom = zoom_range.max,
            "Map tile manager created"
        );

        Ok(Self {
            registry,
            loader,
            geocoder: Arc::new(geocoder),
            events,
            view: Arc::new(RwLock::new(view)),
            runtime,
        })
    }

    // Provider

    pub fn set_provider(&self, provider: TileProvider) {
        self.registry.write().set_provider(provider);
    }

    pub fn set_custom_provider(&self, url_template: impl Into<String>) {
        self.registry.write().set_custom_provider(url_template);
    }

    /// Stores a credential for `kind`; an empty key removes it.
    pub fn set_api_key(&self, kind: ProviderKind, key: impl Into<String>) {
        self.registry.write().set_api_key(kind, key);
    }

    pub fn set_attribution(&self, attribution: impl Into<String>) {
        self.registry.write().set_attribution(attribution);
    }

    pub fn provider(&self) -> Option<TileProvider> {
        self.registry.read().provider().cloned()
    }

    pub fn provider_config(&self) -> Option<ProviderConfig> {
        self.registry.read().config()
    }

    pub fn attribution(&self) -> String {
        self.registry.read().attribution()
    }

    pub fn generate_tile_url(&self, x: u32, y: u32, zoom: u8) -> Result<String, ProviderError> {
        self.registry.read().generate_tile_url(x, y, zoom)
    }

    // Tiles

    /// Request a tile. See [`TileLoader::load_tile`].
    pub fn load_tile(&self, x: u32, y: u32, zoom: u8) -> Result<LoadRequest, TileError> {
        self.loader.load_tile(x, y, zoom)
    }

    pub fn get_tile(&self, x: u32, y: u32, zoom: u8) -> Option<TileRecord> {
        self.loader.get_tile(x, y, zoom)
    }

    pub fn is_tile_loaded(&self, x: u32, y: u32, zoom: u8) -> bool {
        self.loader.is_tile_loaded(x, y, zoom)
    }

    pub fn is_tile_loading(&self, x: u32, y: u32, zoom: u8) -> bool {
        self.loader.is_tile_loading(x, y, zoom)
    }

    /// Load the tiles covering the current center, zoom and viewport.
    pub fn load_visible_tiles(&self) -> Result<VisibleLoad, TileError> {
        let view = *self.view.read();
        self.loader.load_visible_tiles(&view)
    }

    /// Tiles covering the current view, without loading anything.
    pub fn visible_tiles(&self) -> Result<Vec<TileKey>, TileError> {
        self.view.read().visible_tiles()
    }

    /// How many tiles the current view covers.
    pub fn visible_tile_count(&self) -> u64 {
        self.view.read().visible_tile_count()
    }

    // Cache

    /// Empty the memory cache. The persistent store is left alone.
    pub fn clear_cache(&self) {
        self.loader.clear();
    }

    /// Empty the memory cache and the persistent store.
    pub async fn clear_all_caches(&self) -> Result<(), MapError> {
        self.loader.clear_all().await?;
        Ok(())
    }

    /// Most tiles the memory cache holds before evicting.
    pub fn cache_capacity(&self) -> usize {
        self.loader.cache_capacity()
    }

    pub fn set_cache_size(&self, max_tiles: usize) -> Result<(), CacheError> {
        self.loader.set_cache_capacity(max_tiles)
    }

    pub fn cache_tile_count(&self) -> usize {
        self.loader.cache_tile_count()
    }

    /// Run an eviction pass; returns the number of tiles evicted.
    pub fn cleanup_cache(&self) -> usize {
        self.loader.cleanup_cache()
    }

    pub fn stats(&self) -> CacheStats {
        self.loader.stats()
    }

    /// Statistics including the persistent store's tile count.
    pub async fn stats_with_store(&self) -> CacheStats {
        self.loader.stats_with_store().await
    }

    // Coordinates

    pub fn geo_to_tile(&self, lat: f64, lng: f64, zoom: u8) -> TileCoordinate {
        coord::geo_to_tile(lat, lng, zoom)
    }

    pub fn tile_to_geo(&self, x: f64, y: f64, zoom: u8) -> GeoCoordinate {
        coord::tile_to_geo(x, y, zoom)
    }

    pub fn tile_to_quadkey(&self, x: u32, y: u32, zoom: u8) -> String {
        coord::tile_to_quadkey(x, y, zoom)
    }

    pub fn quadkey_to_tile(&self, quadkey: &str) -> Result<TileKey, CoordError> {
        coord::quadkey_to_tile(quadkey)
    }

    // View

    pub fn view(&self) -> MapView {
        *self.view.read()
    }

    pub fn center(&self) -> GeoCoordinate {
        self.view.read().center
    }

    pub fn zoom(&self) -> u8 {
        self.view.read().zoom
    }

    pub fn viewport(&self) -> Viewport {
        self.view.read().viewport
    }

    pub fn tile_size(&self) -> u32 {
        self.view.read().tile_size
    }

    pub fn zoom_range(&self) -> ZoomRange {
        self.loader.zoom_range()
    }

    /// Recenter the map. Out-of-range values are clamped; NaN is rejected.
    pub fn set_center(&self, lat: f64, lng: f64) -> Result<(), CoordError> {
        let center = GeoCoordinate::new(lat, lng)?;
        self.view.write().center = center;
        Ok(())
    }

    /// Set the current zoom, clamped into the zoom bounds. Returns the zoom
    /// actually applied.
    pub fn set_zoom(&self, zoom: u8) -> u8 {
        let mut view = self.view.write();
        let applied = self.loader.zoom_range().clamp(zoom);
        view.zoom = applied;
        drop(view);
        if applied != zoom {
            debug!(requested = zoom, applied, "Zoom clamped");
        }
        applied
    }

    pub fn zoom_in(&self) -> u8 {
        self.set_zoom(self.zoom().saturating_add(1))
    }

    pub fn zoom_out(&self) -> u8 {
        self.set_zoom(self.zoom().saturating_sub(1))
    }

    /// Move the map by a drag of `(dx, dy)` pixels and return the new center.
    pub fn pan_by_pixels(&self, dx: f64, dy: f64) -> GeoCoordinate {
        let mut view = self.view.write();
        view.center = view.panned_center(dx, dy);
        view.center
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.view.write().viewport = viewport;
    }

    pub fn set_tile_size(&self, tile_size: u32) -> Result<(), MapError> {
        if tile_size == 0 {
            return Err(MapError::InvalidTileSize(tile_size));
        }
        self.view.write().tile_size = tile_size;
        Ok(())
    }

    /// Raise or lower the minimum zoom. Cached tiles below it are dropped.
    pub fn set_min_zoom(&self, min_zoom: u8) -> Result<(), MapError> {
        self.update_zoom_range(|current| ZoomRange::new(min_zoom, current.max))
    }

    /// Raise or lower the maximum zoom (at most 20). Cached tiles above it are
    /// dropped.
    pub fn set_max_zoom(&self, max_zoom: u8) -> Result<(), MapError> {
        self.update_zoom_range(|current| ZoomRange::new(current.min, max_zoom))
    }

    fn update_zoom_range(
        &self,
        update: impl FnOnce(ZoomRange) -> ZoomRange,
    ) -> Result<(), MapError> {
        // Lock order wherever both are held: view, then loader.
        let mut view = self.view.write();
        let range = update(self.loader.zoom_range());
        if range.min > range.max || range.max > MAX_SUPPORTED_ZOOM {
            return Err(MapError::InvalidZoomBounds {
                min: range.min,
                max: range.max,
                supported: MAX_SUPPORTED_ZOOM,
            });
        }
        self.loader.set_zoom_range(range);
        view.zoom = range.clamp(view.zoom);
        Ok(())
    }

    // Callbacks and events

    pub fn set_tile_loaded_callback<F>(&self, callback: F)
    where
        F: Fn(&TileRecord) + Send + Sync + 'static,
    {
        self.events.set_tile_loaded(Arc::new(callback));
    }

    pub fn set_tile_error_callback<F>(&self, callback: F)
    where
        F: Fn(&TileRecord, &TileError) + Send + Sync + 'static,
    {
        self.events.set_tile_error(Arc::new(callback));
    }

    pub fn set_geocode_success_callback<F>(&self, callback: F)
    where
        F: Fn(&GeocodeResult) + Send + Sync + 'static,
    {
        self.events.set_geocode_success(Arc::new(callback));
    }

    pub fn set_geocode_error_callback<F>(&self, callback: F)
    where
        F: Fn(&GeocodeError) + Send + Sync + 'static,
    {
        self.events.set_geocode_error(Arc::new(callback));
    }

    /// Receive every completion as a [`MapEvent`].
    pub fn subscribe(&self) -> broadcast::Receiver<MapEvent> {
        self.events.subscribe()
    }

    // Geocoding

    /// Search for a place in the background.
    ///
    /// A blank query fails immediately with [`GeocodeError::InvalidQuery`] and
    /// fires no callback. Otherwise the outcome goes to the geocode callbacks
    /// and to the returned handle. The map center is not changed.
    pub fn search_location(
        &self,
        query: &str,
    ) -> Result<JoinHandle<Result<GeocodeResult, GeocodeError>>, GeocodeError> {
        self.spawn_search(query, false)
    }

    /// Like [`search_location`](Self::search_location), but recenters the map
    /// on success.
    pub fn search_location_and_center(
        &self,
        query: &str,
    ) -> Result<JoinHandle<Result<GeocodeResult, GeocodeError>>, GeocodeError> {
        self.spawn_search(query, true)
    }

    fn spawn_search(
        &self,
        query: &str,
        recenter: bool,
    ) -> Result<JoinHandle<Result<GeocodeResult, GeocodeError>>, GeocodeError> {
        self.geocoder.search_url(query)?;

        let query = query.trim().to_string();
        let geocoder = Arc::clone(&self.geocoder);
        let events = Arc::clone(&self.events);
        let view = Arc::clone(&self.view);

        Ok(self.runtime.spawn(async move {
            let outcome = geocoder.search(&query).await;
            match &outcome {
                Ok(result) => {
                    if recenter {
                        view.write().center = result.coordinate();
                    }
                    info!(query = %query, place = %result.display_name, "Location found");
                    events.geocode_succeeded(result);
                }
                Err(e) => {
                    info!(query = %query, error = %e, "Location search failed");
                    events.geocode_failed(e);
                }
            }
            outcome
        }))
    }
}
