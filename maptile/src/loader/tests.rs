use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::cache::MemoryStore;
use crate::coord::GeoCoordinate;
use crate::provider::{MockAsyncHttpClient, ProviderError, TileProvider, PNG_BYTES};
use crate::view::Viewport;

fn osm_registry() -> Arc<RwLock<ProviderRegistry>> {
    Arc::new(RwLock::new(ProviderRegistry::with_provider(
        TileProvider::OpenStreetMap,
    )))
}

fn loader(mock: &MockAsyncHttpClient) -> TileLoader<MockAsyncHttpClient> {
    TileLoader::builder(mock.clone(), osm_registry()).build(Handle::current())
}

fn started(request: LoadRequest) -> JoinHandle<TileStatus> {
    match request {
        LoadRequest::Started(handle) => handle,
        other => panic!("expected a started load, got {:?}", other),
    }
}

fn counting_events() -> (Arc<EventHub>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let hub = Arc::new(EventHub::new());
    let loaded = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&loaded);
    hub.set_tile_loaded(Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    let counter = Arc::clone(&failed);
    hub.set_tile_error(Arc::new(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    (hub, loaded, failed)
}

#[tokio::test]
async fn test_duplicate_requests_issue_one_fetch() {
    let mock = MockAsyncHttpClient::png().with_delay(Duration::from_millis(50));
    let loader = loader(&mock);

    let handle = started(loader.load_tile(1, 1, 5).unwrap());
    assert!(loader.is_tile_loading(1, 1, 5));
    assert!(matches!(
        loader.load_tile(1, 1, 5).unwrap(),
        LoadRequest::AlreadyLoading
    ));

    assert_eq!(handle.await.unwrap(), TileStatus::Loaded);
    assert_eq!(mock.call_count(), 1);
    assert!(!loader.is_tile_loading(1, 1, 5));
    assert!(loader.is_tile_loaded(1, 1, 5));

    assert!(matches!(
        loader.load_tile(1, 1, 5).unwrap(),
        LoadRequest::AlreadyLoaded
    ));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_loaded_record_contents() {
    let mock = MockAsyncHttpClient::png();
    let loader = loader(&mock);

    started(loader.load_tile(301, 384, 10).unwrap()).await.unwrap();

    let record = loader.get_tile(301, 384, 10).expect("tile cached");
    assert_eq!(record.url, "https://tile.openstreetmap.org/10/301/384.png");
    assert_eq!(record.image_data.as_deref(), Some(PNG_BYTES));
    assert_eq!(mock.urls(), vec![record.url.clone()]);
}

#[tokio::test]
async fn test_zoom_outside_range_is_rejected() {
    let mock = MockAsyncHttpClient::png();
    let loader = loader(&mock);

    let err = loader.load_tile(0, 0, 25).unwrap_err();
    assert_eq!(
        err,
        TileError::ZoomOutOfRange {
            zoom: 25,
            min: 0,
            max: 19
        }
    );
    assert_eq!(loader.cache_tile_count(), 0);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_coordinates_outside_world_are_rejected() {
    let mock = MockAsyncHttpClient::png();
    let loader = loader(&mock);

    assert_eq!(
        loader.load_tile(32, 0, 5).unwrap_err(),
        TileError::OutOfBounds(TileKey::new(32, 0, 5))
    );
    assert!(loader.load_tile(31, 31, 5).is_ok());
}

#[tokio::test]
async fn test_missing_provider_reports_through_callback() {
    let mock = MockAsyncHttpClient::png();
    let (events, loaded, failed) = counting_events();
    let loader = TileLoader::builder(mock.clone(), Arc::new(RwLock::new(ProviderRegistry::new())))
        .events(events)
        .build(Handle::current());

    let status = started(loader.load_tile(0, 0, 1).unwrap()).await.unwrap();

    assert_eq!(status, TileStatus::Failed(TileError::ProviderNotConfigured));
    assert_eq!(failed.load(Ordering::SeqCst), 1);
    assert_eq!(loaded.load(Ordering::SeqCst), 0);
    assert_eq!(mock.call_count(), 0);
    assert_eq!(loader.cache_tile_count(), 0);
}

#[tokio::test]
async fn test_failed_tile_is_not_cached_and_can_retry() {
    let mock = MockAsyncHttpClient::png();
    mock.push_response(Err(ProviderError::HttpStatus {
        status: 404,
        url: "u".to_string(),
    }));
    let (events, loaded, failed) = counting_events();
    let loader = TileLoader::builder(mock.clone(), osm_registry())
        .events(events)
        .build(Handle::current());

    let status = started(loader.load_tile(2, 3, 4).unwrap()).await.unwrap();
    assert!(matches!(status, TileStatus::Failed(TileError::Network(_))));
    assert!(!loader.is_tile_loaded(2, 3, 4));
    assert!(!loader.is_tile_loading(2, 3, 4));
    assert_eq!(failed.load(Ordering::SeqCst), 1);

    let status = started(loader.load_tile(2, 3, 4).unwrap()).await.unwrap();
    assert_eq!(status, TileStatus::Loaded);
    assert_eq!(loaded.load(Ordering::SeqCst), 1);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_fetch_timeout() {
    let mock = MockAsyncHttpClient::png().with_delay(Duration::from_millis(500));
    let loader = TileLoader::builder(mock.clone(), osm_registry())
        .options(LoaderOptions {
            fetch_timeout: Duration::from_millis(10),
            validate_images: true,
        })
        .build(Handle::current());

    let status = started(loader.load_tile(0, 0, 0).unwrap()).await.unwrap();
    assert_eq!(status, TileStatus::Failed(TileError::Timeout));
}

#[tokio::test]
async fn test_non_image_response_fails_decode() {
    let mock = MockAsyncHttpClient::new(Ok(b"<html>rate limited</html>".to_vec()));
    let loader = loader(&mock);

    let status = started(loader.load_tile(0, 0, 0).unwrap()).await.unwrap();
    assert!(matches!(status, TileStatus::Failed(TileError::Decode(_))));
}

#[tokio::test]
async fn test_validation_can_be_disabled() {
    let mock = MockAsyncHttpClient::new(Ok(b"opaque".to_vec()));
    let loader = TileLoader::builder(mock.clone(), osm_registry())
        .options(LoaderOptions {
            validate_images: false,
            ..Default::default()
        })
        .build(Handle::current());

    let status = started(loader.load_tile(0, 0, 0).unwrap()).await.unwrap();
    assert_eq!(status, TileStatus::Loaded);
}

#[tokio::test]
async fn test_empty_body_always_fails() {
    let mock = MockAsyncHttpClient::new(Ok(Vec::new()));
    let loader = TileLoader::builder(mock.clone(), osm_registry())
        .options(LoaderOptions {
            validate_images: false,
            ..Default::default()
        })
        .build(Handle::current());

    let status = started(loader.load_tile(0, 0, 0).unwrap()).await.unwrap();
    assert!(matches!(status, TileStatus::Failed(TileError::Decode(_))));
}

#[tokio::test]
async fn test_store_hit_skips_network() {
    let mock = MockAsyncHttpClient::png();
    let store = Arc::new(MemoryStore::default());
    store
        .set(
            &TileKey::new(5, 5, 4).store_key(),
            Bytes::from_static(PNG_BYTES),
        )
        .await
        .unwrap();

    let loader = TileLoader::builder(mock.clone(), osm_registry())
        .store(store)
        .build(Handle::current());

    let status = started(loader.load_tile(5, 5, 4).unwrap()).await.unwrap();
    assert_eq!(status, TileStatus::Loaded);
    assert_eq!(mock.call_count(), 0);
    assert!(loader.is_tile_loaded(5, 5, 4));
}

#[tokio::test]
async fn test_network_fetch_is_persisted() {
    let mock = MockAsyncHttpClient::png();
    let store = Arc::new(MemoryStore::default());
    let loader = TileLoader::builder(mock.clone(), osm_registry())
        .store(store.clone())
        .build(Handle::current());

    started(loader.load_tile(1, 2, 3).unwrap()).await.unwrap();

    let stored = store.get("tile:3:1:2").await.unwrap();
    assert_eq!(stored.as_deref(), Some(PNG_BYTES));
}

#[tokio::test]
async fn test_clear_discards_stale_completion() {
    let mock = MockAsyncHttpClient::png().with_delay(Duration::from_millis(50));
    let (events, loaded, _) = counting_events();
    let loader = TileLoader::builder(mock.clone(), osm_registry())
        .events(events)
        .build(Handle::current());

    let handle = started(loader.load_tile(0, 0, 1).unwrap());
    loader.clear();
    assert!(!loader.is_tile_loading(0, 0, 1));

    handle.await.unwrap();
    assert_eq!(loader.cache_tile_count(), 0);
    assert_eq!(loaded.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stats_include_in_flight() {
    let mock = MockAsyncHttpClient::png().with_delay(Duration::from_millis(50));
    let loader = loader(&mock);

    started(loader.load_tile(0, 0, 1).unwrap()).await.unwrap();
    let handle = started(loader.load_tile(1, 0, 1).unwrap());

    let stats = loader.stats();
    assert_eq!(stats.loaded_tiles, 1);
    assert_eq!(stats.loading_tiles, 1);
    assert_eq!(stats.total_tiles, 2);

    handle.await.unwrap();
    assert_eq!(loader.stats().loading_tiles, 0);
}

#[tokio::test]
async fn test_hit_rate_after_miss_then_hit() {
    let mock = MockAsyncHttpClient::png();
    let loader = loader(&mock);

    assert!(loader.get_tile(3, 3, 3).is_none());
    started(loader.load_tile(3, 3, 3).unwrap()).await.unwrap();
    assert!(loader.get_tile(3, 3, 3).is_some());

    assert_eq!(loader.stats().hit_rate_percent(), 50.0);
}

#[tokio::test]
async fn test_load_visible_tiles_skips_known_tiles() {
    let mock = MockAsyncHttpClient::png();
    let loader = loader(&mock);
    let view = MapView {
        center: GeoCoordinate::default(),
        zoom: 1,
        viewport: Viewport::new(0.0, 0.0, 512.0, 512.0),
        tile_size: 256,
    };

    let first = loader.load_visible_tiles(&view).unwrap();
    assert_eq!(first.tiles.len(), 4);
    let order: Vec<TileKey> = first.started.iter().map(|(key, _)| *key).collect();
    assert_eq!(order, first.tiles);
    for (_, handle) in first.started {
        handle.await.unwrap();
    }

    let second = loader.load_visible_tiles(&view).unwrap();
    assert_eq!(second.tiles.len(), 4);
    assert!(second.started.is_empty());
    assert_eq!(mock.call_count(), 4);
}

#[tokio::test]
async fn test_narrowing_zoom_range_prunes_cache() {
    let mock = MockAsyncHttpClient::png();
    let loader = loader(&mock);

    started(loader.load_tile(0, 0, 2).unwrap()).await.unwrap();
    started(loader.load_tile(0, 0, 12).unwrap()).await.unwrap();
    assert_eq!(loader.cache_tile_count(), 2);

    loader.set_zoom_range(ZoomRange::new(0, 10));
    assert_eq!(loader.cache_tile_count(), 1);
    assert!(loader.is_tile_loaded(0, 0, 2));
    assert!(loader.load_tile(0, 0, 12).is_err());
}

#[tokio::test]
async fn test_cache_capacity_bounds_loaded_tiles() {
    let mock = MockAsyncHttpClient::png();
    let loader = TileLoader::builder(mock.clone(), osm_registry())
        .cache(TileCache::new(2).unwrap())
        .build(Handle::current());

    for x in 0..4 {
        started(loader.load_tile(x, 0, 2).unwrap()).await.unwrap();
    }
    assert_eq!(loader.cache_tile_count(), 2);
    assert!(loader.is_tile_loaded(3, 0, 2));
    assert!(!loader.is_tile_loaded(0, 0, 2));

    assert!(loader.set_cache_capacity(0).is_err());
    loader.set_cache_capacity(1).unwrap();
    assert_eq!(loader.cache_tile_count(), 1);
}

#[tokio::test]
async fn test_clear_all_empties_store() {
    let mock = MockAsyncHttpClient::png();
    let store = Arc::new(MemoryStore::default());
    let loader = TileLoader::builder(mock.clone(), osm_registry())
        .store(store.clone())
        .build(Handle::current());

    started(loader.load_tile(0, 0, 0).unwrap()).await.unwrap();
    loader.clear_all().await.unwrap();

    assert_eq!(loader.cache_tile_count(), 0);
    assert_eq!(store.get("tile:0:0:0").await.unwrap(), None);
}
