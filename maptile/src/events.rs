//! Completion notifications.
//!
//! Each kind of completion has a single replaceable callback slot. Every
//! completion is also published as a [`MapEvent`] on a broadcast channel so
//! several observers can follow along without competing for the slots.
//!
//! Callbacks run on whichever task finished the work. Slots are read under a
//! short lock and the callback is invoked after the lock is released, so a
//! callback may freely call back into the manager.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

use crate::geocode::{GeocodeError, GeocodeResult};
use crate::tile::{TileError, TileRecord};

/// Buffered events per subscriber before the slowest one starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

pub type TileLoadedCallback = Arc<dyn Fn(&TileRecord) + Send + Sync>;
pub type TileErrorCallback = Arc<dyn Fn(&TileRecord, &TileError) + Send + Sync>;
pub type GeocodeSuccessCallback = Arc<dyn Fn(&GeocodeResult) + Send + Sync>;
pub type GeocodeErrorCallback = Arc<dyn Fn(&GeocodeError) + Send + Sync>;

/// Something that finished asynchronously.
#[derive(Debug, Clone)]
pub enum MapEvent {
    TileLoaded(TileRecord),
    TileFailed { record: TileRecord, error: TileError },
    GeocodeSucceeded(GeocodeResult),
    GeocodeFailed(GeocodeError),
}

/// Callback slots plus the broadcast sender.
pub struct EventHub {
    tile_loaded: RwLock<Option<TileLoadedCallback>>,
    tile_error: RwLock<Option<TileErrorCallback>>,
    geocode_success: RwLock<Option<GeocodeSuccessCallback>>,
    geocode_error: RwLock<Option<GeocodeErrorCallback>>,
    sender: broadcast::Sender<MapEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            tile_loaded: RwLock::new(None),
            tile_error: RwLock::new(None),
            geocode_success: RwLock::new(None),
            geocode_error: RwLock::new(None),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MapEvent> {
        self.sender.subscribe()
    }

    pub fn set_tile_loaded(&self, callback: TileLoadedCallback) {
        *self.tile_loaded.write() = Some(callback);
    }

    pub fn set_tile_error(&self, callback: TileErrorCallback) {
        *self.tile_error.write() = Some(callback);
    }

    pub fn set_geocode_success(&self, callback: GeocodeSuccessCallback) {
        *self.geocode_success.write() = Some(callback);
    }

    pub fn set_geocode_error(&self, callback: GeocodeErrorCallback) {
        *self.geocode_error.write() = Some(callback);
    }

    pub fn tile_loaded(&self, record: &TileRecord) {
        let callback = self.tile_loaded.read().clone();
        if let Some(callback) = callback {
            callback(record);
        }
        self.publish(MapEvent::TileLoaded(record.clone()));
    }

    pub fn tile_failed(&self, record: &TileRecord, error: &TileError) {
        let callback = self.tile_error.read().clone();
        if let Some(callback) = callback {
            callback(record, error);
        }
        self.publish(MapEvent::TileFailed {
            record: record.clone(),
            error: error.clone(),
        });
    }

    pub fn geocode_succeeded(&self, result: &GeocodeResult) {
        let callback = self.geocode_success.read().clone();
        if let Some(callback) = callback {
            callback(result);
        }
        self.publish(MapEvent::GeocodeSucceeded(result.clone()));
    }

    pub fn geocode_failed(&self, error: &GeocodeError) {
        let callback = self.geocode_error.read().clone();
        if let Some(callback) = callback {
            callback(error);
        }
        self.publish(MapEvent::GeocodeFailed(error.clone()));
    }

    fn publish(&self, event: MapEvent) {
        // Err only means nobody is subscribed.
        if self.sender.send(event).is_err() {
            trace!("No event subscribers");
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
