//! maptile - Raster map tiles for canvas renderers
//!
//! This library fetches, caches and geometrically addresses map tiles from
//! OpenStreetMap, Google Maps, Bing Maps or a custom URL template, and
//! resolves place names through a Nominatim-compatible geocoder.
//!
//! # High-Level API
//!
//! [`MapTileManager`] ties the pieces together:
//!
//! ```ignore
//! use maptile::{ManagerConfig, MapTileManager};
//!
//! let manager = MapTileManager::new(ManagerConfig::default())?;
//! manager.set_center(40.7128, -74.0060)?;
//! manager.set_zoom(10);
//!
//! let load = manager.load_visible_tiles()?;
//! for (key, status) in load.wait().await {
//!     println!("{} {:?}", key, status);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod error;
pub mod events;
pub mod geocode;
pub mod loader;
pub mod logging;
pub mod manager;
pub mod provider;
pub mod tile;
pub mod view;

pub use cache::{CacheStats, MemoryStore, TileStore};
pub use config::ManagerConfig;
pub use coord::{GeoCoordinate, TileCoordinate, TileKey};
pub use error::MapError;
pub use events::MapEvent;
pub use geocode::{GeocodeError, GeocodeResult};
pub use loader::{LoadRequest, VisibleLoad};
pub use manager::MapTileManager;
pub use provider::{ProviderKind, TileProvider};
pub use tile::{TileError, TileRecord, TileStatus};
pub use view::{MapView, Viewport};

/// Version of the maptile library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
