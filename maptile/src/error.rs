//! Crate-level error type.

use thiserror::Error;

use crate::cache::{CacheError, StoreError};
use crate::config::ConfigError;
use crate::coord::CoordError;
use crate::geocode::GeocodeError;
use crate::provider::ProviderError;
use crate::tile::TileError;

/// Any error a [`MapTileManager`](crate::MapTileManager) operation can return.
#[derive(Debug, Error)]
pub enum MapError {
    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tile(#[from] TileError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The manager was created outside a tokio runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// Tile edge length must be positive
    #[error("Invalid tile size {0}: must be at least 1 pixel")]
    InvalidTileSize(u32),

    /// Zoom bounds would be empty or exceed the supported depth
    #[error("Invalid zoom bounds {min}..={max} (supported: 0..={supported})")]
    InvalidZoomBounds { min: u8, max: u8, supported: u8 },
}
