//! Tile loading errors.

use thiserror::Error;

use crate::coord::TileKey;
use crate::provider::ProviderError;

/// Why a tile load was rejected or ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileError {
    /// No provider is active, so no URL could be generated
    #[error("No tile provider configured")]
    ProviderNotConfigured,

    /// Transport failure or non-success HTTP status
    #[error("Network failure: {0}")]
    Network(String),

    /// The fetch did not complete within the configured timeout
    #[error("Tile request timed out")]
    Timeout,

    /// The fetched bytes are not a recognisable image
    #[error("Undecodable tile image: {0}")]
    Decode(String),

    /// Requested zoom is outside the configured bounds
    #[error("Zoom level {zoom} outside allowed range {min}..={max}")]
    ZoomOutOfRange { zoom: u8, min: u8, max: u8 },

    /// Tile column or row does not exist at the requested zoom
    #[error("Tile {0} lies outside the world at its zoom level")]
    OutOfBounds(TileKey),

    /// The view covers more tiles than a single load may request
    #[error("View covers {count} tiles, more than the limit of {max}")]
    TooManyTiles { count: u64, max: usize },
}

impl From<ProviderError> for TileError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotConfigured => TileError::ProviderNotConfigured,
            ProviderError::Timeout(_) => TileError::Timeout,
            other => TileError::Network(other.to_string()),
        }
    }
}
