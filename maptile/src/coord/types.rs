//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Deepest quadkey level that still fits a `u32` tile coordinate.
pub const MAX_QUADKEY_LEVEL: usize = 30;

/// Identity of a single tile in the quad-tree tiling of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// X coordinate (east-west), 0 at west
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileKey {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Returns true when `x` and `y` address a tile that exists at this zoom.
    pub fn is_within_world(&self) -> bool {
        let n = tiles_per_axis(self.zoom);
        u64::from(self.x) < n && u64::from(self.y) < n
    }

    /// Persistent-store key, e.g. `tile:10:301:384`.
    pub fn store_key(&self) -> String {
        format!("tile:{}:{}:{}", self.zoom, self.x, self.y)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Number of tiles along one axis at the given zoom.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u64 {
    1u64 << u32::from(zoom).min(63)
}

/// Inclusive range of zoom levels a manager will load and cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, zoom: u8) -> bool {
        (self.min..=self.max).contains(&zoom)
    }

    /// Nearest zoom inside the range.
    pub fn clamp(&self, zoom: u8) -> u8 {
        zoom.clamp(self.min, self.max)
    }
}

/// Fractional tile position at some zoom level, before flooring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCoordinate {
    pub x: f64,
    pub y: f64,
}

impl TileCoordinate {
    /// Integer tile containing this position.
    pub fn floor(&self, zoom: u8) -> TileKey {
        let max = (tiles_per_axis(zoom) - 1) as f64;
        TileKey {
            x: self.x.floor().clamp(0.0, max) as u32,
            y: self.y.floor().clamp(0.0, max) as u32,
            zoom,
        }
    }
}

/// A point on the globe in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Builds a coordinate, clamping latitude to [-90, 90] and longitude to
    /// [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordError::NonFinite {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude: longitude.clamp(MIN_LON, MAX_LON),
        })
    }
}

impl Default for GeoCoordinate {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Quadkey contains invalid characters or is too long
    #[error(
        "Invalid quadkey: '{0}' (must contain only digits 0-3 and length <= {max})",
        max = MAX_QUADKEY_LEVEL
    )]
    InvalidQuadKey(String),

    /// Latitude or longitude is NaN or infinite
    #[error("Non-finite coordinate: ({latitude}, {longitude})")]
    NonFinite { latitude: f64, longitude: f64 },
}
