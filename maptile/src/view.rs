//! Map view geometry: which tiles a viewport covers and how drags move it.

use crate::coord::{
    geo_to_tile, tile_to_geo, tiles_per_axis, GeoCoordinate, TileKey, MAX_LAT, MIN_LAT,
};
use crate::tile::TileError;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Largest number of tiles a single view may cover (a 64x64 tile grid).
pub const MAX_VISIBLE_TILES: usize = 4096;

/// Visible pixel rectangle the host composites tiles into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 800.0, 600.0)
    }
}

/// Center, zoom and viewport taken together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: GeoCoordinate,
    pub zoom: u8,
    pub viewport: Viewport,
    pub tile_size: u32,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: GeoCoordinate::default(),
            zoom: 0,
            viewport: Viewport::default(),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl MapView {
    /// Tiles covering the viewport, row-major from the top-left.
    ///
    /// The four viewport corners are projected to geographic coordinates and
    /// back into tile space, so corners beyond the poles or the antimeridian
    /// are clamped to the edge of the world. A view spanning more than
    /// [`MAX_VISIBLE_TILES`] is rejected before anything is allocated.
    pub fn visible_tiles(&self) -> Result<Vec<TileKey>, TileError> {
        let span = self.visible_span();
        let count = span.count();
        if count > MAX_VISIBLE_TILES as u64 {
            return Err(TileError::TooManyTiles {
                count,
                max: MAX_VISIBLE_TILES,
            });
        }

        let mut tiles = Vec::with_capacity(count as usize);
        for y in span.first_row..=span.last_row {
            for x in span.first_col..=span.last_col {
                tiles.push(TileKey::new(x, y, self.zoom));
            }
        }
        Ok(tiles)
    }

    /// Number of tiles the viewport covers, without enumerating them.
    pub fn visible_tile_count(&self) -> u64 {
        self.visible_span().count()
    }

    fn visible_span(&self) -> TileSpan {
        let zoom = self.zoom;
        let center = geo_to_tile(self.center.latitude, self.center.longitude, zoom);
        let tile_size = f64::from(self.tile_size.max(1));
        let half_w = self.viewport.width / 2.0 / tile_size;
        let half_h = self.viewport.height / 2.0 / tile_size;

        let corners = [
            (center.x - half_w, center.y - half_h),
            (center.x + half_w, center.y - half_h),
            (center.x - half_w, center.y + half_h),
            (center.x + half_w, center.y + half_h),
        ];

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (x, y) in corners {
            let geo = tile_to_geo(x, y, zoom);
            let tile = geo_to_tile(geo.latitude, geo.longitude, zoom);
            min_x = min_x.min(tile.x);
            min_y = min_y.min(tile.y);
            max_x = max_x.max(tile.x);
            max_y = max_y.max(tile.y);
        }

        let last = (tiles_per_axis(zoom) - 1) as f64;
        let first_col = min_x.floor().clamp(0.0, last);
        let first_row = min_y.floor().clamp(0.0, last);
        // A right/bottom edge exactly on a tile boundary does not show the next tile.
        let last_col = (max_x.ceil() - 1.0).clamp(first_col, last);
        let last_row = (max_y.ceil() - 1.0).clamp(first_row, last);

        TileSpan {
            first_col: first_col as u32,
            last_col: last_col as u32,
            first_row: first_row as u32,
            last_row: last_row as u32,
        }
    }

    /// Center after dragging the map content by `(dx, dy)` pixels.
    ///
    /// Dragging right moves the center west; dragging down moves it north.
    /// Longitude wraps around the antimeridian, latitude stops at the
    /// Mercator limit.
    pub fn panned_center(&self, dx: f64, dy: f64) -> GeoCoordinate {
        let tile_size = f64::from(self.tile_size.max(1));
        let center = geo_to_tile(self.center.latitude, self.center.longitude, self.zoom);
        let x = center.x - dx / tile_size;
        let y = center.y - dy / tile_size;
        let geo = tile_to_geo(x, y, self.zoom);

        GeoCoordinate {
            latitude: geo.latitude.clamp(MIN_LAT, MAX_LAT),
            longitude: wrap_longitude(geo.longitude),
        }
    }
}

/// Inclusive column and row bounds of a view.
struct TileSpan {
    first_col: u32,
    last_col: u32,
    first_row: u32,
    last_row: u32,
}

impl TileSpan {
    fn count(&self) -> u64 {
        u64::from(self.last_col - self.first_col + 1) * u64::from(self.last_row - self.first_row + 1)
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}
