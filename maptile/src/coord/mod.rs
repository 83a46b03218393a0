//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, plus Bing-style quadkey encoding.
//! Everything here is pure math with no state.

mod types;

pub use types::{
    tiles_per_axis, CoordError, GeoCoordinate, TileCoordinate, TileKey, MAX_LAT, MAX_LON,
    MAX_QUADKEY_LEVEL, MIN_LAT, MIN_LON, ZoomRange,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to fractional tile coordinates.
///
/// Latitude is clamped to the Web Mercator range (±85.05112878) and longitude
/// to ±180 before projecting, so polar or wrapped inputs never produce
/// infinities.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees
/// * `lng` - Longitude in degrees
/// * `zoom` - Zoom level
#[inline]
pub fn geo_to_tile(lat: f64, lng: f64, zoom: u8) -> TileCoordinate {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let lng = lng.clamp(MIN_LON, MAX_LON);
    let n = tiles_per_axis(zoom) as f64;

    let x = (lng + 180.0) / 360.0 * n;

    let lat_rad = lat.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    TileCoordinate { x, y }
}

/// Converts fractional tile coordinates back to geographic coordinates.
///
/// Integer inputs yield the tile's northwest corner. This is the exact
/// inverse of [`geo_to_tile`] inside the Mercator range.
#[inline]
pub fn tile_to_geo(x: f64, y: f64, zoom: u8) -> GeoCoordinate {
    let n = tiles_per_axis(zoom) as f64;

    let longitude = x / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();

    GeoCoordinate {
        latitude: lat_rad.to_degrees(),
        longitude,
    }
}

/// Encodes a tile as a Bing Maps quadkey.
///
/// One base-4 digit per level, most significant level first; the result has
/// exactly `zoom` characters (empty at zoom 0).
pub fn tile_to_quadkey(x: u32, y: u32, zoom: u8) -> String {
    let mut quadkey = String::with_capacity(zoom as usize);
    for level in (1..=u32::from(zoom)).rev() {
        let bit = level - 1;
        let (x_bit, y_bit) = if bit < u32::BITS {
            ((x >> bit) & 1, (y >> bit) & 1)
        } else {
            (0, 0)
        };
        let digit = b'0' + (2 * y_bit + x_bit) as u8;
        quadkey.push(digit as char);
    }
    quadkey
}

/// Decodes a Bing Maps quadkey into its tile.
///
/// The zoom level equals the quadkey length.
pub fn quadkey_to_tile(quadkey: &str) -> Result<TileKey, CoordError> {
    if quadkey.len() > MAX_QUADKEY_LEVEL {
        return Err(CoordError::InvalidQuadKey(quadkey.to_string()));
    }

    let zoom = quadkey.len() as u8;
    let mut x = 0u32;
    let mut y = 0u32;

    for (i, ch) in quadkey.chars().enumerate() {
        let mask = 1u32 << (zoom as usize - 1 - i);
        match ch {
            '0' => {}
            '1' => x |= mask,
            '2' => y |= mask,
            '3' => {
                x |= mask;
                y |= mask;
            }
            _ => return Err(CoordError::InvalidQuadKey(quadkey.to_string())),
        }
    }

    Ok(TileKey { x, y, zoom })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_york_city_at_zoom_10() {
        let coord = geo_to_tile(40.7128, -74.0060, 10);
        let key = coord.floor(10);
        assert_eq!(key.x, 301);
        assert_eq!(key.y, 385);
    }

    #[test]
    fn test_origin_maps_to_center() {
        let coord = geo_to_tile(0.0, 0.0, 1);
        assert!((coord.x - 1.0).abs() < 1e-12);
        assert!((coord.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_polar_latitude_is_clamped() {
        let north = geo_to_tile(90.0, 0.0, 4);
        let south = geo_to_tile(-90.0, 0.0, 4);
        assert!(north.y.is_finite());
        assert!(south.y.is_finite());
        assert!(north.y.abs() < 1e-6, "north edge should be row 0");
        assert!((south.y - 16.0).abs() < 1e-6, "south edge should be row 16");
    }

    #[test]
    fn test_tile_to_geo_northwest_corner() {
        let geo = tile_to_geo(0.0, 0.0, 3);
        assert!((geo.longitude + 180.0).abs() < 1e-9);
        assert!((geo.latitude - MAX_LAT).abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip_london() {
        for zoom in [0, 5, 10, 15, 19] {
            let coord = geo_to_tile(51.5074, -0.1278, zoom);
            let geo = tile_to_geo(coord.x, coord.y, zoom);
            assert!((geo.latitude - 51.5074).abs() < 1e-6, "zoom {}", zoom);
            assert!((geo.longitude + 0.1278).abs() < 1e-6, "zoom {}", zoom);
        }
    }

    #[test]
    fn test_quadkey_known_values() {
        // Bing Maps Tile System reference example
        assert_eq!(tile_to_quadkey(3, 5, 3), "213");
        assert_eq!(tile_to_quadkey(0, 0, 0), "");
        assert_eq!(tile_to_quadkey(1, 1, 1), "3");
    }

    #[test]
    fn test_quadkey_decode() {
        assert_eq!(quadkey_to_tile("213").unwrap(), TileKey::new(3, 5, 3));
        assert_eq!(quadkey_to_tile("").unwrap(), TileKey::new(0, 0, 0));
    }

    #[test]
    fn test_quadkey_invalid_character() {
        let result = quadkey_to_tile("0124");
        assert_eq!(result, Err(CoordError::InvalidQuadKey("0124".to_string())));
    }

    #[test]
    fn test_quadkey_too_long() {
        let key = "0".repeat(MAX_QUADKEY_LEVEL + 1);
        assert!(quadkey_to_tile(&key).is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_geo_roundtrip_property(
                lat in -85.05..85.05_f64,
                lng in -180.0..180.0_f64,
                zoom in 0u8..=19
            ) {
                let coord = geo_to_tile(lat, lng, zoom);
                let geo = tile_to_geo(coord.x, coord.y, zoom);

                prop_assert!(
                    (geo.latitude - lat).abs() < 1e-6,
                    "Latitude roundtrip failed: {} -> {}", lat, geo.latitude
                );
                prop_assert!(
                    (geo.longitude - lng).abs() < 1e-6,
                    "Longitude roundtrip failed: {} -> {}", lng, geo.longitude
                );
            }

            #[test]
            fn test_tile_coords_in_bounds(
                lat in -90.0..90.0_f64,
                lng in -180.0..180.0_f64,
                zoom in 0u8..=19
            ) {
                let coord = geo_to_tile(lat, lng, zoom);
                let n = tiles_per_axis(zoom) as f64;
                prop_assert!(coord.x >= 0.0 && coord.x <= n);
                prop_assert!(coord.y >= 0.0 && coord.y <= n);
            }

            #[test]
            fn test_quadkey_roundtrip_property(
                x_raw in 0u32..u32::MAX,
                y_raw in 0u32..u32::MAX,
                zoom in 0u8..=20
            ) {
                let n = tiles_per_axis(zoom) as u32;
                let x = x_raw % n;
                let y = y_raw % n;

                let quadkey = tile_to_quadkey(x, y, zoom);
                prop_assert_eq!(quadkey.len(), zoom as usize);
                prop_assert_eq!(quadkey_to_tile(&quadkey)?, TileKey { x, y, zoom });
            }
        }
    }
}
