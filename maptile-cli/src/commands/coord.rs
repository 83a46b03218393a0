//! Coordinate conversion commands.
//!
//! Pure math: no provider or network access.

use clap::Subcommand;
use maptile::coord::{geo_to_tile, quadkey_to_tile, tile_to_geo, tile_to_quadkey, GeoCoordinate};

use crate::error::CliError;

/// Coordinate action subcommands.
#[derive(Debug, Subcommand)]
pub enum CoordAction {
    /// Convert latitude/longitude to a tile position
    ToTile {
        /// Latitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        /// Zoom level
        zoom: u8,
    },
    /// Convert a (possibly fractional) tile position to latitude/longitude
    ToGeo {
        x: f64,
        y: f64,
        /// Zoom level
        zoom: u8,
    },
    /// Encode a tile as a Bing quadkey
    Quadkey { x: u32, y: u32, zoom: u8 },
    /// Decode a Bing quadkey into a tile
    FromQuadkey { quadkey: String },
}

/// Run a coordinate subcommand.
pub fn run(action: CoordAction) -> Result<(), CliError> {
    match action {
        CoordAction::ToTile { lat, lon, zoom } => {
            // Rejects NaN and infinities before projecting
            let geo = GeoCoordinate::new(lat, lon)?;
            let tile = geo_to_tile(geo.latitude, geo.longitude, zoom);
            let key = tile.floor(zoom);
            println!("Tile:       {}/{}/{}", key.zoom, key.x, key.y);
            println!("Fractional: x={:.6}, y={:.6}", tile.x, tile.y);
            println!("Quadkey:    {}", tile_to_quadkey(key.x, key.y, key.zoom));
        }
        CoordAction::ToGeo { x, y, zoom } => {
            let geo = tile_to_geo(x, y, zoom);
            println!("Latitude:  {:.6}", geo.latitude);
            println!("Longitude: {:.6}", geo.longitude);
        }
        CoordAction::Quadkey { x, y, zoom } => {
            println!("{}", tile_to_quadkey(x, y, zoom));
        }
        CoordAction::FromQuadkey { quadkey } => {
            let key = quadkey_to_tile(&quadkey)?;
            println!("Tile: {}/{}/{}", key.zoom, key.x, key.y);
        }
    }
    Ok(())
}
