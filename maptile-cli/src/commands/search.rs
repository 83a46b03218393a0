//! Place search through the configured geocoder.

use clap::Args;
use console::style;
use maptile::{GeocodeResult, ManagerConfig};

use super::common::create_manager;
use crate::error::CliError;

/// Arguments for `maptile search`.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-form place name, e.g. "Eiffel Tower"
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print the tile containing the result at this zoom
    #[arg(long)]
    pub zoom: Option<u8>,
}

/// Resolve a place name to coordinates.
pub async fn run(args: SearchArgs, config: ManagerConfig) -> Result<(), CliError> {
    let query = args.query.join(" ");
    let manager = create_manager(config)?;

    let handle = manager.search_location(&query)?;
    let result = handle
        .await
        .map_err(|e| CliError::Output(format!("search task failed: {}", e)))??;

    let tile = args.zoom.map(|zoom| {
        manager
            .geo_to_tile(result.latitude, result.longitude, zoom)
            .floor(zoom)
    });

    if args.json {
        let mut value =
            serde_json::to_value(&result).map_err(|e| CliError::Output(e.to_string()))?;
        if let Some(key) = tile {
            value["tile"] = serde_json::json!({ "x": key.x, "y": key.y, "zoom": key.zoom });
        }
        let text =
            serde_json::to_string_pretty(&value).map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", text);
    } else {
        print_result(&result);
        if let Some(key) = tile {
            println!("Tile:      {}", key);
        }
    }
    Ok(())
}

fn print_result(result: &GeocodeResult) {
    println!("{}", style(&result.display_name).bold());
    println!("Latitude:  {:.6}", result.latitude);
    println!("Longitude: {:.6}", result.longitude);
}
