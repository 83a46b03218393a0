//! Tile URL generation.

use clap::Args;
use maptile::ManagerConfig;

use super::common::{create_manager, resolve_provider, ProviderArgs};
use crate::error::CliError;

/// Arguments for `maptile url`.
#[derive(Debug, Args)]
pub struct UrlArgs {
    /// Tile column
    pub x: u32,
    /// Tile row
    pub y: u32,
    /// Zoom level
    pub zoom: u8,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

/// Print the URL of one tile for the resolved provider.
pub fn run(args: UrlArgs, config: ManagerConfig) -> Result<(), CliError> {
    let config = resolve_provider(&args.provider, config)?;
    let manager = create_manager(config)?;

    let url = manager.generate_tile_url(args.x, args.y, args.zoom)?;
    println!("{}", url);
    println!("Attribution: {}", manager.attribution());
    Ok(())
}
