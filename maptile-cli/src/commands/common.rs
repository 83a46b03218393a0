//! Common types and utilities shared across CLI commands.

use std::path::Path;

use clap::{Args, ValueEnum};
use maptile::provider::{ProviderKind, TileProvider};
use maptile::{ManagerConfig, MapTileManager};

use crate::error::CliError;

/// Tile provider selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ProviderType {
    /// OpenStreetMap standard tiles (no API key required)
    Osm,
    /// Google Maps road tiles (API key optional)
    Google,
    /// Bing Maps road tiles addressed by quadkey
    Bing,
    /// Custom URL template, given with --template
    Custom,
}

impl ProviderType {
    /// Parse from config file string.
    pub fn from_config_str(s: &str) -> Option<Self> {
        s.parse::<ProviderKind>().ok().map(Self::from)
    }
}

impl From<ProviderKind> for ProviderType {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::OpenStreetMap => ProviderType::Osm,
            ProviderKind::GoogleMaps => ProviderType::Google,
            ProviderKind::BingMaps => ProviderType::Bing,
            ProviderKind::Custom => ProviderType::Custom,
        }
    }
}

/// Provider overrides accepted by every command that talks to a tile source.
#[derive(Debug, Clone, Default, Args)]
pub struct ProviderArgs {
    /// Tile provider (defaults to the configured one)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderType>,

    /// URL template for the custom provider, e.g. https://host/{z}/{x}/{y}.png
    #[arg(long)]
    pub template: Option<String>,

    /// API key for the selected provider
    #[arg(long)]
    pub api_key: Option<String>,
}

/// Resolve provider settings from CLI args and config.
///
/// CLI values take precedence. A custom provider needs a template, either
/// from `--template` or from the configured custom provider.
pub fn resolve_provider(
    args: &ProviderArgs,
    mut config: ManagerConfig,
) -> Result<ManagerConfig, CliError> {
    let provider = args
        .provider
        .or_else(|| args.template.as_ref().map(|_| ProviderType::Custom))
        .unwrap_or_else(|| ProviderType::from(config.provider.kind()));

    config.provider = match provider {
        ProviderType::Osm => TileProvider::OpenStreetMap,
        ProviderType::Google => TileProvider::GoogleMaps,
        ProviderType::Bing => TileProvider::BingMaps,
        ProviderType::Custom => {
            let template = match (&args.template, &config.provider) {
                (Some(template), _) => template.clone(),
                (None, TileProvider::Custom(template)) => template.clone(),
                (None, _) => {
                    return Err(CliError::Config(
                        "The custom provider requires a URL template. \
                         Use --template or set [provider] template in config.ini"
                            .to_string(),
                    ))
                }
            };
            TileProvider::Custom(template)
        }
    };

    if let Some(key) = &args.api_key {
        match provider {
            ProviderType::Google => config.google_api_key = Some(key.clone()),
            ProviderType::Bing => config.bing_api_key = Some(key.clone()),
            ProviderType::Osm | ProviderType::Custom => {
                tracing::warn!(provider = ?provider, "Ignoring --api-key for a provider without credentials")
            }
        }
    }

    Ok(config)
}

/// Load the configuration from `path`, or from the default location.
///
/// A missing file yields the defaults; a malformed one is an error.
pub fn load_config(path: Option<&Path>) -> Result<ManagerConfig, CliError> {
    let config = match path {
        Some(path) => ManagerConfig::load_from(path)?,
        None => ManagerConfig::load()?,
    };
    Ok(config)
}

/// Build a manager over the real HTTP client.
pub fn create_manager(config: ManagerConfig) -> Result<MapTileManager, CliError> {
    Ok(MapTileManager::new(config)?)
}
