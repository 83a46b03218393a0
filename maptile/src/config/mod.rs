//! Manager configuration.
//!
//! [`ManagerConfig`] holds every knob a [`MapTileManager`](crate::MapTileManager)
//! is built from. It can be assembled in code with the `with_*` setters or
//! loaded from an INI file:
//!
//! ```ini
//! [provider]
//! type = osm
//! google_api_key =
//!
//! [cache]
//! capacity = 100
//!
//! [map]
//! min_zoom = 0
//! max_zoom = 19
//! zoom = 3
//!
//! [network]
//! timeout = 30
//!
//! [geocoder]
//! endpoint = https://nominatim.openstreetmap.org/search
//! ```

mod parser;
mod writer;

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::coord::{GeoCoordinate, ZoomRange};
use crate::geocode::DEFAULT_GEOCODER_ENDPOINT;
use crate::provider::{TileProvider, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::view::{Viewport, DEFAULT_TILE_SIZE};

/// Default lowest zoom level.
pub const DEFAULT_MIN_ZOOM: u8 = 0;

/// Default highest zoom level.
pub const DEFAULT_MAX_ZOOM: u8 = 19;

/// Deepest zoom the zoom bounds may be raised to.
pub const MAX_SUPPORTED_ZOOM: u8 = 20;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write the config file
    #[error("Failed to write config file: {0}")]
    WriteError(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(section: &str, key: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Everything needed to build a manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    pub provider: TileProvider,
    pub google_api_key: Option<String>,
    pub bing_api_key: Option<String>,
    /// Replaces the provider's default attribution text
    pub attribution: Option<String>,
    pub cache_capacity: usize,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub zoom: u8,
    pub tile_size: u32,
    pub center: GeoCoordinate,
    pub viewport: Viewport,
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub validate_images: bool,
    pub geocoder_endpoint: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            provider: TileProvider::OpenStreetMap,
            google_api_key: None,
            bing_api_key: None,
            attribution: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            zoom: DEFAULT_MIN_ZOOM,
            tile_size: DEFAULT_TILE_SIZE,
            center: GeoCoordinate::default(),
            viewport: Viewport::default(),
            fetch_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            validate_images: true,
            geocoder_endpoint: DEFAULT_GEOCODER_ENDPOINT.to_string(),
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: TileProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_google_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_api_key = Some(key.into());
        self
    }

    pub fn with_bing_api_key(mut self, key: impl Into<String>) -> Self {
        self.bing_api_key = Some(key.into());
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_center(mut self, latitude: f64, longitude: f64) -> Self {
        self.center = GeoCoordinate {
            latitude,
            longitude,
        };
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_validate_images(mut self, validate: bool) -> Self {
        self.validate_images = validate;
        self
    }

    pub fn with_geocoder_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.geocoder_endpoint = endpoint.into();
        self
    }

    pub fn zoom_range(&self) -> ZoomRange {
        ZoomRange::new(self.min_zoom, self.max_zoom)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(ConfigError::invalid(
                "map",
                "max_zoom",
                self.max_zoom,
                "must not exceed 20",
            ));
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::invalid(
                "map",
                "min_zoom",
                self.min_zoom,
                "must not exceed max_zoom",
            ));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::invalid(
                "cache",
                "capacity",
                self.cache_capacity,
                "must be at least 1",
            ));
        }
        if self.tile_size == 0 {
            return Err(ConfigError::invalid(
                "map",
                "tile_size",
                self.tile_size,
                "must be at least 1",
            ));
        }
        if let TileProvider::Custom(template) = &self.provider {
            if template.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "provider",
                    "template",
                    template,
                    "custom provider needs a URL template",
                ));
            }
        }
        Ok(())
    }

    /// Load from the default path, falling back to defaults when the file is
    /// missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        parser::parse_ini(&ini)
    }

    /// Parse INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(ini::Error::Parse)?;
        parser::parse_ini(&ini)
    }

    /// Render as INI text.
    pub fn to_ini_string(&self) -> String {
        writer::to_config_string(self)
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_ini_string())?;
        Ok(())
    }
}

/// Per-user configuration directory, e.g. `~/.config/maptile`.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("maptile")
}

/// Default configuration file path.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
