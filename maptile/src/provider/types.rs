//! Provider types

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// No tile source has been selected, or the template is empty
    #[error("No tile provider configured")]
    NotConfigured,

    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Request exceeded the client timeout
    #[error("Request to {0} timed out")]
    Timeout(String),
}

/// Tile source selection.
///
/// Built-in sources carry their own URL scheme; `Custom` carries a template
/// using the `{x} {y} {z} {quadkey} {s}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TileProvider {
    OpenStreetMap,
    GoogleMaps,
    BingMaps,
    Custom(String),
}

impl TileProvider {
    /// The field-less discriminant, used to key credentials.
    pub fn kind(&self) -> ProviderKind {
        match self {
            TileProvider::OpenStreetMap => ProviderKind::OpenStreetMap,
            TileProvider::GoogleMaps => ProviderKind::GoogleMaps,
            TileProvider::BingMaps => ProviderKind::BingMaps,
            TileProvider::Custom(_) => ProviderKind::Custom,
        }
    }

    /// Returns the provider's name for logging and identification.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

impl fmt::Display for TileProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileProvider::Custom(template) => write!(f, "Custom ({})", template),
            other => f.write_str(other.name()),
        }
    }
}

/// Provider discriminant without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenStreetMap,
    GoogleMaps,
    BingMaps,
    Custom,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenStreetMap => "OpenStreetMap",
            ProviderKind::GoogleMaps => "Google Maps",
            ProviderKind::BingMaps => "Bing Maps",
            ProviderKind::Custom => "Custom",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "osm" | "openstreetmap" => Ok(ProviderKind::OpenStreetMap),
            "google" | "googlemaps" => Ok(ProviderKind::GoogleMaps),
            "bing" | "bingmaps" => Ok(ProviderKind::BingMaps),
            "custom" => Ok(ProviderKind::Custom),
            other => Err(format!(
                "unknown provider '{}': must be one of osm, google, bing, custom",
                other
            )),
        }
    }
}

/// Snapshot of the active provider configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: TileProvider,
    pub url_template: String,
    pub attribution: String,
    pub api_key: Option<String>,
}
