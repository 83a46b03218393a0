//! CLI error handling with user-friendly messages.
//!
//! Every command returns `Result<(), CliError>`; `main` turns the error into
//! a message on stderr and a non-zero exit code.

use std::fmt;
use std::process;

use maptile::config::ConfigError;
use maptile::coord::CoordError;
use maptile::provider::ProviderError;
use maptile::{GeocodeError, MapError, TileError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration could not be read, validated or written
    Config(String),
    /// Invalid coordinate or quadkey argument
    Coordinate(CoordError),
    /// The tile manager could not be created
    Manager(MapError),
    /// Tile URL generation failed
    Provider(ProviderError),
    /// A tile request was rejected
    Tile(TileError),
    /// Place search failed
    Geocode(GeocodeError),
    /// Failed to write an output file
    FileWrite { path: String, error: std::io::Error },
    /// Output could not be serialized
    Output(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Provider(ProviderError::NotConfigured) => {
                eprintln!();
                eprintln!("Select a provider with --provider, or set [provider] type in config.ini.");
                eprintln!("Custom providers also need --template.");
            }
            CliError::Geocode(GeocodeError::Network(_) | GeocodeError::Timeout) => {
                eprintln!();
                eprintln!("The public Nominatim service is rate limited to one request per second.");
                eprintln!("Set [geocoder] endpoint in config.ini to use another instance.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Coordinate(e) => write!(f, "Invalid coordinate: {}", e),
            CliError::Manager(e) => write!(f, "Failed to create tile manager: {}", e),
            CliError::Provider(e) => write!(f, "Cannot build tile URL: {}", e),
            CliError::Tile(e) => write!(f, "Tile request rejected: {}", e),
            CliError::Geocode(e) => write!(f, "Search failed: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
            CliError::Output(msg) => write!(f, "Failed to format output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Coordinate(e) => Some(e),
            CliError::Manager(e) => Some(e),
            CliError::Provider(e) => Some(e),
            CliError::Tile(e) => Some(e),
            CliError::Geocode(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<MapError> for CliError {
    fn from(e: MapError) -> Self {
        CliError::Manager(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Coordinate(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<TileError> for CliError {
    fn from(e: TileError) -> Self {
        CliError::Tile(e)
    }
}

impl From<GeocodeError> for CliError {
    fn from(e: GeocodeError) -> Self {
        CliError::Geocode(e)
    }
}
