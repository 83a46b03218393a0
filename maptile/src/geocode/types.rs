//! Geocoding result and error types

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::coord::GeoCoordinate;

/// A resolved place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

impl GeocodeResult {
    pub fn coordinate(&self) -> GeoCoordinate {
        GeoCoordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl fmt::Display for GeocodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.6}, {:.6})",
            self.display_name, self.latitude, self.longitude
        )
    }
}

/// Errors that can occur during a location search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeError {
    /// Query is empty after trimming
    #[error("Search query is empty")]
    InvalidQuery,

    /// The endpoint returned no candidates
    #[error("Location not found")]
    LocationNotFound,

    /// Transport failure or non-success HTTP status
    #[error("Geocoding request failed: {0}")]
    Network(String),

    /// The request did not complete in time
    #[error("Geocoding request timed out")]
    Timeout,

    /// Response body is not the expected JSON
    #[error("Malformed geocoding response: {0}")]
    Decode(String),

    /// The configured endpoint is not a valid URL
    #[error("Invalid geocoder endpoint: {0}")]
    InvalidEndpoint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_display() {
        let result = GeocodeResult {
            latitude: 1.5,
            longitude: -2.25,
            display_name: "Somewhere".to_string(),
        };
        assert_eq!(result.to_string(), "Somewhere (1.500000, -2.250000)");
        assert_eq!(result.coordinate().longitude, -2.25);
    }

    #[test]
    fn test_result_serializes() {
        let result = GeocodeResult {
            latitude: 1.0,
            longitude: 2.0,
            display_name: "x".to_string(),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"latitude":1.0,"longitude":2.0,"display_name":"x"}"#);
    }
}
