//! Place-name search against a Nominatim-compatible endpoint.
//!
//! The request is a single GET, `{endpoint}?q=<query>&format=json&limit=1`,
//! and the response is a JSON array of candidates. Only the first candidate
//! is used.

mod types;

pub use types::{GeocodeError, GeocodeResult};

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{AsyncHttpClient, ProviderError, DEFAULT_TIMEOUT_SECS};

/// Public Nominatim search endpoint.
pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Candidate object as returned by the search endpoint.
#[derive(Debug, Deserialize)]
struct Place {
    lat: Degrees,
    lon: Degrees,
    display_name: String,
}

/// Coordinates arrive as strings from Nominatim, as numbers from some mirrors.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Degrees {
    Number(f64),
    Text(String),
}

impl Degrees {
    fn parse(&self, field: &str) -> Result<f64, GeocodeError> {
        let value = match self {
            Degrees::Number(n) => *n,
            Degrees::Text(s) => s.trim().parse::<f64>().map_err(|e| {
                GeocodeError::Decode(format!("{} '{}' is not a number: {}", field, s, e))
            })?,
        };
        if !value.is_finite() {
            return Err(GeocodeError::Decode(format!("{} is not finite", field)));
        }
        Ok(value)
    }
}

/// Parse a search response body into its first result.
pub fn parse_response(body: &[u8]) -> Result<GeocodeResult, GeocodeError> {
    let places: Vec<Place> =
        serde_json::from_slice(body).map_err(|e| GeocodeError::Decode(e.to_string()))?;

    let place = places.into_iter().next().ok_or(GeocodeError::LocationNotFound)?;

    let latitude = place.lat.parse("lat")?;
    let longitude = place.lon.parse("lon")?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(GeocodeError::Decode(format!(
            "coordinate out of range: ({}, {})",
            latitude, longitude
        )));
    }

    Ok(GeocodeResult {
        latitude,
        longitude,
        display_name: place.display_name,
    })
}

/// Geocoding client over an injected HTTP transport.
#[derive(Clone)]
pub struct Geocoder<C> {
    client: C,
    endpoint: String,
    timeout: Duration,
}

impl<C: AsyncHttpClient> Geocoder<C> {
    /// Creates a geocoder against the public Nominatim endpoint.
    pub fn new(client: C) -> Self {
        Self::with_endpoint(client, DEFAULT_GEOCODER_ENDPOINT)
    }

    pub fn with_endpoint(client: C, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Validates the query and builds the request URL.
    pub fn search_url(&self, query: &str) -> Result<String, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::InvalidQuery);
        }
        let url = reqwest::Url::parse_with_params(
            &self.endpoint,
            &[("q", query), ("format", "json"), ("limit", "1")],
        )
        .map_err(|e| GeocodeError::InvalidEndpoint(format!("{}: {}", self.endpoint, e)))?;
        Ok(url.into())
    }

    /// Resolve `query` to the best matching location.
    pub async fn search(&self, query: &str) -> Result<GeocodeResult, GeocodeError> {
        let url = self.search_url(query)?;
        debug!(query = query.trim(), url = %url, "Geocoding request");

        let body = match tokio::time::timeout(self.timeout, self.client.get(&url)).await {
            Ok(result) => result.map_err(GeocodeError::from)?,
            Err(_) => {
                warn!(query = query.trim(), "Geocoding request timed out");
                return Err(GeocodeError::Timeout);
            }
        };

        let result = parse_response(&body)?;
        debug!(
            query = query.trim(),
            latitude = result.latitude,
            longitude = result.longitude,
            "Geocoding resolved"
        );
        Ok(result)
    }
}

impl From<ProviderError> for GeocodeError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Timeout(_) => GeocodeError::Timeout,
            other => GeocodeError::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    fn geocoder(body: &str) -> (Geocoder<MockAsyncHttpClient>, MockAsyncHttpClient) {
        let mock = MockAsyncHttpClient::new(Ok(body.as_bytes().to_vec()));
        (Geocoder::new(mock.clone()), mock)
    }

    #[test]
    fn test_parse_string_coordinates() {
        let body = br#"[{"lat":"51.5073219","lon":"-0.1276474","display_name":"London"}]"#;
        let result = parse_response(body).unwrap();
        assert!((result.latitude - 51.5073219).abs() < 1e-9);
        assert!((result.longitude + 0.1276474).abs() < 1e-9);
        assert_eq!(result.display_name, "London");
    }

    #[test]
    fn test_parse_numeric_coordinates() {
        let body = br#"[{"lat":48.8566,"lon":2.3522,"display_name":"Paris"}]"#;
        let result = parse_response(body).unwrap();
        assert_eq!(result.latitude, 48.8566);
        assert_eq!(result.longitude, 2.3522);
    }

    #[test]
    fn test_parse_takes_first_candidate() {
        let body = br#"[
            {"lat":"1","lon":"2","display_name":"first","importance":0.9},
            {"lat":"3","lon":"4","display_name":"second"}
        ]"#;
        assert_eq!(parse_response(body).unwrap().display_name, "first");
    }

    #[test]
    fn test_parse_empty_array_is_not_found() {
        assert_eq!(parse_response(b"[]"), Err(GeocodeError::LocationNotFound));
    }

    #[test]
    fn test_parse_malformed_json() {
        assert!(matches!(
            parse_response(b"<html>"),
            Err(GeocodeError::Decode(_))
        ));
        assert!(matches!(
            parse_response(br#"[{"lat":"north","lon":"0","display_name":"x"}]"#),
            Err(GeocodeError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_out_of_range() {
        let body = br#"[{"lat":"95","lon":"0","display_name":"x"}]"#;
        assert!(matches!(parse_response(body), Err(GeocodeError::Decode(_))));
    }

    #[test]
    fn test_search_url_encodes_query() {
        let (geocoder, _) = geocoder("[]");
        let url = geocoder.search_url("  São Paulo & co ").unwrap();
        assert!(url.starts_with("https://nominatim.openstreetmap.org/search?q="));
        assert!(url.contains("S%C3%A3o+Paulo+%26+co"), "got {}", url);
        assert!(url.contains("format=json"));
        assert!(url.contains("limit=1"));
    }

    #[test]
    fn test_search_url_rejects_blank_query() {
        let (geocoder, _) = geocoder("[]");
        assert_eq!(geocoder.search_url("   "), Err(GeocodeError::InvalidQuery));
    }

    #[test]
    fn test_search_url_rejects_bad_endpoint() {
        let geocoder = Geocoder::with_endpoint(MockAsyncHttpClient::png(), "not a url");
        assert!(matches!(
            geocoder.search_url("x"),
            Err(GeocodeError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_search_success() {
        let (geocoder, mock) =
            geocoder(r#"[{"lat":"40.7127","lon":"-74.0059","display_name":"New York"}]"#);
        let result = geocoder.search("New York").await.unwrap();
        assert_eq!(result.display_name, "New York");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_search_blank_query_makes_no_request() {
        let (geocoder, mock) = geocoder("[]");
        assert_eq!(geocoder.search("").await, Err(GeocodeError::InvalidQuery));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_search_network_error() {
        let mock = MockAsyncHttpClient::new(Err(ProviderError::HttpStatus {
            status: 503,
            url: "u".to_string(),
        }));
        let geocoder = Geocoder::new(mock);
        assert!(matches!(
            geocoder.search("x").await,
            Err(GeocodeError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_search_timeout() {
        let mock = MockAsyncHttpClient::new(Ok(b"[]".to_vec()))
            .with_delay(Duration::from_millis(200));
        let geocoder = Geocoder::new(mock).with_timeout(Duration::from_millis(10));
        assert_eq!(geocoder.search("x").await, Err(GeocodeError::Timeout));
    }
}
