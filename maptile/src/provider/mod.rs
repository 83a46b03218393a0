//! Tile provider abstraction
//!
//! This module selects the active tile source (OpenStreetMap, Google Maps,
//! Bing Maps or a custom URL template), turns tile coordinates into URLs,
//! and defines the injected HTTP transport used for fetching.
//!
//! ```ignore
//! use maptile::provider::{ProviderRegistry, TileProvider};
//!
//! let registry = ProviderRegistry::with_provider(TileProvider::OpenStreetMap);
//! let url = registry.generate_tile_url(301, 384, 10)?;
//! ```

mod http;
mod registry;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use registry::ProviderRegistry;
pub use types::{ProviderConfig, ProviderError, ProviderKind, TileProvider};

#[cfg(test)]
pub use http::tests::{MockAsyncHttpClient, PNG_BYTES};
