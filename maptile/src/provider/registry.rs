//! Active tile source and URL generation.
//!
//! The registry holds exactly one active provider. Built-in providers resolve
//! to a fixed URL template and attribution; a custom provider supplies its own
//! template. URLs are produced by textual placeholder substitution:
//!
//! | Placeholder | Value                                          |
//! |-------------|------------------------------------------------|
//! | `{x}`       | tile column                                    |
//! | `{y}`       | tile row                                       |
//! | `{z}`       | zoom level                                     |
//! | `{quadkey}` | Bing quadkey of the tile                       |
//! | `{s}`       | subdomain, `subdomains[(x + y) % len]`         |
//! | `{apikey}`  | credential registered for the active provider  |

use std::collections::HashMap;

use tracing::info;

use super::types::{ProviderConfig, ProviderError, ProviderKind, TileProvider};
use crate::coord::tile_to_quadkey;

const OSM_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

const GOOGLE_TEMPLATE: &str = "https://mt{s}.google.com/vt?lyrs=m&x={x}&y={y}&z={z}";
const GOOGLE_ATTRIBUTION: &str = "Map data © Google";

const BING_TEMPLATE: &str = "https://ecn.t{s}.tiles.virtualearth.net/tiles/r{quadkey}.png?g=1";
const BING_ATTRIBUTION: &str = "© Microsoft Corporation";

const LETTER_SUBDOMAINS: &[&str] = &["a", "b", "c"];
const DIGIT_SUBDOMAINS: &[&str] = &["0", "1", "2", "3"];

/// Holds the active provider, its credentials and attribution.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    active: Option<TileProvider>,
    api_keys: HashMap<ProviderKind, String>,
    attribution_override: Option<String>,
}

impl ProviderRegistry {
    /// Creates a registry with no provider selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the given provider already active.
    pub fn with_provider(provider: TileProvider) -> Self {
        let mut registry = Self::new();
        registry.activate(provider);
        registry
    }

    /// Selects a built-in provider.
    ///
    /// Passing `TileProvider::Custom` behaves like [`set_custom_provider`].
    /// Any previously set custom template and attribution override is dropped.
    ///
    /// [`set_custom_provider`]: Self::set_custom_provider
    pub fn set_provider(&mut self, provider: TileProvider) {
        self.activate(provider);
    }

    /// Switches to a custom URL template.
    pub fn set_custom_provider(&mut self, url_template: impl Into<String>) {
        self.activate(TileProvider::Custom(url_template.into()));
    }

    fn activate(&mut self, provider: TileProvider) {
        info!(provider = %provider, "Tile provider selected");
        self.attribution_override = None;
        self.active = Some(provider);
    }

    /// Stores a credential for a provider kind.
    ///
    /// The key is only used while that kind is active.
    pub fn set_api_key(&mut self, kind: ProviderKind, key: impl Into<String>) {
        let key = key.into();
        if key.trim().is_empty() {
            self.api_keys.remove(&kind);
        } else {
            self.api_keys.insert(kind, key);
        }
    }

    /// Overrides the attribution text of the active provider.
    pub fn set_attribution(&mut self, attribution: impl Into<String>) {
        self.attribution_override = Some(attribution.into());
    }

    /// The active provider, if any.
    pub fn provider(&self) -> Option<&TileProvider> {
        self.active.as_ref()
    }

    /// Attribution text to display alongside tiles.
    pub fn attribution(&self) -> String {
        if let Some(ref text) = self.attribution_override {
            return text.clone();
        }
        match self.active {
            Some(TileProvider::OpenStreetMap) => OSM_ATTRIBUTION.to_string(),
            Some(TileProvider::GoogleMaps) => GOOGLE_ATTRIBUTION.to_string(),
            Some(TileProvider::BingMaps) => BING_ATTRIBUTION.to_string(),
            Some(TileProvider::Custom(_)) | None => String::new(),
        }
    }

    /// Snapshot of the resolved configuration, or `None` when unconfigured.
    pub fn config(&self) -> Option<ProviderConfig> {
        let provider = self.active.clone()?;
        Some(ProviderConfig {
            url_template: Self::template_for(&provider).to_string(),
            attribution: self.attribution(),
            api_key: self.api_keys.get(&provider.kind()).cloned(),
            provider,
        })
    }

    fn template_for(provider: &TileProvider) -> &str {
        match provider {
            TileProvider::OpenStreetMap => OSM_TEMPLATE,
            TileProvider::GoogleMaps => GOOGLE_TEMPLATE,
            TileProvider::BingMaps => BING_TEMPLATE,
            TileProvider::Custom(template) => template,
        }
    }

    fn subdomains_for(provider: &TileProvider) -> &'static [&'static str] {
        match provider {
            TileProvider::GoogleMaps | TileProvider::BingMaps => DIGIT_SUBDOMAINS,
            TileProvider::OpenStreetMap | TileProvider::Custom(_) => LETTER_SUBDOMAINS,
        }
    }

    /// Builds the URL for a tile from the active template.
    pub fn generate_tile_url(&self, x: u32, y: u32, zoom: u8) -> Result<String, ProviderError> {
        let provider = self.active.as_ref().ok_or(ProviderError::NotConfigured)?;
        let template = Self::template_for(provider);
        if template.trim().is_empty() {
            return Err(ProviderError::NotConfigured);
        }

        let mut url = template
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
            .replace("{z}", &zoom.to_string());

        if url.contains("{quadkey}") {
            url = url.replace("{quadkey}", &tile_to_quadkey(x, y, zoom));
        }

        if url.contains("{s}") {
            let subdomains = Self::subdomains_for(provider);
            let index = ((u64::from(x) + u64::from(y)) % subdomains.len() as u64) as usize;
            url = url.replace("{s}", subdomains[index]);
        }

        let api_key = self.api_keys.get(&provider.kind());
        if url.contains("{apikey}") {
            url = url.replace("{apikey}", api_key.map(String::as_str).unwrap_or(""));
        } else if let Some(key) = api_key {
            if matches!(provider, TileProvider::GoogleMaps | TileProvider::BingMaps) {
                let separator = if url.contains('?') { '&' } else { '?' };
                url = format!("{}{}key={}", url, separator, key);
            }
        }

        Ok(url)
    }
}
