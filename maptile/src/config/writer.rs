//! `ManagerConfig` → INI text.

use ini::Ini;

use super::ManagerConfig;
use crate::provider::TileProvider;

pub(super) fn to_config_string(config: &ManagerConfig) -> String {
    let mut ini = Ini::new();

    let (kind, template) = match &config.provider {
        TileProvider::OpenStreetMap => ("osm", None),
        TileProvider::GoogleMaps => ("google", None),
        TileProvider::BingMaps => ("bing", None),
        TileProvider::Custom(t) => ("custom", Some(t.as_str())),
    };
    {
        let mut section = ini.with_section(Some("provider"));
        section.set("type", kind);
        if let Some(t) = template {
            section.set("template", t);
        }
        section
            .set(
                "google_api_key",
                config.google_api_key.as_deref().unwrap_or(""),
            )
            .set("bing_api_key", config.bing_api_key.as_deref().unwrap_or(""));
        if let Some(attribution) = &config.attribution {
            section.set("attribution", attribution.as_str());
        }
    }

    ini.with_section(Some("cache"))
        .set("capacity", config.cache_capacity.to_string());

    ini.with_section(Some("map"))
        .set("min_zoom", config.min_zoom.to_string())
        .set("max_zoom", config.max_zoom.to_string())
        .set("zoom", config.zoom.to_string())
        .set("tile_size", config.tile_size.to_string())
        .set("latitude", config.center.latitude.to_string())
        .set("longitude", config.center.longitude.to_string());

    ini.with_section(Some("network"))
        .set("timeout", config.fetch_timeout.as_secs().to_string())
        .set("user_agent", config.user_agent.as_str())
        .set("validate_images", config.validate_images.to_string());

    ini.with_section(Some("geocoder"))
        .set("endpoint", config.geocoder_endpoint.as_str());

    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = ini.write_to(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_present() {
        let text = to_config_string(&ManagerConfig::default());
        for section in ["[provider]", "[cache]", "[map]", "[network]", "[geocoder]"] {
            assert!(text.contains(section), "missing {}", section);
        }
        assert!(text.contains("type=osm"));
        assert!(text.contains("capacity=100"));
    }

    #[test]
    fn test_roundtrip_defaults() {
        let text = to_config_string(&ManagerConfig::default());
        assert_eq!(
            ManagerConfig::from_ini_str(&text).unwrap(),
            ManagerConfig::default()
        );
    }
}
