//! INI → `ManagerConfig`.
//!
//! The single place where INI key names are mapped to struct fields.

use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::{ConfigError, ManagerConfig, MAX_SUPPORTED_ZOOM};
use crate::provider::{ProviderKind, TileProvider};

/// Starts from `ManagerConfig::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ManagerConfig, ConfigError> {
    let mut config = ManagerConfig::default();

    // [provider]
    if let Some(section) = ini.section(Some("provider")) {
        let template = non_empty(section, "template");
        if let Some(v) = section.get("type") {
            let kind = ProviderKind::from_str(v)
                .map_err(|reason| ConfigError::invalid("provider", "type", v, &reason))?;
            config.provider = match kind {
                ProviderKind::OpenStreetMap => TileProvider::OpenStreetMap,
                ProviderKind::GoogleMaps => TileProvider::GoogleMaps,
                ProviderKind::BingMaps => TileProvider::BingMaps,
                ProviderKind::Custom => match template {
                    Some(t) => TileProvider::Custom(t),
                    None => {
                        return Err(ConfigError::invalid(
                            "provider",
                            "template",
                            "",
                            "required when type = custom",
                        ))
                    }
                },
            };
        } else if let Some(t) = template {
            config.provider = TileProvider::Custom(t);
        }
        config.google_api_key = non_empty(section, "google_api_key");
        config.bing_api_key = non_empty(section, "bing_api_key");
        config.attribution = non_empty(section, "attribution");
    }

    // [cache]
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("capacity") {
            config.cache_capacity = parse_number(v, "cache", "capacity")?;
            if config.cache_capacity == 0 {
                return Err(ConfigError::invalid("cache", "capacity", v, "must be at least 1"));
            }
        }
    }

    // [map]
    if let Some(section) = ini.section(Some("map")) {
        if let Some(v) = section.get("min_zoom") {
            config.min_zoom = parse_zoom(v, "min_zoom")?;
        }
        if let Some(v) = section.get("max_zoom") {
            config.max_zoom = parse_zoom(v, "max_zoom")?;
        }
        if let Some(v) = section.get("zoom") {
            config.zoom = parse_zoom(v, "zoom")?;
        }
        if let Some(v) = section.get("tile_size") {
            config.tile_size = parse_number(v, "map", "tile_size")?;
        }
        if let Some(v) = section.get("latitude") {
            config.center.latitude = parse_degrees(v, "latitude", 90.0)?;
        }
        if let Some(v) = section.get("longitude") {
            config.center.longitude = parse_degrees(v, "longitude", 180.0)?;
        }
    }

    // [network]
    if let Some(section) = ini.section(Some("network")) {
        if let Some(v) = section.get("timeout") {
            let secs: u64 = parse_number(v, "network", "timeout")?;
            if secs == 0 {
                return Err(ConfigError::invalid(
                    "network",
                    "timeout",
                    v,
                    "must be a positive integer (seconds)",
                ));
            }
            config.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = non_empty(section, "user_agent") {
            config.user_agent = v;
        }
        if let Some(v) = section.get("validate_images") {
            config.validate_images = parse_bool(v, "network", "validate_images")?;
        }
    }

    // [geocoder]
    if let Some(section) = ini.section(Some("geocoder")) {
        if let Some(v) = non_empty(section, "endpoint") {
            config.geocoder_endpoint = v;
        }
    }

    config.validate()?;
    Ok(config)
}

fn non_empty(section: &Properties, key: &str) -> Option<String> {
    section
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_number<T: FromStr>(value: &str, section: &str, key: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(section, key, value, "must be a non-negative integer"))
}

fn parse_zoom(value: &str, key: &str) -> Result<u8, ConfigError> {
    let zoom: u8 = parse_number(value, "map", key)?;
    if zoom > MAX_SUPPORTED_ZOOM {
        return Err(ConfigError::invalid("map", key, value, "must be between 0 and 20"));
    }
    Ok(zoom)
}

fn parse_degrees(value: &str, key: &str, limit: f64) -> Result<f64, ConfigError> {
    let degrees: f64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid("map", key, value, "must be a number"))?;
    if !degrees.is_finite() || degrees.abs() > limit {
        return Err(ConfigError::invalid(
            "map",
            key,
            value,
            "outside the valid coordinate range",
        ));
    }
    Ok(degrees)
}

fn parse_bool(value: &str, section: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::invalid(section, key, value, "must be true or false")),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigError, ManagerConfig};
    use crate::provider::TileProvider;
    use std::time::Duration;

    #[test]
    fn test_empty_ini_is_default() {
        assert_eq!(
            ManagerConfig::from_ini_str("").unwrap(),
            ManagerConfig::default()
        );
    }

    #[test]
    fn test_full_ini() {
        let config = ManagerConfig::from_ini_str(
            r#"
[provider]
type = google
google_api_key = abc123
attribution = Tiles by Google

[cache]
capacity = 250

[map]
min_zoom = 2
max_zoom = 18
zoom = 10
tile_size = 512
latitude = 40.7128
longitude = -74.0060

[network]
timeout = 10
user_agent = my-app/1.0
validate_images = no

[geocoder]
endpoint = https://geocode.example.com/search
"#,
        )
        .unwrap();

        assert_eq!(config.provider, TileProvider::GoogleMaps);
        assert_eq!(config.google_api_key.as_deref(), Some("abc123"));
        assert_eq!(config.attribution.as_deref(), Some("Tiles by Google"));
        assert_eq!(config.cache_capacity, 250);
        assert_eq!((config.min_zoom, config.max_zoom, config.zoom), (2, 18, 10));
        assert_eq!(config.tile_size, 512);
        assert_eq!(config.center.longitude, -74.0060);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.user_agent, "my-app/1.0");
        assert!(!config.validate_images);
        assert_eq!(config.geocoder_endpoint, "https://geocode.example.com/search");
    }

    #[test]
    fn test_custom_provider_needs_template() {
        let err = ManagerConfig::from_ini_str("[provider]\ntype = custom\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "template"));

        let config = ManagerConfig::from_ini_str(
            "[provider]\ntype = custom\ntemplate = https://ex.com/{z}/{x}/{y}.png\n",
        )
        .unwrap();
        assert_eq!(
            config.provider,
            TileProvider::Custom("https://ex.com/{z}/{x}/{y}.png".to_string())
        );
    }

    #[test]
    fn test_unknown_provider() {
        let err = ManagerConfig::from_ini_str("[provider]\ntype = mapquest\n").unwrap_err();
        assert!(err.to_string().contains("provider.type = 'mapquest'"));
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let config =
            ManagerConfig::from_ini_str("[provider]\ntype = bing\nbing_api_key =\n").unwrap();
        assert_eq!(config.bing_api_key, None);
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(ManagerConfig::from_ini_str("[cache]\ncapacity = lots\n").is_err());
        assert!(ManagerConfig::from_ini_str("[cache]\ncapacity = 0\n").is_err());
        assert!(ManagerConfig::from_ini_str("[map]\nmax_zoom = 25\n").is_err());
        assert!(ManagerConfig::from_ini_str("[map]\nlatitude = 91\n").is_err());
        assert!(ManagerConfig::from_ini_str("[network]\ntimeout = 0\n").is_err());
        assert!(ManagerConfig::from_ini_str("[network]\nvalidate_images = maybe\n").is_err());
    }

    #[test]
    fn test_min_above_max_rejected() {
        let err = ManagerConfig::from_ini_str("[map]\nmin_zoom = 12\nmax_zoom = 8\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "min_zoom"));
    }
}
