use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use geodir_shared::config::SearchConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub seed_path: Option<PathBuf>,
    pub mapbox_token: Option<String>,
    pub geocoder_url: String,
    pub geocode_timeout: Duration,
    pub search: SearchConfig,
}

pub const MAPBOX_GEOCODER_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SearchConfig::default();
        let country = match lookup("GEOCODE_COUNTRY") {
            Some(c) if c.trim().is_empty() => None,
            Some(c) => Some(c),
            None => defaults.country,
        };

        Ok(Config {
            port: parse(&lookup, "PORT", 3000)?,
            db_path: PathBuf::from(
                lookup("DB_PATH").unwrap_or_else(|| "data/entities.redb".to_string()),
            ),
            seed_path: lookup("SEED_PATH").map(PathBuf::from),
            mapbox_token: lookup("MAPBOX_TOKEN").filter(|t| !t.is_empty()),
            geocoder_url: lookup("GEOCODER_URL").unwrap_or_else(|| MAPBOX_GEOCODER_URL.to_string()),
            geocode_timeout: Duration::from_millis(parse(&lookup, "GEOCODE_TIMEOUT_MS", 5000)?),
            search: SearchConfig {
                radius_miles: parse(&lookup, "SEARCH_RADIUS_MILES", defaults.radius_miles)?,
                country,
            },
        })
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("data/entities.redb"));
        assert!(cfg.seed_path.is_none());
        assert!(cfg.mapbox_token.is_none());
        assert_eq!(cfg.geocoder_url, MAPBOX_GEOCODER_URL);
        assert_eq!(cfg.geocode_timeout, Duration::from_secs(5));
        assert_eq!(cfg.search.radius_miles, 100.0);
        assert_eq!(cfg.search.country.as_deref(), Some("US"));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("SEARCH_RADIUS_MILES", "25.5"),
            ("GEOCODE_COUNTRY", ""),
            ("MAPBOX_TOKEN", "pk.test"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.search.radius_miles, 25.5);
        assert!(cfg.search.country.is_none());
        assert_eq!(cfg.mapbox_token.as_deref(), Some("pk.test"));
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let err = config(&[("GEOCODE_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("GEOCODE_TIMEOUT_MS"));
    }
}
