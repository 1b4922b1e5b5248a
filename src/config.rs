//! Konfigurace z env (po dotenv)

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port:                  u16,
    pub api_key:               Option<String>,
    pub opendota_base_url:     String,
    pub liquipedia_url:        String,
    pub refresh_interval:      Duration,
    pub live_refresh_interval: Duration,
    pub player_heroes_ttl:     Duration,
    pub image_ttl:             Duration,
    pub static_dir:            PathBuf,
    pub log_dir:               PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `lookup` vrací hodnotu proměnné (testy nemusí sahat na skutečné env)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secs = |key: &str, default: u64| {
            Duration::from_secs(get(key).and_then(|v| v.parse::<u64>().ok()).unwrap_or(default))
        };

        // Špatný PORT je jediná fatální chyba konfigurace
        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().context(format!("Invalid PORT {raw:?}"))?,
            None => 3000,
        };

        Ok(Self {
            port,
            api_key: get("OPENDOTA_API_KEY"),
            opendota_base_url: get("OPENDOTA_BASE_URL")
                .unwrap_or_else(|| opendota_client::DEFAULT_BASE_URL.to_string()),
            liquipedia_url: get("LIQUIPEDIA_MATCHES_URL")
                .unwrap_or_else(|| liquipedia_scraper::DEFAULT_MATCHES_URL.to_string()),
            refresh_interval: secs("REFRESH_INTERVAL_SECS", 600),
            live_refresh_interval: secs("LIVE_REFRESH_INTERVAL_SECS", 60),
            player_heroes_ttl: secs("PLAYER_HEROES_TTL_SECS", 1800),
            image_ttl: secs("IMAGE_CACHE_TTL_SECS", 86_400),
            static_dir: PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "public".to_string())),
            log_dir: PathBuf::from(get("LOG_DIR").unwrap_or_else(|| "logs".to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_is_empty() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.opendota_base_url, "https://api.opendota.com/api");
        assert_eq!(cfg.refresh_interval, Duration::from_secs(600));
        assert_eq!(cfg.live_refresh_interval, Duration::from_secs(60));
        assert_eq!(cfg.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn reads_port_key_and_intervals() {
        let cfg = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("OPENDOTA_API_KEY", "abc"),
            ("LIVE_REFRESH_INTERVAL_SECS", "15"),
            ("PLAYER_HEROES_TTL_SECS", "garbage"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.live_refresh_interval, Duration::from_secs(15));
        assert_eq!(cfg.player_heroes_ttl, Duration::from_secs(1800));
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let cfg = Config::from_lookup(lookup(&[("OPENDOTA_API_KEY", "   ")])).unwrap();
        assert_eq!(cfg.api_key, None);
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(Config::from_lookup(lookup(&[("PORT", "70000")])).is_err());
    }
}
