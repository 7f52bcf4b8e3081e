use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::client::ClientOptions;

pub const DEFAULT_BASE_URL: &str = "https://restapi.amap.com/v3";

/// Environment variable overriding the stored API key.
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";
/// Environment variable overriding the stored provider base URL.
pub const BASE_URL_ENV: &str = "WEATHER_API_BASE_URL";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// base_url = "https://restapi.amap.com/v3"
/// cache_ttl_secs = 600
/// min_interval_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub cache_ttl_secs: u64,
    pub min_interval_ms: u64,
    /// Unset means the cache only shrinks through expiry.
    pub max_cache_entries: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: 600,
            min_interval_ms: 1000,
            max_cache_entries: None,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `WEATHER_API_KEY` / `WEATHER_API_BASE_URL` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        self
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `weather configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    /// Build client options from this config. Fails when no API key is set.
    pub fn client_options(&self) -> Result<ClientOptions> {
        let mut options = ClientOptions::new(self.api_key()?, self.base_url.as_str());
        options.cache_ttl = Duration::from_secs(self.cache_ttl_secs);
        options.min_interval = Duration::from_millis(self.min_interval_ms);
        options.max_cache_entries = self.max_cache_entries;
        options.request_timeout = self.request_timeout_secs.map(Duration::from_secs);
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.api_key().unwrap_err();

        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains("weather configure"));
        assert!(!cfg.is_configured());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api_key("   ".into());

        assert!(cfg.api_key().is_err());
    }

    #[test]
    fn client_options_follow_config() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.base_url = "http://localhost:8080/v3/".into();
        cfg.cache_ttl_secs = 30;
        cfg.min_interval_ms = 250;
        cfg.max_cache_entries = Some(64);

        let options = cfg.client_options().expect("configured");

        assert_eq!(options.api_key, "KEY");
        assert_eq!(options.base_url, "http://localhost:8080/v3");
        assert_eq!(options.cache_ttl, Duration::from_secs(30));
        assert_eq!(options.min_interval, Duration::from_millis(250));
        assert_eq!(options.max_cache_entries, Some(64));
        assert_eq!(options.request_timeout, None);
    }

    #[tokio::test]
    async fn huge_cache_ttl_is_usable() {
        let cfg: Config =
            toml::from_str("api_key = \"k\"\ncache_ttl_secs = 9223372036854775807\n")
                .expect("valid toml");
        let options = cfg.client_options().expect("configured");

        let mut cache = crate::cache::TtlCache::new(options.cache_ttl);
        cache.put("weather_Beijing", 1);

        assert_eq!(cache.get(&"weather_Beijing"), Some(1));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = Config::default();
        cfg.set_api_key("FROM_FILE".into());

        let env: HashMap<&str, &str> =
            HashMap::from([(API_KEY_ENV, "FROM_ENV"), (BASE_URL_ENV, "http://proxy/v3")]);
        let cfg = cfg.with_overrides_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.api_key().expect("set"), "FROM_ENV");
        assert_eq!(cfg.base_url, "http://proxy/v3");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = Config::default();
        cfg.set_api_key("FROM_FILE".into());

        let cfg = cfg.with_overrides_from(|_| Some(String::new()));

        assert_eq!(cfg.api_key().expect("set"), "FROM_FILE");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.max_cache_entries = Some(10);
        cfg.save_to(&path).expect("saved");

        let loaded = Config::load_from(&path).expect("loaded");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");

        let loaded = Config::load_from(&dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"KEY\"\n").expect("written");

        let loaded = Config::load_from(&path).expect("loaded");
        assert_eq!(loaded.api_key().expect("set"), "KEY");
        assert_eq!(loaded.min_interval_ms, 1000);
        assert_eq!(loaded.base_url, DEFAULT_BASE_URL);
    }
}
