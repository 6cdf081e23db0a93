use anyhow::Context;
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::data::{DEFAULT_API_BASE_URL, DEFAULT_ARTICLE_LIMIT, DEFAULT_TILE_URL};

const APP_DIR: &str = "narrative-map";
const CONFIG_FILE: &str = "config.toml";
const BOUNDARIES_FILE: &str = "ne_110m_admin_0_countries.json";

pub const API_URL_ENV: &str = "NARRATIVE_MAP_API_URL";
pub const BOUNDARIES_ENV: &str = "NARRATIVE_MAP_BOUNDARIES";

/// User settings, read from `config.toml` in the platform config directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub boundaries_path: PathBuf,
    pub tile_url: String,
    pub article_limit: u32,
    pub base_zoom: f64,
    pub min_zoom: u32,
    pub max_zoom: u32,
    /// Extra display name -> backend code entries for the resolver.
    pub country_codes: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let boundaries_path = dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(BOUNDARIES_FILE))
            .unwrap_or_else(|| PathBuf::from(BOUNDARIES_FILE));

        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            boundaries_path,
            tile_url: DEFAULT_TILE_URL.to_string(),
            article_limit: DEFAULT_ARTICLE_LIMIT,
            base_zoom: 2.0,
            min_zoom: 1,
            max_zoom: 6,
            country_codes: HashMap::new(),
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Loads the user config, falling back to defaults when it is missing or
    /// broken, then applies environment overrides.
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("Ignoring config file: {:#}", e);
                Self::default()
            }),
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.min_zoom > config.max_zoom {
            anyhow::bail!(
                "min_zoom {} is greater than max_zoom {}",
                config.min_zoom,
                config.max_zoom
            );
        }
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(path) = lookup(BOUNDARIES_ENV).filter(|v| !v.trim().is_empty()) {
            self.boundaries_path = PathBuf::from(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            api_base_url = "https://news.example.org"
            article_limit = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://news.example.org");
        assert_eq!(config.article_limit, 5);
        assert_eq!(config.tile_url, DEFAULT_TILE_URL);
        assert_eq!(config.base_zoom, 2.0);
        assert!(config.country_codes.is_empty());
    }

    #[test]
    fn reads_country_code_table() {
        let config = Config::from_toml_str(
            r#"
            [country_codes]
            "Canada" = "CANADA"
            "United Kingdom" = "UK"
            "#,
        )
        .unwrap();

        assert_eq!(config.country_codes.get("Canada").map(String::as_str), Some("CANADA"));
        assert_eq!(config.country_codes.get("United Kingdom").map(String::as_str), Some("UK"));
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let err = Config::from_toml_str("min_zoom = 8\nmax_zoom = 3\n").unwrap_err();
        assert!(err.to_string().contains("min_zoom"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            API_URL_ENV => Some("http://10.0.0.2:8000".to_string()),
            BOUNDARIES_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.api_base_url, "http://10.0.0.2:8000");
        assert_eq!(config.boundaries_path, Config::default().boundaries_path);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn broken_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "article_limit = \"many\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));
    }
}
