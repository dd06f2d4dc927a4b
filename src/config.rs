use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analytics::TIMELINE_WINDOW_DAYS;
use crate::error::DashboardError;

pub const API_URL_ENV: &str = "JOBSCOPE_API_URL";
pub const MAX_PAGE_SIZE: u32 = 100;
/// Ten years; anything larger is a typo rather than a window.
pub const MAX_TIMELINE_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub map: MapConfig,
    pub listing: ListingConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub page_size: u32,
    pub max_pages: u32,
    pub max_zoom: u8,
    pub padding_px: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 5,
            max_zoom: 13,
            padding_px: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub timeline_window_days: i64,
    pub timeline_interval: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            timeline_window_days: TIMELINE_WINDOW_DAYS,
            timeline_interval: "week".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Explicit path if given, otherwise the per-user config file when it exists,
    /// otherwise defaults. The API URL env var always wins over the file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve(explicit, Self::default_path(), std::env::var(API_URL_ENV).ok())
    }

    fn resolve(explicit: Option<&Path>, fallback: Option<PathBuf>, env_url: Option<String>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match fallback {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Self::default(),
            },
        };

        if let Some(url) = env_url {
            if !url.trim().is_empty() {
                config.api.base_url = url.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "jobscope")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> std::result::Result<(), DashboardError> {
        for (name, size) in [("map.page_size", self.map.page_size), ("listing.page_size", self.listing.page_size)] {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(DashboardError::InvalidConfig(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_PAGE_SIZE, size
                )));
            }
        }
        if self.map.max_pages == 0 {
            return Err(DashboardError::InvalidConfig("map.max_pages must be at least 1".to_string()));
        }
        if self.api.timeout_secs == 0 {
            return Err(DashboardError::InvalidConfig("api.timeout_secs must be at least 1".to_string()));
        }
        if !(1..=MAX_TIMELINE_WINDOW_DAYS).contains(&self.analytics.timeline_window_days) {
            return Err(DashboardError::InvalidConfig(format!(
                "analytics.timeline_window_days must be between 1 and {}, got {}",
                MAX_TIMELINE_WINDOW_DAYS, self.analytics.timeline_window_days
            )));
        }
        if !matches!(self.analytics.timeline_interval.as_str(), "day" | "week" | "month") {
            return Err(DashboardError::InvalidConfig(format!(
                "analytics.timeline_interval must be day, week or month, got '{}'",
                self.analytics.timeline_interval
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dashboard() {
        let config = AppConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.map.page_size, 100);
        assert_eq!(config.map.max_pages, 5);
        assert_eq!(config.listing.page_size, 20);
        assert_eq!(config.analytics.timeline_window_days, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [api]
            base_url = "http://jobs.internal:9000"

            [map]
            max_pages = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "http://jobs.internal:9000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.map.max_pages, 2);
        assert_eq!(config.map.page_size, 100);
    }

    #[test]
    fn test_validate_rejects_oversized_page() {
        let mut config = AppConfig::default();
        config.map.page_size = 250;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("map.page_size"));

        let mut config = AppConfig::default();
        config.map.max_pages = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analytics.timeline_interval = "year".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analytics.timeline_window_days = 4611686018427387903;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeline_window_days"));
    }

    #[test]
    fn test_env_url_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api]\nbase_url = \"http://from-file:8000\"\n").unwrap();

        let config = AppConfig::resolve(Some(&path), None, None).unwrap();
        assert_eq!(config.api.base_url, "http://from-file:8000");

        let config =
            AppConfig::resolve(Some(&path), None, Some(" http://from-env:9000 ".to_string())).unwrap();
        assert_eq!(config.api.base_url, "http://from-env:9000");

        // Blank env value leaves the file's URL alone.
        let config = AppConfig::resolve(Some(&path), None, Some("  ".to_string())).unwrap();
        assert_eq!(config.api.base_url, "http://from-file:8000");
    }

    #[test]
    fn test_default_path_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        // Missing file means defaults.
        let config = AppConfig::resolve(None, Some(path.clone()), None).unwrap();
        assert_eq!(config.listing.page_size, 20);

        fs::write(&path, "[listing]\npage_size = 50\n").unwrap();
        let config = AppConfig::resolve(None, Some(path.clone()), None).unwrap();
        assert_eq!(config.listing.page_size, 50);

        // An explicit path takes precedence over the fallback.
        let explicit = dir.path().join("other.toml");
        fs::write(&explicit, "[listing]\npage_size = 10\n").unwrap();
        let config = AppConfig::resolve(Some(&explicit), Some(path), None).unwrap();
        assert_eq!(config.listing.page_size, 10);

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[listing]\npage_size = 0\n").unwrap();
        assert!(AppConfig::resolve(Some(&bad), None, None).is_err());
    }
}
