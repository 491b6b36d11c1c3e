use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BoardError, Result};
use crate::paginate::DEFAULT_ITEMS_PER_PAGE;
use crate::store::{DEFAULT_EXPIRY_DAYS, MAX_EXPIRY_DAYS};

pub const BACKEND_URL_ENV: &str = "NURSEJOBS_BACKEND_URL";
pub const TOKEN_ENV: &str = "NURSEJOBS_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Expiring cookie jar file
    Cookie,
    /// `filter_prefs` table of the local database
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    /// File holding the bearer token; `~/` is expanded.
    pub token_file: String,
    pub items_per_page: usize,
    pub debounce_ms: u64,
    pub filter_expiry_days: i64,
    pub request_timeout_secs: u64,
    pub store: StoreKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "https://backend.example.com/api".to_string(),
            token_file: "~/.nursejobs.token".to_string(),
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            debounce_ms: 300,
            filter_expiry_days: DEFAULT_EXPIRY_DAYS,
            request_timeout_secs: 30,
            store: StoreKind::Cookie,
        }
    }
}

impl Config {
    /// Config file if present, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                config.backend_url = url.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        match directories::ProjectDirs::from("", "", "nursejobs") {
            Some(dirs) => dirs.config_dir().join("config.json"),
            None => PathBuf::from("nursejobs.config.json"),
        }
    }

    pub fn cookie_jar_path() -> PathBuf {
        match directories::ProjectDirs::from("", "", "nursejobs") {
            Some(dirs) => dirs.data_dir().join("filters.cookies.json"),
            None => PathBuf::from("filters.cookies.json"),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.items_per_page == 0 {
            return Err(BoardError::Config("items_per_page must be at least 1".into()));
        }
        if !(1..=MAX_EXPIRY_DAYS).contains(&self.filter_expiry_days) {
            return Err(BoardError::Config(format!(
                "filter_expiry_days must be between 1 and {}",
                MAX_EXPIRY_DAYS
            )));
        }
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            return Err(BoardError::Config(format!(
                "backend_url must be an http(s) URL, got '{}'",
                self.backend_url
            )));
        }
        Ok(())
    }

    pub fn set_backend_url(&mut self, url: &str) -> Result<()> {
        self.backend_url = url.trim().trim_end_matches('/').to_string();
        self.validate()
    }

    /// Bearer token: the environment wins over the token file.
    pub fn token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }
        let path = expand_home(&self.token_file);
        match std::fs::read_to_string(&path) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(BoardError::MissingToken(path.display().to_string())),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.items_per_page, 10);
        assert_eq!(config.filter_expiry_days, 7);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"items_per_page": 25, "store": "sqlite"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.items_per_page, 25);
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.set_backend_url("https://backend.example/api/").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.backend_url, "https://backend.example/api");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"items_per_page": 0}"#).unwrap();
        assert!(matches!(Config::load_from(&path), Err(BoardError::Config(_))));

        let mut config = Config::default();
        assert!(config.set_backend_url("ftp://nope").is_err());
    }

    #[test]
    fn test_expiry_days_out_of_range_are_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        for days in ["0", "3651", "4611686018427387903"] {
            std::fs::write(&path, format!(r#"{{"filter_expiry_days": {}}}"#, days)).unwrap();
            assert!(matches!(Config::load_from(&path), Err(BoardError::Config(_))));
        }

        std::fs::write(&path, r#"{"filter_expiry_days": 3650}"#).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().filter_expiry_days, 3650);
    }

    #[test]
    fn test_token_file_is_read_and_trimmed() {
        let dir = tempdir().expect("Failed to create temp dir");
        let token_path = dir.path().join("token");
        std::fs::write(&token_path, "abc123\n").unwrap();

        let config = Config {
            token_file: token_path.display().to_string(),
            ..Config::default()
        };
        // Only meaningful when the environment override is unset.
        if std::env::var(TOKEN_ENV).is_err() {
            assert_eq!(config.token().unwrap(), "abc123");
        }
    }

    #[test]
    fn test_missing_token_names_the_file() {
        let config = Config {
            token_file: "/nonexistent/nursejobs/token".to_string(),
            ..Config::default()
        };
        if std::env::var(TOKEN_ENV).is_err() {
            let err = config.token().unwrap_err();
            assert!(err.to_string().contains("/nonexistent/nursejobs/token"));
        }
    }
}
