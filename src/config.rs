/// Application configuration
///
/// Read from `<config_dir>/storefront/config.json` when the file exists.
/// Every field is optional in the file; missing ones take the defaults below.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ui::product_card::{LoadingHint, DEFAULT_NEW_ARRIVAL_DAYS};

const APP_DIR: &str = "storefront";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("new_arrival_days must be positive, got {0}")]
    InvalidWindow(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Folder scanned for product JSON files
    pub catalog_dir: PathBuf,
    /// SQLite database holding the cart
    pub database_path: PathBuf,
    /// Recency window for the "New" label
    pub new_arrival_days: i64,
    /// Primary photo decoding strategy
    pub loading: LoadingHint,
    /// Show "Add to Cart" on cards
    pub quick_add: bool,
    /// Number of products on the home grid
    pub featured_limit: usize,
    /// env_logger filter used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        let data_dir = app_dir(dirs::data_dir());

        Self {
            catalog_dir: data_dir.join("catalog"),
            database_path: data_dir.join("storefront.db"),
            new_arrival_days: DEFAULT_NEW_ARRIVAL_DAYS,
            loading: LoadingHint::default(),
            quick_add: true,
            featured_limit: 12,
            log_filter: "info".to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Load the user's config file, or defaults when there is none
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Where the config file is expected:
    /// - Linux: ~/.config/storefront/config.json
    /// - macOS: ~/Library/Application Support/storefront/config.json
    /// - Windows: %APPDATA%\storefront\config.json
    pub fn default_path() -> PathBuf {
        app_dir(dirs::config_dir()).join(CONFIG_FILE)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.new_arrival_days <= 0 {
            return Err(ConfigError::InvalidWindow(self.new_arrival_days));
        }
        Ok(())
    }

    pub fn new_arrival_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.new_arrival_days)
    }
}

/// `<base>/storefront`, falling back to the home directory
fn app_dir(base: Option<PathBuf>) -> PathBuf {
    let mut path = base
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.new_arrival_days, 30);
        assert_eq!(config.loading, LoadingHint::Lazy);
        assert!(config.quick_add);
        assert!(config.database_path.ends_with("storefront/storefront.db"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config =
            StorefrontConfig::from_json(r#"{ "loading": "eager", "featured_limit": 4 }"#)
                .unwrap();
        assert_eq!(config.loading, LoadingHint::Eager);
        assert_eq!(config.featured_limit, 4);
        assert_eq!(config.new_arrival_days, 30);
        assert_eq!(config.new_arrival_window(), chrono::Duration::days(30));
    }

    #[test]
    fn test_rejects_bad_window() {
        assert!(matches!(
            StorefrontConfig::from_json(r#"{ "new_arrival_days": 0 }"#),
            Err(ConfigError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let path = std::env::temp_dir()
            .join(format!("storefront-config-{}.json", std::process::id()));
        std::fs::write(&path, "{ nope").unwrap();

        match StorefrontConfig::from_file(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected a parse error, got {:?}", other),
        }
        let _ = std::fs::remove_file(&path);
    }
}
