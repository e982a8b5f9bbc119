//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "techlab.toml",
    "./config/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            search_paths: CONFIG_PATHS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
            ..Self::new()
        }
    }

    /// Replace the fallback search paths. An empty list disables the search.
    pub fn with_search_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an explicit variable lookup.
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.find_config_file(&lookup) {
            Some(path) => {
                info!(?path, "Loading configuration from file");
                AppConfig::from_file(&path)?
            }
            None => AppConfig::default(),
        };

        apply_overrides(&mut config, &lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn find_config_file<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured config file does not exist");
        }

        if let Some(path) = lookup("TECHLAB_CONFIG").map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
        }

        self.search_paths.iter().find(|path| path.exists()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::ValidationError(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}

fn apply_overrides<F>(config: &mut AppConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(val) = lookup("TECHLAB_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("TECHLAB_HTTP_PORT") {
        config.http.port = val.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("TECHLAB_HTTP_PORT must be a port, got '{}'", val))
        })?;
    }
    if let Some(val) = lookup("TECHLAB_CORS_ORIGINS") {
        config.http.cors_origins = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // Storage
    if let Some(val) = lookup("TECHLAB_STORAGE_BACKEND") {
        config.storage.backend = val.parse()?;
    }
    if let Some(val) = lookup("TECHLAB_MONGODB_URI") {
        config.storage.mongodb.uri = val;
    }
    if let Some(val) = lookup("TECHLAB_MONGODB_DATABASE") {
        config.storage.mongodb.database = val;
    }
    if let Some(val) = lookup("TECHLAB_PRODUCTS_COLLECTION") {
        config.storage.collection = val;
    }
    if let Some(val) = lookup("TECHLAB_STORAGE_REQUIRED") {
        config.storage.required = parse_bool("TECHLAB_STORAGE_REQUIRED", &val)?;
    }

    // Auth
    if let Some(val) = lookup("TECHLAB_JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Some(val) = lookup("TECHLAB_JWT_EXPIRES_IN") {
        config.auth.token_ttl = val;
    }
    if let Some(val) = lookup("TECHLAB_ADMIN_EMAIL") {
        config.auth.admin_email = val;
    }
    if let Some(val) = lookup("TECHLAB_ADMIN_PASSWORD") {
        config.auth.admin_password = val;
    }

    // General
    if let Some(val) = lookup("TECHLAB_DEV_MODE") {
        config.dev_mode = parse_bool("TECHLAB_DEV_MODE", &val)?;
    }

    Ok(())
}
