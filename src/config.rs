// Configuration module for skyhook-tmdb
// Handles the TOML configuration file and environment overrides

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::services::skyhook::{
    MapperSettings, DEFAULT_DISCOVER_KEYWORD_ID, DEFAULT_DISCOVER_LANGUAGE, TMDB_IMAGE_BASE,
};
use crate::services::tmdb::{MISSING_API_KEY, TMDB_API_BASE};

const APP_NAME: &str = "skyhook-tmdb";
const CONFIG_FILENAME: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Server configuration
    pub server: ServerConfig,

    /// TMDB connection settings
    pub tmdb: TmdbConfig,

    /// Latest-releases discovery query
    pub discover: DiscoverConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server port (default: 3000)
    pub port: u16,

    /// Bind address (default: 0.0.0.0)
    pub bind_address: String,

    /// Log failed requests and never answer them instead of returning an
    /// error status (default: false). Only for clients that depend on the
    /// old behaviour.
    pub hang_on_error: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: "0.0.0.0".to_string(),
            hang_on_error: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    /// TMDB v3 API key or v4 read access token
    pub api_key: Option<String>,

    /// Override the API base URL
    pub api_base: Option<String>,

    /// Override the image CDN base URL
    pub image_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoverConfig {
    /// TMDB keyword id every latest result must carry (default: 198385)
    pub keyword_id: String,

    /// Original language filter (default: ja)
    pub original_language: String,
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            keyword_id: DEFAULT_DISCOVER_KEYWORD_ID.to_string(),
            original_language: DEFAULT_DISCOVER_LANGUAGE.to_string(),
        }
    }
}

/// Application configuration - combines TOML file with environment overrides
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server port
    pub port: u16,

    /// Bind address
    pub bind_address: String,

    /// Legacy never-respond error mode
    pub hang_on_error: bool,

    /// TMDB API key (None when neither env nor config provide one)
    pub tmdb_api_key: Option<String>,

    pub tmdb_api_base: String,

    pub tmdb_image_base: String,

    pub discover: DiscoverConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl AppConfig {
    /// Load configuration from TOML file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML config file
    /// 3. Default values
    pub fn load() -> Self {
        let config_dir = Self::find_config_dir();
        let config_file = Self::load_config_file(&config_dir);
        Self::build(config_file)
    }

    /// Find the config directory (for locating config.toml)
    fn find_config_dir() -> PathBuf {
        // Environment variable takes priority
        if let Ok(path) = std::env::var("SKYHOOK_CONFIG_DIR") {
            return PathBuf::from(path);
        }

        // Then XDG config dir
        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_NAME);
        }

        // Fallback to current directory
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Load and parse the TOML config file
    fn load_config_file(config_dir: &Path) -> ConfigFile {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            tracing::debug!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            return ConfigFile::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    ConfigFile::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                ConfigFile::default()
            }
        }
    }

    /// Build configuration from config file with environment overrides
    fn build(config_file: ConfigFile) -> Self {
        let mut config = Self::from_file(config_file);

        if let Some(port) = Self::env_port() {
            config.port = port;
        }
        if let Ok(addr) = std::env::var("SKYHOOK_BIND_ADDRESS") {
            config.bind_address = addr;
        }
        if let Some(hang) = Self::env_flag("SKYHOOK_HANG_ON_ERROR") {
            config.hang_on_error = hang;
        }
        // TMDB API key: env > config
        if let Ok(key) = std::env::var("TMDB_API_KEY") {
            config.tmdb_api_key = Some(key);
        }
        if let Ok(base) = std::env::var("TMDB_API_BASE") {
            config.tmdb_api_base = base;
        }
        if let Ok(base) = std::env::var("TMDB_IMAGE_BASE") {
            config.tmdb_image_base = base;
        }

        config
    }

    fn from_file(config_file: ConfigFile) -> Self {
        Self {
            port: config_file.server.port,
            bind_address: config_file.server.bind_address,
            hang_on_error: config_file.server.hang_on_error,
            tmdb_api_key: config_file.tmdb.api_key.filter(|k| !k.trim().is_empty()),
            tmdb_api_base: config_file
                .tmdb
                .api_base
                .unwrap_or_else(|| TMDB_API_BASE.to_string()),
            tmdb_image_base: config_file
                .tmdb
                .image_base
                .unwrap_or_else(|| TMDB_IMAGE_BASE.to_string()),
            discover: config_file.discover,
        }
    }

    fn env_port() -> Option<u16> {
        std::env::var("SKYHOOK_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
    }

    fn env_flag(name: &str) -> Option<bool> {
        std::env::var(name)
            .ok()
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }

    /// API key handed to the TMDB client, the sentinel when none is set
    pub fn tmdb_api_key_or_sentinel(&self) -> String {
        self.tmdb_api_key
            .clone()
            .unwrap_or_else(|| MISSING_API_KEY.to_string())
    }

    pub fn mapper_settings(&self) -> MapperSettings {
        MapperSettings {
            image_base: self.tmdb_image_base.clone(),
            discover_keyword_id: self.discover.keyword_id.clone(),
            discover_original_language: self.discover.original_language.clone(),
        }
    }

    /// Log configuration status
    pub fn log_config(&self) {
        tracing::info!("Server listening on {}:{}", self.bind_address, self.port);
        tracing::debug!("TMDB API base: {}", self.tmdb_api_base);
        tracing::debug!("TMDB image base: {}", self.tmdb_image_base);
        tracing::debug!(
            "Latest discovery: keyword {}, original language {}",
            self.discover.keyword_id,
            self.discover.original_language
        );

        if self.tmdb_api_key.is_none() {
            tracing::warn!("No TMDB API key configured, every upstream request will fail");
            tracing::info!("Hint: Add api_key under [tmdb] in config.toml or set TMDB_API_KEY env var");
        }

        if self.hang_on_error {
            tracing::warn!("hang_on_error enabled: failed requests will never be answered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert!(!config.server.hang_on_error);
        assert!(config.tmdb.api_key.is_none());
        assert_eq!(config.discover.keyword_id, "198385");
        assert_eq!(config.discover.original_language, "ja");
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[server]
port = 9000
bind_address = "127.0.0.1"
hang_on_error = true

[tmdb]
api_key = "test_key"
image_base = "https://cdn.example.org/t/p/w500"

[discover]
keyword_id = "210024"
original_language = "ko"
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert!(config.server.hang_on_error);
        assert_eq!(config.tmdb.api_key, Some("test_key".to_string()));
        assert_eq!(config.discover.keyword_id, "210024");

        let app = AppConfig::from_file(config);
        assert_eq!(app.tmdb_api_base, TMDB_API_BASE);
        let settings = app.mapper_settings();
        assert_eq!(settings.image_base, "https://cdn.example.org/t/p/w500");
        assert_eq!(settings.discover_original_language, "ko");
    }

    #[test]
    fn test_partial_config_toml() {
        // Test that partial configs work (only specify what you need)
        let toml_str = r#"
[tmdb]
api_key = ""
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 3000); // default

        let app = AppConfig::from_file(config);
        assert!(app.tmdb_api_key.is_none());
        assert_eq!(app.tmdb_api_key_or_sentinel(), "NOKEY");
        assert_eq!(app.tmdb_image_base, "https://image.tmdb.org/t/p/original");
    }
}
