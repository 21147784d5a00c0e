//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory unless a path is
//! given on the command line or in `MEDIAWEAVE_CONFIG`:
//! - Windows: %APPDATA%\mediaweave\config.toml
//! - macOS: ~/Library/Application Support/mediaweave/config.toml
//! - Linux: ~/.config/mediaweave/config.toml
//!
//! ```toml
//! [cache]
//! dir = "/var/cache/mediaweave"
//! search_ttl_secs = 7200
//!
//! [expansion]
//! max_depth = 2
//!
//! [[providers]]
//! name = "catalog"
//! kind = "catalog"
//! path = "/srv/catalog"
//! ```
//!
//! Providers are searched in the order they are listed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,

    pub expansion: ExpansionConfig,

    pub service: ServiceConfig,

    /// Registered providers, in search order
    pub providers: Vec<ProviderConfig>,
}

/// Object cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory of the cache entries
    pub dir: PathBuf,

    pub search_ttl_secs: i64,

    /// Creators, artists, channels
    pub creator_ttl_secs: i64,

    /// Albums and streams
    pub media_ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: crate::cache::default_root(),
            search_ttl_secs: 2 * 60 * 60,
            creator_ttl_secs: 12 * 60 * 60,
            media_ttl_secs: 30 * 24 * 60 * 60,
        }
    }
}

/// Expansion engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Expansion levels counting the object itself; 1 embeds direct references only
    pub max_depth: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self { max_depth: 2 }
    }
}

/// Settings for links handed out to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Prefix of generated playback URLs
    pub base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
        }
    }
}

/// Backing implementation of a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// JSON documents on the local filesystem
    #[default]
    Catalog,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Catalog => "catalog",
        }
    }
}

/// One registered provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// URI scheme prefix, e.g. `catalog` in `catalog:album:1`
    pub name: String,

    /// Inactive providers are not registered at all
    pub active: bool,

    pub kind: ProviderKind,

    /// Data root for filesystem-backed providers
    pub path: PathBuf,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            active: true,
            kind: ProviderKind::default(),
            path: PathBuf::new(),
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mediaweave"))
}

/// Get the full path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location.
///
/// A missing file yields the default config. A file that exists but cannot be
/// read or parsed is an error: running with silently different providers is
/// worse than not starting.
pub fn load() -> Result<Config, ConfigError> {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Ok(Config::default());
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    let config: Config =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    config.validate()?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

impl Config {
    /// Reject provider tables the registry cannot be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if provider.name.is_empty() || provider.name.contains(':') {
                return Err(ConfigError::InvalidProvider(provider.name.clone()));
            }
            if matches!(provider.name.as_str(), "search" | "bestmatch") {
                return Err(ConfigError::InvalidProvider(provider.name.clone()));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::DuplicateProvider(provider.name.clone()));
            }
        }

        let ttls = [
            ("search_ttl_secs", self.cache.search_ttl_secs),
            ("creator_ttl_secs", self.cache.creator_ttl_secs),
            ("media_ttl_secs", self.cache.media_ttl_secs),
        ];
        if let Some((field, secs)) = ttls.into_iter().find(|(_, secs)| *secs < 0) {
            return Err(ConfigError::NegativeTtl(field, secs));
        }
        if self.expansion.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }
}

/// Save configuration to `path`.
///
/// Creates the parent directory if it doesn't exist.
pub fn save(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Invalid provider name {0:?}")]
    InvalidProvider(String),

    #[error("Provider {0} is configured twice")]
    DuplicateProvider(String),

    #[error("cache.{0} must not be negative, got {1}")]
    NegativeTtl(&'static str, i64),

    #[error("expansion.max_depth must be at least 1")]
    ZeroDepth,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[expansion]"));
        assert!(toml.contains("[service]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.cache.search_ttl_secs = 60;
        config.expansion.max_depth = 4;
        config.providers.push(ProviderConfig {
            name: "catalog".to_string(),
            path: PathBuf::from("/srv/catalog"),
            ..Default::default()
        });

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.cache.search_ttl_secs, 60);
        assert_eq!(parsed.expansion.max_depth, 4);
        assert_eq!(parsed.providers, config.providers);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[cache]
dir = "/tmp/mw"

[[providers]]
name = "local"
path = "/data/local"

[[providers]]
name = "archive"
active = false
path = "/data/archive"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.cache.dir, PathBuf::from("/tmp/mw"));
        assert_eq!(config.cache.creator_ttl_secs, 12 * 60 * 60);
        assert_eq!(config.expansion.max_depth, 2);

        // Order is preserved and `active` defaults to true
        let names: Vec<_> = config.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["local", "archive"]);
        assert!(config.providers[0].active);
        assert!(!config.providers[1].active);
        assert_eq!(config.providers[0].kind, ProviderKind::Catalog);
    }

    #[test]
    fn test_load_from_rejects_bad_providers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        std::fs::write(&path, "[[providers]]\nname = \"search\"\n").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::InvalidProvider(_))));

        std::fs::write(&path, "[[providers]]\nname = \"a\"\n[[providers]]\nname = \"a\"\n").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::DuplicateProvider(_))));

        std::fs::write(&path, "[cache\n").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse(..))));
    }

    #[test]
    fn test_load_from_rejects_bad_limits() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        std::fs::write(&path, "[cache]\ncreator_ttl_secs = -5\n").unwrap();
        assert!(matches!(
            load_from(&path),
            Err(ConfigError::NegativeTtl("creator_ttl_secs", -5))
        ));

        std::fs::write(&path, "[expansion]\nmax_depth = 0\n").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::ZeroDepth)));

        // Zero TTLs are allowed: entries expire immediately
        std::fs::write(&path, "[cache]\nsearch_ttl_secs = 0\n").unwrap();
        assert_eq!(load_from(&path).unwrap().cache.search_ttl_secs, 0);
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.service.base_url = "https://media.example/".to_string();
        save(&config, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.service.base_url, "https://media.example/");
        assert!(!path.with_extension("toml.tmp").exists());
    }
}
