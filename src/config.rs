//! Configuration file handling for vap-bridge.
//!
//! Loads configuration from `<config dir>/vap-bridge/config.toml` or a custom path.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::content::{Content, ContentError, WireContent};
use crate::protocol::{CreationParams, ScaleType};
use crate::resolver::{ImageCache, ResourceSettings, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};

/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "VAP_BRIDGE_CONFIG";

/// Default animation file size limit in MiB.
pub const DEFAULT_MAX_FILE_MB: u64 = 100;

/// Template written by `config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# vap-bridge configuration

[player]
# fitCenter, centerCrop or fitXY
scale_type = "fitCenter"
# 0 plays once, -1 loops forever, n plays n+1 times
repeat = 0
mute = false

[resources]
# storage_dir = "/path/to/app/storage"
# asset_root = "/path/to/bundle"
max_file_mb = 100

[http]
timeout_secs = 30
connect_timeout_secs = 10
cache_enabled = true
# cache_dir = "/path/to/cache"

# Initial tag contents
# [tags.name]
# content_type = "text"
# content_value = "Alice"
"#;

/// Configuration file structure for vap-bridge.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub tags: BTreeMap<String, TagConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PlayerConfig {
    #[serde(default)]
    pub scale_type: Option<String>,
    #[serde(default)]
    pub repeat: i32,
    #[serde(default)]
    pub mute: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub asset_root: Option<PathBuf>,
    #[serde(default = "default_max_file_mb")]
    pub max_file_mb: u64,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            asset_root: None,
            max_file_mb: DEFAULT_MAX_FILE_MB,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            cache_enabled: true,
            cache_dir: None,
        }
    }
}

/// One initial tag entry.
#[derive(Debug, Deserialize, Clone)]
pub struct TagConfig {
    pub content_type: String,
    pub content_value: String,
}

fn default_true() -> bool {
    true
}

fn default_max_file_mb() -> u64 {
    DEFAULT_MAX_FILE_MB
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            Self::parse(&content).map_err(|e| ConfigError::Parse { path, source: e })
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Initial view-creation parameters.
    pub fn creation_params(&self) -> Result<CreationParams, ContentError> {
        let tag_contents = if self.tags.is_empty() {
            None
        } else {
            let contents: HashMap<String, Content> = self
                .tags
                .iter()
                .map(|(tag, entry)| {
                    let wire = WireContent {
                        content_type: entry.content_type.clone(),
                        content_value: entry.content_value.clone(),
                    };
                    Content::try_from(wire).map(|content| (tag.clone(), content))
                })
                .collect::<Result<_, _>>()?;
            Some(contents)
        };
        Ok(CreationParams {
            scale_type: self
                .player
                .scale_type
                .as_deref()
                .map(ScaleType::from_wire)
                .unwrap_or_default(),
            repeat: self.player.repeat,
            mute: self.player.mute,
            tag_contents,
        })
    }

    /// Resource locations and HTTP settings.
    pub fn resource_settings(&self) -> ResourceSettings {
        let defaults = ResourceSettings::default();
        let cache_dir = self.http.cache_enabled.then(|| {
            self.http
                .cache_dir
                .clone()
                .unwrap_or_else(|| ImageCache::with_default_dir().cache_dir().to_path_buf())
        });
        ResourceSettings {
            storage_dir: self
                .resources
                .storage_dir
                .clone()
                .unwrap_or(defaults.storage_dir),
            asset_root: self
                .resources
                .asset_root
                .clone()
                .unwrap_or(defaults.asset_root),
            max_file_bytes: self.resources.max_file_mb.saturating_mul(1024 * 1024),
            timeout: Duration::from_secs(self.http.timeout_secs),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            cache_dir,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("vap-bridge").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/vap-bridge/config.toml")
        })
}
