//! Configuration file parsing
//!
//! Parses TOML configuration files for the avatar server.

use crate::digest::DigestAlgorithm;
use crate::store::file::FileAssetStore;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Asset storage settings
    pub storage: StorageConfig,
}

/// Server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Asset storage settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Static files root; assets live under `{web_root}/{media_subdir}`
    pub web_root: PathBuf,

    /// Directory and URL segment for stored assets
    #[serde(default = "default_media_subdir")]
    pub media_subdir: String,

    /// File name of the fallback avatar inside the media directory
    #[serde(default = "default_asset")]
    pub default_asset: String,

    /// Digest used to address content
    #[serde(default)]
    pub digest: DigestAlgorithm,
}

impl StorageConfig {
    pub fn new<P: Into<PathBuf>>(web_root: P) -> Self {
        Self {
            web_root: web_root.into(),
            media_subdir: default_media_subdir(),
            default_asset: default_asset(),
            digest: DigestAlgorithm::default(),
        }
    }

    /// Directory the assets are written to
    pub fn media_dir(&self) -> PathBuf {
        self.web_root.join(&self.media_subdir)
    }

    /// Build the file store described by this section
    pub fn open_store(&self) -> FileAssetStore {
        FileAssetStore::new(
            &self.web_root,
            &self.media_subdir,
            &self.default_asset,
            self.digest,
        )
    }
}

fn default_media_subdir() -> String {
    "media".to_string()
}

fn default_asset() -> String {
    "default_avatar.png".to_string()
}

impl Config {
    /// Configuration with defaults for everything but the web root
    pub fn with_web_root<P: Into<PathBuf>>(web_root: P) -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::new(web_root),
        }
    }

    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed bind address
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.parse().map_err(|e| {
            ConfigError::Invalid(format!("bad bind address {:?}: {}", self.server.bind, e))
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_upload_bytes must be greater than zero".to_string(),
            ));
        }

        if !is_single_component(&self.storage.media_subdir) {
            return Err(ConfigError::Invalid(format!(
                "storage.media_subdir must be a single directory name, got {:?}",
                self.storage.media_subdir
            )));
        }

        if !is_single_component(&self.storage.default_asset) {
            return Err(ConfigError::Invalid(format!(
                "storage.default_asset must be a plain file name, got {:?}",
                self.storage.default_asset
            )));
        }

        Ok(())
    }
}

/// Exactly one normal path component, no separators
fn is_single_component(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
