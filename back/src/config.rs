use arcade_protocol::game::TagFilterGroup;
use arcade_search::SearchPreferences;
use base64::Engine as _;
use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("port range {min_port}..={max_port} is empty")]
    PortRange { min_port: u16, max_port: u16 },
    #[error("log capacity must be at least 1")]
    LogCapacity,
}

/// Settings of the back process, read from TOML. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_min_port")]
    pub min_port: u16,
    #[serde(default = "default_max_port")]
    pub max_port: u16,
    /// Shared secret clients must present. A random one is generated when
    /// absent.
    #[serde(default)]
    pub secret: Option<String>,
    /// JSON array of games served by the query engine.
    #[serde(default)]
    pub games_path: Option<PathBuf>,
    /// JSON array of playlists; saved playlists are written back to it.
    #[serde(default)]
    pub playlists_path: Option<PathBuf>,
    #[serde(default)]
    pub tag_filters: Vec<TagFilterGroup>,
    #[serde(default)]
    pub show_extreme: bool,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Where the port and secret are published for local clients.
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_min_port() -> u16 {
    12001
}

fn default_max_port() -> u16 {
    12100
}

fn default_log_capacity() -> usize {
    1000
}

pub fn default_metadata_path() -> PathBuf {
    std::env::temp_dir().join("arcade-back.json")
}

impl Default for BackConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            min_port: default_min_port(),
            max_port: default_max_port(),
            secret: None,
            games_path: None,
            playlists_path: None,
            tag_filters: Vec::new(),
            show_extreme: false,
            log_capacity: default_log_capacity(),
            metadata_path: default_metadata_path(),
        }
    }
}

impl BackConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_port > self.max_port {
            return Err(ConfigError::PortRange {
                min_port: self.min_port,
                max_port: self.max_port,
            });
        }
        if self.log_capacity == 0 {
            return Err(ConfigError::LogCapacity);
        }
        Ok(())
    }

    pub fn secret_or_random(&self) -> String {
        self.secret.clone().unwrap_or_else(random_secret)
    }

    pub fn preferences(&self) -> SearchPreferences {
        SearchPreferences {
            tag_filters: self.tag_filters.clone(),
            show_extreme: self.show_extreme,
        }
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD_NO_PAD.encode(bytes)
}
