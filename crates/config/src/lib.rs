#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for pkgfetch
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/pkgfetch/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;

use pkgfetch_errors::{ConfigError, Error};
use pkgfetch_types::Credentials;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;
use url::Url;

/// Everything a single package fetch needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub manifest_url: String,

    /// Detached minisign signature over the manifest digest
    #[serde(default)]
    pub manifest_signature: String,

    /// File to read the manifest signature from when it is not inline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_signature_file: Option<PathBuf>,

    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,

    #[serde(default = "default_trusted_primary_key")]
    pub trusted_primary_key: PathBuf,

    #[serde(default = "default_trusted_keys_dir")]
    pub trusted_keys_dir: PathBuf,

    /// URL prefix to basic-auth credential
    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub network: NetworkConfig,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            manifest_url: String::new(),
            manifest_signature: String::new(),
            manifest_signature_file: None,
            destination_dir: default_destination_dir(),
            trusted_primary_key: default_trusted_primary_key(),
            trusted_keys_dir: default_trusted_keys_dir(),
            credentials: Credentials::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

fn default_destination_dir() -> PathBuf {
    PathBuf::from(constants::DESTINATION_DIR)
}

fn default_trusted_primary_key() -> PathBuf {
    PathBuf::from(constants::TRUSTED_PRIMARY_KEY)
}

fn default_trusted_keys_dir() -> PathBuf {
    PathBuf::from(constants::TRUSTED_KEYS_DIR)
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("pkgfetch/{}", env!("CARGO_PKG_VERSION"))
}

impl FetchConfig {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("pkgfetch").join(constants::CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    ///
    /// A `manifest_signature_file` is read here, so the returned config
    /// always carries the signature inline.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or names a signature file that cannot be read.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let mut config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;

        config.resolve_signature_file().await?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load from `path`, or the default location, falling back to defaults
    /// when the default file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be loaded, or the
    /// default file exists but cannot be loaded.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = path {
            return Self::load_from_file(path).await;
        }

        let default_path = Self::default_path()?;
        if fs::try_exists(&default_path).await.unwrap_or(false) {
            Self::load_from_file(&default_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Read `manifest_signature_file` into `manifest_signature` when no
    /// inline signature is set
    ///
    /// # Errors
    ///
    /// Returns an error if the signature file cannot be read.
    pub async fn resolve_signature_file(&mut self) -> Result<(), Error> {
        if !self.manifest_signature.trim().is_empty() {
            return Ok(());
        }
        if let Some(path) = &self.manifest_signature_file {
            self.manifest_signature =
                fs::read_to_string(path)
                    .await
                    .map_err(|_| ConfigError::NotFound {
                        path: path.display().to_string(),
                    })?;
        }
        Ok(())
    }

    /// Merge environment variables into the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable has an invalid value.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(url) = std::env::var("PKGFETCH_MANIFEST_URL") {
            self.manifest_url = url;
        }

        if let Ok(signature) = std::env::var("PKGFETCH_MANIFEST_SIGNATURE") {
            self.manifest_signature = signature;
        }

        if let Ok(dest) = std::env::var("PKGFETCH_DESTINATION_DIR") {
            self.destination_dir = PathBuf::from(dest);
        }

        if let Ok(timeout) = std::env::var("PKGFETCH_TIMEOUT") {
            self.network.timeout = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PKGFETCH_TIMEOUT".to_string(),
                value: timeout,
            })?;
        }

        Ok(())
    }

    /// Check that the configuration can drive a fetch
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest signature is empty or the manifest
    /// URL is missing or not HTTP(S).
    pub fn validate(&self) -> Result<(), Error> {
        if self.manifest_signature.trim().is_empty() {
            return Err(ConfigError::MissingManifestSignature.into());
        }

        if self.manifest_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "manifest_url".to_string(),
            }
            .into());
        }

        let is_http = Url::parse(&self.manifest_url)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
        if !is_http {
            return Err(ConfigError::InvalidValue {
                field: "manifest_url".to_string(),
                value: self.manifest_url.clone(),
            }
            .into());
        }

        if self.network.timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.timeout".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
