//! Connection settings and the device config file
//!
//! Config files are stored in platform-appropriate locations:
//! - Linux: ~/.config/dahua/
//! - macOS: ~/Library/Application Support/dahua/
//! - Windows: %APPDATA%\dahua\

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoDirFound,
}

/// When privileged calls establish a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReauthPolicy {
    /// Fresh login before every privileged call
    #[default]
    Eager,
    /// Reuse the held session, log in only when there is none
    Lazy,
}

/// Settings for one client talking to one device. Fixed once the client
/// is built.
#[derive(Clone)]
pub struct ClientConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub reauth: ReauthPolicy,
}

impl ClientConfig {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            host: host.to_string(),
            port,
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
            reauth: ReauthPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reauth(mut self, reauth: ReauthPolicy) -> Self {
        self.reauth = reauth;
        self
    }

    /// `https` only on 443
    pub fn scheme(&self) -> &'static str {
        if self.port == 443 { "https" } else { "http" }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .field("reauth", &self.reauth)
            .finish()
    }
}

/// Main configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Device used when none is named
    pub default_device: Option<String>,

    /// Known devices
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Known device entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device display name
    pub name: String,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Video channel the siren/light hang off
    #[serde(default)]
    pub channel: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub reauth: ReauthPolicy,
}

fn default_port() -> u16 {
    crate::DEFAULT_HTTP_PORT
}
fn default_username() -> String {
    "admin".to_string()
}
fn default_timeout_secs() -> u64 {
    crate::DEFAULT_TIMEOUT_SECS
}

impl DeviceConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.host, self.port, &self.username, &self.password)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_reauth(self.reauth)
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("dahua"))
            .ok_or(ConfigError::NoDirFound)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load config from specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get device config by name
    pub fn get_device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// The named device, else the default one, else the only one
    pub fn resolve_device(&self, name: Option<&str>) -> Option<&DeviceConfig> {
        match name.or(self.default_device.as_deref()) {
            Some(name) => self.get_device(name),
            None if self.devices.len() == 1 => self.devices.first(),
            None => None,
        }
    }

    /// Add or update device
    pub fn upsert_device(&mut self, device: DeviceConfig) {
        if let Some(existing) = self.devices.iter_mut().find(|d| d.name == device.name) {
            *existing = device;
        } else {
            self.devices.push(device);
        }
    }
}
