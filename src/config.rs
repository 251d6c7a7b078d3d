//! Configuration loading and validation
//!
//! YAML configuration with serde defaults, validated once at startup.
//! Invalid configuration is fatal before the listener binds; nothing here
//! is retried at scrape time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::collector::{AuthMode, Principal};
use crate::error::StartupError;
use crate::extractor::TargetKind;

/// Environment variable holding the Kerberos password, kept out of the
/// config file and the process arguments.
pub const PASSWORD_ENV: &str = "HADOOP_EXPORTER_KRB5_PASSWORD";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Polled endpoint settings
    pub target: TargetConfig,
    /// Kerberos credential settings; absent means anonymous fetch
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Exposition path
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            path: default_metrics_path(),
        }
    }
}

/// The endpoint to poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Which daemon the endpoint belongs to; selects the rule table
    pub kind: TargetKind,
    /// Full endpoint URL, e.g. `http://nn01.example.com:50070/jmx`
    pub url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Kerberos credential settings. All fields optional; an empty block means
/// anonymous fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Principal as `user@REALM`
    #[serde(default)]
    pub principal: Option<String>,
    /// Keytab path; when absent the password env variable is consulted
    #[serde(default)]
    pub keytab: Option<PathBuf>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9070
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

pub(crate) fn default_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Validate structural settings. Credential resolution happens
    /// separately in [`Config::auth_mode`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".to_string()));
        }
        if !self.server.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.path '{}' must start with '/'",
                self.server.path
            )));
        }
        if self.target.url.is_empty() {
            return Err(ConfigError::Invalid("target.url must not be empty".to_string()));
        }
        if self.target.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "target.timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the credential configuration into a concrete [`AuthMode`].
    ///
    /// Checked once at startup: a malformed principal or unreadable keytab
    /// is fatal here, not a per-scrape surprise.
    pub fn auth_mode(&self) -> Result<AuthMode, StartupError> {
        let principal = match &self.auth.principal {
            Some(p) => p,
            None => {
                if self.auth.keytab.is_some() {
                    return Err(StartupError::Credential(
                        "auth.keytab is set but auth.principal is missing".to_string(),
                    ));
                }
                if std::env::var(PASSWORD_ENV).is_ok() {
                    return Err(StartupError::Credential(format!(
                        "{} is set but auth.principal is missing",
                        PASSWORD_ENV
                    )));
                }
                debug!("no credential configured, fetching anonymously");
                return Ok(AuthMode::Anonymous);
            }
        };

        Principal::parse(principal)
            .map_err(|e| StartupError::Credential(e.to_string()))?;

        if let Some(keytab) = &self.auth.keytab {
            std::fs::metadata(keytab).map_err(|source| StartupError::KeytabUnreadable {
                path: keytab.display().to_string(),
                source,
            })?;
            return Ok(AuthMode::Keytab {
                path: keytab.clone(),
                principal: principal.clone(),
            });
        }

        match std::env::var(PASSWORD_ENV) {
            Ok(password) if !password.is_empty() => Ok(AuthMode::Password {
                principal: principal.clone(),
                password,
            }),
            _ => Err(StartupError::Credential(format!(
                "auth.principal is set but neither auth.keytab nor {} provides a credential",
                PASSWORD_ENV
            ))),
        }
    }
}
