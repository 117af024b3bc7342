//! Server configuration
//!
//! Sources, lowest to highest precedence: built-in defaults, the TOML file
//! (`~/.tcf/config.toml` or an explicit path), environment variables. The
//! CLI applies its own flags on top.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::pool::DEFAULT_MAX_CONNECTIONS;

const DEFAULT_PORT: u16 = 3030;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} is not set (config file or environment)")]
    Missing(&'static str),
}

/// Runtime configuration for the server and maintenance jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind: SocketAddr,
    /// HS256 secret shared with the auth provider
    pub jwt_secret: Option<String>,
    /// Allow any origin instead of localhost only
    pub cors_permissive: bool,
    pub max_connections: u32,
    pub request_timeout_secs: u64,
    /// Account that answers SUPPORT conversations
    pub support_user_id: Option<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            jwt_secret: None,
            cors_permissive: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            support_user_id: None,
        }
    }
}

impl AppConfig {
    /// Default config file path: ~/.tcf/config.toml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tcf/config.toml")
    }

    /// Load the file (if any) and apply environment overrides.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(bind) = lookup("TCF_BIND") {
            self.bind = parse("TCF_BIND", &bind)?;
        }
        if let Some(secret) = lookup("TCF_JWT_SECRET").or_else(|| lookup("SUPABASE_JWT_SECRET")) {
            self.jwt_secret = Some(secret);
        }
        if let Some(value) = lookup("TCF_CORS_PERMISSIVE") {
            self.cors_permissive = parse_bool("TCF_CORS_PERMISSIVE", &value)?;
        }
        if let Some(value) = lookup("TCF_MAX_CONNECTIONS") {
            self.max_connections = parse("TCF_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = lookup("TCF_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse("TCF_REQUEST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("SUPPORT_USER_ID") {
            self.support_user_id = Some(parse("SUPPORT_USER_ID", &value)?);
        }
        Ok(self)
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn require_jwt_secret(&self) -> Result<&str, ConfigError> {
        self.jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("TCF_JWT_SECRET"))
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_owned(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind.to_string(), "127.0.0.1:3030");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(!config.cors_permissive);
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database_url = \"postgres://file/db\"\nmax_connections = 2\nbind = \"0.0.0.0:8080\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path())
            .unwrap()
            .with_overrides(env(&[
                ("DATABASE_URL", "postgres://env/db"),
                ("SUPABASE_JWT_SECRET", "s3cret"),
                ("TCF_CORS_PERMISSIVE", "true"),
            ]))
            .unwrap();

        assert_eq!(config.require_database_url().unwrap(), "postgres://env/db");
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.require_jwt_secret().unwrap(), "s3cret");
        assert!(config.cors_permissive);
    }

    #[test]
    fn tcf_secret_wins_over_provider_secret() {
        let config = AppConfig::default()
            .with_overrides(env(&[
                ("TCF_JWT_SECRET", "ours"),
                ("SUPABASE_JWT_SECRET", "theirs"),
            ]))
            .unwrap();
        assert_eq!(config.jwt_secret.as_deref(), Some("ours"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = AppConfig::default()
            .with_overrides(env(&[("TCF_MAX_CONNECTIONS", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "TCF_MAX_CONNECTIONS",
                ..
            }
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/tcf.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
