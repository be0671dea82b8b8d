use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::core::client;

pub const ENV_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_TOKEN: &str = "TWILIO_TOKEN";
pub const ENV_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("No account SID configured (--account, TWILIO_ACCOUNT_SID or [account].sid)")]
    MissingAccount,
    #[error("Invalid account SID: '{0}' (must be alphanumeric)")]
    InvalidAccount(String),
    #[error("No credential configured (--token, TWILIO_TOKEN, TWILIO_AUTH_TOKEN or [account])")]
    MissingCredential,
    #[error("Invalid listen address: '{0}'")]
    InvalidListen(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account SID, used in the request path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Pre-encoded Basic token, forwarded verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Raw auth token; the Basic token is derived from `sid:auth_token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    client::DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    "twil".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "0.0.0.0:2112".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Values supplied on the command line. They take precedence over the
/// environment and the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub account: Option<String>,
    pub token: Option<String>,
    /// Port in the `:2112` or `2112` form
    pub port: Option<String>,
    pub listen: Option<String>,
}

/// Fully resolved settings, fixed for the lifetime of the process.
#[derive(Clone)]
pub struct ExporterConfig {
    pub account_sid: String,
    /// Value sent after `Basic ` in the Authorization header
    pub basic_token: String,
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub listen: SocketAddr,
}

impl std::fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("account_sid", &self.account_sid)
            .field("basic_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("listen", &self.listen)
            .finish()
    }
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("twil").join("config.toml")
    }

    /// Load config from `path`, or from the default path when `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Serialize and write this config to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override account fields from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(sid) = non_empty(ENV_ACCOUNT_SID) {
            self.account.sid = Some(sid);
        }
        if let Some(token) = non_empty(ENV_TOKEN) {
            self.account.token = Some(token);
        }
        if let Some(auth_token) = non_empty(ENV_AUTH_TOKEN) {
            self.account.auth_token = Some(auth_token);
        }
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(account) = &overrides.account {
            self.account.sid = Some(account.clone());
        }
        if let Some(token) = &overrides.token {
            self.account.token = Some(token.clone());
            // An explicit token wins over a derived one
            self.account.auth_token = None;
        }
        if let Some(listen) = &overrides.listen {
            self.server.listen = listen.clone();
        } else if let Some(port) = &overrides.port {
            self.server.listen = listen_from_port(port);
        }
    }

    /// Resolve into the immutable settings the exporter runs with.
    pub fn resolve(&self) -> Result<ExporterConfig, ConfigError> {
        let account_sid = self
            .account
            .sid
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingAccount)?;
        if !is_valid_sid(&account_sid) {
            return Err(ConfigError::InvalidAccount(account_sid));
        }

        let basic_token = match (&self.account.token, &self.account.auth_token) {
            (Some(token), _) if !token.is_empty() => token.clone(),
            (_, Some(auth_token)) if !auth_token.is_empty() => {
                BASE64.encode(format!("{}:{}", account_sid, auth_token))
            }
            _ => return Err(ConfigError::MissingCredential),
        };

        let listen: SocketAddr = self
            .server
            .listen
            .parse()
            .map_err(|_| ConfigError::InvalidListen(self.server.listen.clone()))?;

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "upstream.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(ExporterConfig {
            account_sid,
            basic_token,
            base_url: self.upstream.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(self.upstream.timeout_secs),
            user_agent: self.upstream.user_agent.clone(),
            listen,
        })
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if let Some(sid) = &self.account.sid {
            if !is_valid_sid(sid) {
                issues.push(format!(
                    "Invalid account sid: '{}' (must be alphanumeric)",
                    sid
                ));
            }
        }
        if self.account.token.is_some() && self.account.auth_token.is_some() {
            issues.push(
                "Both account.token and account.auth_token are set; token takes precedence"
                    .to_string(),
            );
        }
        if let Err(e) = client::validate_endpoint(&self.upstream.base_url) {
            issues.push(format!("Invalid upstream.base_url: {}", e));
        }
        if self.upstream.timeout_secs == 0 {
            issues.push("Invalid upstream.timeout_secs: must be greater than 0".to_string());
        }
        if self.upstream.user_agent.trim().is_empty() {
            issues.push("Invalid upstream.user_agent: must not be empty".to_string());
        }
        if self.server.listen.parse::<SocketAddr>().is_err() {
            issues.push(format!(
                "Invalid server.listen: '{}' (expected host:port)",
                self.server.listen
            ));
        }
        issues
    }
}

/// Account SIDs end up in the request path, so only plain ASCII
/// alphanumerics are accepted.
fn is_valid_sid(sid: &str) -> bool {
    !sid.is_empty() && sid.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Accept the `:2112` flag form as well as a bare port.
fn listen_from_port(port: &str) -> String {
    let port = port.trim();
    let port = port.strip_prefix(':').unwrap_or(port);
    format!("0.0.0.0:{}", port)
}
