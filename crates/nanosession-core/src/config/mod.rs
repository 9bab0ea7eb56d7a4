use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result as CoreResult};

/// Root configuration for nanosession.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct Config {
    pub session: SessionConfig,
    pub store: StoreConfig,
    pub http: HttpConfig,
}

/// What the manager does when the backing store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailPolicy {
    /// Log and continue as if the session were empty.
    #[default]
    Open,
    /// Surface the store error to the caller.
    Closed,
}

impl std::str::FromStr for FailPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" | "fail-open" => Ok(FailPolicy::Open),
            "closed" | "fail-closed" => Ok(FailPolicy::Closed),
            _ => Err(format!("Unknown fail policy: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

pub const MAX_LIFETIME_SECS: u64 = 400 * 24 * 3600;

/// Session lifecycle and cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub lifetime_secs: u64,
    pub rotate_on_login: bool,
    pub refresh_on_read: bool,
    pub store_timeout_ms: u64,
    pub fail_policy: FailPolicy,
    pub secure: bool,
    pub same_site: SameSite,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    /// Session key whose value identifies the authenticated principal.
    pub principal_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "simple-user-session".to_string(),
            lifetime_secs: 31 * 24 * 3600,
            rotate_on_login: true,
            refresh_on_read: false,
            store_timeout_ms: 2_000,
            fail_policy: FailPolicy::Open,
            secure: true,
            same_site: SameSite::Lax,
            cookie_path: "/".to_string(),
            cookie_domain: None,
            principal_key: "username".to_string(),
        }
    }
}

impl SessionConfig {
    /// Session lifetime, between one second and the 400 day limit browsers
    /// apply to cookies.
    pub fn lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lifetime_secs.clamp(1, MAX_LIFETIME_SECS) as i64)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    File,
    Dynamodb,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            "dynamodb" | "dynamo" => Ok(StoreBackend::Dynamodb),
            _ => Err(format!("Unknown store backend: {s}")),
        }
    }
}

/// Backing store selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory for the file backend. Empty means `<data dir>/sessions`.
    pub directory: String,
    pub table_name: String,
    /// Interval for the expired-record sweeper. Zero disables it.
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            directory: String::new(),
            table_name: "sessions".to_string(),
            sweep_interval_secs: 15 * 60,
        }
    }
}

impl StoreConfig {
    /// Get the file backend directory, expanding `~/`.
    pub fn directory_path(&self) -> PathBuf {
        let dir = &self.directory;
        if dir.is_empty() {
            return get_data_dir().join("sessions");
        }
        if dir.starts_with("~/") || dir.starts_with("~\\") {
            if let Some(home) = dirs::home_dir() {
                return home.join(&dir[2..]);
            }
        }
        PathBuf::from(dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfig {
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

impl Config {
    /// Reject settings that would make every session unusable.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Invalid("cookieName must not be empty".into()));
        }
        if self.session.lifetime_secs == 0 {
            return Err(ConfigError::Invalid("lifetimeSecs must be at least 1".into()));
        }
        if self.session.store_timeout_ms == 0 {
            return Err(ConfigError::Invalid("storeTimeoutMs must be at least 1".into()));
        }
        if self.session.principal_key.is_empty() {
            return Err(ConfigError::Invalid("principalKey must not be empty".into()));
        }
        Ok(())
    }
}

/// Load configuration from environment variables.
///
/// `NANOSESSION_CONFIG` may hold a full JSON document. Otherwise individual
/// variables override the defaults.
pub fn load_config_from_env() -> Config {
    if let Ok(json) = std::env::var("NANOSESSION_CONFIG") {
        match serde_json::from_str::<Config>(&json) {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => return cfg,
                Err(e) => tracing::warn!("Ignoring NANOSESSION_CONFIG: {}", e),
            },
            Err(e) => {
                tracing::warn!("Failed to parse NANOSESSION_CONFIG: {}", e);
            }
        }
    }

    let mut cfg = Config::default();

    if let Ok(v) = std::env::var("NANOSESSION_COOKIE_NAME") {
        cfg.session.cookie_name = v;
    }
    if let Some(v) = env_parse::<u64>("NANOSESSION_LIFETIME_SECS").filter(|v| *v > 0) {
        cfg.session.lifetime_secs = v;
    }
    if let Some(v) = env_parse::<bool>("NANOSESSION_ROTATE_ON_LOGIN") {
        cfg.session.rotate_on_login = v;
    }
    if let Some(v) = env_parse::<bool>("NANOSESSION_REFRESH_ON_READ") {
        cfg.session.refresh_on_read = v;
    }
    if let Some(v) = env_parse::<u64>("NANOSESSION_STORE_TIMEOUT_MS").filter(|v| *v > 0) {
        cfg.session.store_timeout_ms = v;
    }
    if let Some(v) = env_parse::<FailPolicy>("NANOSESSION_FAIL_POLICY") {
        cfg.session.fail_policy = v;
    }
    if let Some(v) = env_parse::<bool>("NANOSESSION_SECURE") {
        cfg.session.secure = v;
    }

    // Store
    if let Some(v) = env_parse::<StoreBackend>("NANOSESSION_STORE") {
        cfg.store.backend = v;
    }
    if let Ok(v) = std::env::var("NANOSESSION_STORE_DIR") {
        cfg.store.directory = v;
    }
    if let Ok(v) = std::env::var("NANOSESSION_DYNAMODB_TABLE") {
        cfg.store.table_name = v;
        cfg.store.backend = StoreBackend::Dynamodb;
    }

    if let Ok(v) = std::env::var("NANOSESSION_BIND") {
        cfg.http.bind = v;
    }

    cfg
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            None
        }
    }
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nanosession")
        .join("config.json")
}

/// Get the nanosession data directory.
pub fn get_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nanosession")
}

/// Load configuration from file or create default.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Config>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => return config,
                    Err(e) => {
                        tracing::warn!("Rejected config from {}: {}", path.display(), e);
                        tracing::warn!("Using default configuration.");
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to parse config from {}: {}", path.display(), e);
                    tracing::warn!("Using default configuration.");
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config from {}: {}", path.display(), e);
                tracing::warn!("Using default configuration.");
            }
        }
    }

    Config::default()
}

/// Load configuration strictly: a missing, malformed or invalid file is an error.
pub fn try_load_config(path: &Path) -> CoreResult<Config> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content).map_err(ConfigError::from)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to file.
pub fn save_config(config: &Config, config_path: Option<&Path>) -> CoreResult<()> {
    config.validate()?;
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(ConfigError::from)?;
    std::fs::write(&path, json)?;
    Ok(())
}
