use crate::auth::flow::DEFAULT_MIN_PASSWORD_LEN;
use crate::auth::store::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DB_FILE};
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory under the user's home holding `config.toml`.
const CONFIG_DIR_NAME: &str = ".credstore";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration, read from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Where this config was loaded from (not serialized).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub scenes: ScenesConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the `users` table.
    pub path: PathBuf,
    /// How long a connection waits on a locked database (milliseconds).
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    /// Minimum password length accepted at registration.
    pub min_password_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

/// Scene names handed back to the host. Opaque to this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScenesConfig {
    /// Scene to load after a successful login.
    pub after_login: String,
}

impl Default for ScenesConfig {
    fn default() -> Self {
        Self {
            after_login: "MainScreen".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Tables dumped by `report` when none are named explicitly.
    pub tables: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            tables: vec!["users".into()],
        }
    }
}

impl Config {
    /// Load from `path` if given, else `~/.credstore/config.toml` if it exists,
    /// else fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }
}

/// `~/.credstore/config.toml`, or `None` when no home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|u| u.home_dir().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
