//! Client configuration.
//!
//! # Responsibility
//! - Resolve store location, owner scope, delete policy and logging settings.
//! - Layer sources: defaults, then optional JSON file, then environment.
//!
//! # Invariants
//! - Loading never panics; bad values become `ConfigError`.
//! - A blank owner id means "unscoped", never an empty-string owner.

use crate::controller::delete::DeletePolicy;
use crate::controller::editor::DEFAULT_SOFT_CHAR_LIMIT;
use crate::logging::{default_log_level, normalize_level};
use crate::model::note::OwnerId;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE_NAME: &str = "jotpad.sqlite3";

pub const ENV_DB_PATH: &str = "JOTPAD_DB_PATH";
pub const ENV_OWNER_ID: &str = "JOTPAD_OWNER_ID";
pub const ENV_DELETE_POLICY: &str = "JOTPAD_DELETE_POLICY";
pub const ENV_SOFT_CHAR_LIMIT: &str = "JOTPAD_SOFT_CHAR_LIMIT";
pub const ENV_LOG_LEVEL: &str = "JOTPAD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "JOTPAD_LOG_DIR";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    InvalidValue {
        key: &'static str,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config file: {err}"),
            Self::InvalidValue { key, reason } => write!(f, "invalid `{key}`: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// SQLite file backing the bundled note store.
    pub db_path: PathBuf,
    /// Owner scope; `None` shares one list between all users.
    pub owner_id: Option<String>,
    pub delete_policy: DeletePolicy,
    pub soft_char_limit: usize,
    /// Falls back to `default_log_level()` when unset.
    pub log_level: Option<String>,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            owner_id: None,
            delete_policy: DeletePolicy::default(),
            soft_char_limit: DEFAULT_SOFT_CHAR_LIMIT,
            log_level: None,
            log_dir: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Optional JSON file, then process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match file {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validated()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Applies `JOTPAD_*` overrides read through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = non_blank(lookup(ENV_DB_PATH)) {
            self.db_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_OWNER_ID) {
            self.owner_id = Some(value);
        }
        if let Some(value) = non_blank(lookup(ENV_DELETE_POLICY)) {
            self.delete_policy = value
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    key: ENV_DELETE_POLICY,
                    reason,
                })?;
        }
        if let Some(value) = non_blank(lookup(ENV_SOFT_CHAR_LIMIT)) {
            self.soft_char_limit =
                value
                    .trim()
                    .parse()
                    .map_err(|err| ConfigError::InvalidValue {
                        key: ENV_SOFT_CHAR_LIMIT,
                        reason: format!("`{value}` is not a character count: {err}"),
                    })?;
        }
        if let Some(value) = non_blank(lookup(ENV_LOG_LEVEL)) {
            self.log_level = Some(value);
        }
        if let Some(value) = non_blank(lookup(ENV_LOG_DIR)) {
            self.log_dir = Some(PathBuf::from(value));
        }
        self.validated()
    }

    /// Owner scope with blank ids normalized away.
    pub fn owner(&self) -> Option<OwnerId> {
        self.owner_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(OwnerId::new)
    }

    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "db_path",
                reason: "path cannot be empty".to_string(),
            });
        }
        if let Some(level) = self.log_level.as_deref() {
            let normalized = normalize_level(level).map_err(|err| ConfigError::InvalidValue {
                key: "log_level",
                reason: err.to_string(),
            })?;
            self.log_level = Some(normalized.to_string());
        }
        Ok(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
