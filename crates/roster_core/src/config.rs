//! Runtime configuration for roster entry points.
//!
//! # Responsibility
//! - Resolve database target and logging settings from the environment.
//! - Open the configured database.
//!
//! # Invariants
//! - `log_level` is always one of trace|debug|info|warn|error.
//! - `log_dir`, when present, is an absolute path.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, normalize_level};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB: &str = "ROSTER_DB";
pub const ENV_LOG_LEVEL: &str = "ROSTER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ROSTER_LOG_DIR";

/// Value accepted in place of a path to request an in-memory database.
pub const MEMORY_TARGET: &str = ":memory:";

/// Where roster data lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DatabaseTarget {
    /// Private in-memory database, discarded on drop.
    #[default]
    Memory,
    File(PathBuf),
}

impl DatabaseTarget {
    /// Parses `:memory:` or a filesystem path.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if trimmed == MEMORY_TARGET {
            return Ok(Self::Memory);
        }
        Ok(Self::File(PathBuf::from(trimmed)))
    }
}

impl Display for DatabaseTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "{MEMORY_TARGET}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDatabasePath,
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDatabasePath => write!(f, "database path cannot be empty"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterConfig {
    pub database: DatabaseTarget,
    pub log_level: &'static str,
    /// `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            database: DatabaseTarget::Memory,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl RosterConfig {
    /// Reads `ROSTER_DB`, `ROSTER_LOG_LEVEL` and `ROSTER_LOG_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or blank keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(database) = read(ENV_DB) {
            config = config.with_database(&database)?;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config = config.with_log_level(&level)?;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config = config.with_log_dir(dir.trim())?;
        }
        Ok(config)
    }

    pub fn with_database(mut self, value: &str) -> Result<Self, ConfigError> {
        self.database = DatabaseTarget::parse(value)?;
        Ok(self)
    }

    pub fn with_log_level(mut self, level: &str) -> Result<Self, ConfigError> {
        self.log_level = normalize_level(level).map_err(ConfigError::InvalidLogLevel)?;
        Ok(self)
    }

    pub fn with_log_dir(mut self, dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        if !dir.is_absolute() {
            return Err(ConfigError::RelativeLogDir(dir.to_path_buf()));
        }
        self.log_dir = Some(dir.to_path_buf());
        Ok(self)
    }

    /// Opens the configured database with migrations applied.
    pub fn open_database(&self) -> DbResult<Connection> {
        match &self.database {
            DatabaseTarget::Memory => open_db_in_memory(),
            DatabaseTarget::File(path) => open_db(path),
        }
    }
}
