//! User settings.
//!
//! Settings live in a YAML file (see [`paths::config_path`]) and are optional:
//! a missing file means defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, IoStage, Result};
use crate::paths;
use crate::tasks::store::write_atomic;

/// Environment variable naming the current user for [`Settings::authorize`].
pub const USER_ENV: &str = "TASKDECK_USER";

/// User settings for taskdeck.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// Tasks file to use when neither `--file` nor `TASKDECK_FILE` is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks_file: Option<PathBuf>,

    /// Refuse to run for anyone but `username`.
    #[serde(default)]
    pub require_auth: bool,

    /// The configured owner of the task list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Settings {
    /// Load settings from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Load settings from a specific file, returning defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| Error::io(IoStage::Read, path, e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        write_atomic(path, content.as_bytes())
    }

    /// Check that `user` may use this task list.
    ///
    /// Passes unless auth is required, a username is configured, and `user`
    /// is missing or different.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the check fails.
    pub fn authorize(&self, user: Option<&str>) -> Result<()> {
        if !self.require_auth {
            return Ok(());
        }
        let Some(expected) = self.username.as_deref() else {
            tracing::warn!("require_auth is set but no username is configured");
            return Ok(());
        };
        match user {
            Some(user) if user == expected => Ok(()),
            Some(user) => Err(Error::Unauthorized(user.to_string())),
            None => Err(Error::Unauthorized(String::new())),
        }
    }

    /// Check the user named by `TASKDECK_USER`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the check fails.
    pub fn authorize_current_user(&self) -> Result<()> {
        let user = std::env::var(USER_ENV).ok();
        self.authorize(user.as_deref())
    }

    /// Pick the tasks file: `flag`, then `TASKDECK_FILE`, then these
    /// settings, then the platform default.
    #[must_use]
    pub fn resolve_tasks_file(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| paths::env_path(paths::TASKS_FILE_ENV))
            .or_else(|| self.tasks_file.clone())
            .unwrap_or_else(paths::default_tasks_path)
    }
}
