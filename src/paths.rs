//! Path utilities for determining data storage locations.
//!
//! Tasks live in `<data dir>/taskdeck/tasks.json` and settings in
//! `<config dir>/taskdeck/config.yaml`, with environment overrides for both.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Directory name used under the platform data and config directories.
const APP_DIR_NAME: &str = "taskdeck";

/// The tasks filename.
pub const TASKS_FILENAME: &str = "tasks.json";

/// The settings filename.
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Environment variable overriding the tasks file.
pub const TASKS_FILE_ENV: &str = "TASKDECK_FILE";

/// Environment variable overriding the settings file.
pub const CONFIG_FILE_ENV: &str = "TASKDECK_CONFIG";

/// Marker inserted between a file name and the reason it was set aside.
pub const CORRUPT_MARKER: &str = "corrupt";

/// Get the default tasks file.
///
/// Returns `<data dir>/taskdeck/tasks.json`, or `./tasks.json` if the
/// platform data directory cannot be determined.
#[must_use]
pub fn default_tasks_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from(TASKS_FILENAME),
        |dir| dir.join(APP_DIR_NAME).join(TASKS_FILENAME),
    )
}

/// Get the settings file location, honouring `TASKDECK_CONFIG`.
#[must_use]
pub fn config_path() -> PathBuf {
    if let Some(path) = env_path(CONFIG_FILE_ENV) {
        return path;
    }
    dirs::config_dir().map_or_else(
        || PathBuf::from(CONFIG_FILENAME),
        |dir| dir.join(APP_DIR_NAME).join(CONFIG_FILENAME),
    )
}

/// Read a non-empty path from an environment variable.
#[must_use]
pub fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Path a corrupt store file is moved to: `<name>.corrupt-<reason>` beside it.
#[must_use]
pub fn backup_path(path: &Path, reason: &str) -> PathBuf {
    sibling_with_suffix(path, &format!("{CORRUPT_MARKER}-{reason}"))
}

/// Path of the temporary file used for atomic writes: `<name>.tmp` beside it.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "tmp")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString =
        path.file_name().map_or_else(|| OsString::from(TASKS_FILENAME), OsString::from);
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_tasks_path_ends_with_filename() {
        let path = default_tasks_path();
        assert!(path.ends_with(TASKS_FILENAME));
        if dirs::data_dir().is_some() {
            assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        }
    }

    #[test]
    fn test_backup_path_keeps_directory_and_name() {
        let path = PathBuf::from("/home/me/tasks.json");
        assert_eq!(
            backup_path(&path, "json-decode-error"),
            PathBuf::from("/home/me/tasks.json.corrupt-json-decode-error")
        );
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let path = PathBuf::from("data/tasks.json");
        assert_eq!(temp_path(&path), PathBuf::from("data/tasks.json.tmp"));
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        std::env::set_var(CONFIG_FILE_ENV, "/tmp/custom-config.yaml");
        assert_eq!(config_path(), PathBuf::from("/tmp/custom-config.yaml"));
        std::env::remove_var(CONFIG_FILE_ENV);
        assert!(config_path().ends_with(CONFIG_FILENAME));
    }

    #[test]
    #[serial]
    fn test_env_path_ignores_empty() {
        std::env::set_var(TASKS_FILE_ENV, "");
        assert!(env_path(TASKS_FILE_ENV).is_none());
        std::env::remove_var(TASKS_FILE_ENV);
    }
}
