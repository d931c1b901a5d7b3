//! Default paths for ips-common components
//!
//! - Config: `$XDG_CONFIG_HOME/ips-common/config.toml` or `~/.config/ips-common/config.toml`
//! - Data: `$IPS_DATA_DIR`, or `<prefix>/share/ips-common` with prefix `/usr`

use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable for overriding the data directory
pub const IPS_DATA_DIR_ENV: &str = "IPS_DATA_DIR";

/// Installation prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "/usr";

/// Shell that interprets command strings when none is configured
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Application subdirectory name
const APP_DIR: &str = "ips-common";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/ips-common/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/ips-common/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$IPS_DATA_DIR` environment variable (if set)
/// 2. `/usr/share/ips-common`
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(IPS_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_for_prefix(DEFAULT_PREFIX)
}

/// Data directory below an installation prefix: `<prefix>/share/ips-common`
pub fn data_dir_for_prefix(prefix: impl AsRef<Path>) -> PathBuf {
    prefix.as_ref().join("share").join(APP_DIR)
}

/// Resolve a data file against the default data directory.
///
/// See [`data_file_in`].
pub fn data_file(name: impl AsRef<Path>) -> PathBuf {
    data_file_in(default_data_dir(), name)
}

/// Resolve a data file against `data_dir`.
///
/// A file of the same name relative to the current directory takes
/// precedence over the installed copy.
pub fn data_file_in(data_dir: impl AsRef<Path>, name: impl AsRef<Path>) -> PathBuf {
    let name = name.as_ref();
    if name.exists() {
        debug!(path = %name.display(), "Using local data file");
        return name.to_path_buf();
    }

    data_dir.as_ref().join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_contains_app_dir() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("ips-common"));
        assert!(path.ends_with(CONFIG_FILENAME));
    }

    #[test]
    fn data_dir_below_prefix() {
        assert_eq!(
            data_dir_for_prefix("/usr"),
            PathBuf::from("/usr/share/ips-common")
        );
        assert_eq!(
            data_dir_for_prefix("/opt/ips"),
            PathBuf::from("/opt/ips/share/ips-common")
        );
    }

    #[test]
    fn missing_data_file_resolves_to_data_dir() {
        let path = data_file_in("/usr/share/ips-common", "no-such-file-here.conf");
        assert_eq!(
            path,
            PathBuf::from("/usr/share/ips-common/no-such-file-here.conf")
        );
    }

    #[test]
    fn existing_data_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local.conf");
        std::fs::write(&local, "x").unwrap();

        let path = data_file_in("/usr/share/ips-common", &local);
        assert_eq!(path, local);
    }
}
