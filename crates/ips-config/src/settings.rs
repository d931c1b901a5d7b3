//! Validated settings structures

use crate::schema::RawConfig;
use ips_util::{data_dir_for_prefix, DEFAULT_PREFIX, DEFAULT_SHELL};
use std::path::PathBuf;

/// Interface used when no default route is found
pub const DEFAULT_DEVICE: &str = "eth0";

/// Validated settings with defaults filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Shell that interprets command strings
    pub shell: PathBuf,

    /// Installation prefix
    pub prefix: PathBuf,

    /// Directory holding installed data files
    pub data_dir: PathBuf,

    /// Fallback network interface for address discovery
    pub default_device: String,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let prefix = raw
            .paths
            .prefix
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFIX));

        let data_dir = raw
            .paths
            .data_dir
            .unwrap_or_else(|| data_dir_for_prefix(&prefix));

        Self {
            shell: raw
                .command
                .shell
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SHELL)),
            prefix,
            data_dir,
            default_device: raw
                .network
                .default_device
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            prefix: PathBuf::from(DEFAULT_PREFIX),
            data_dir: data_dir_for_prefix(DEFAULT_PREFIX),
            default_device: DEFAULT_DEVICE.to_string(),
        }
    }
}
