//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// How commands are executed
    #[serde(default)]
    pub command: RawCommandConfig,

    /// Data file locations
    #[serde(default)]
    pub paths: RawPathsConfig,

    /// Network address discovery
    #[serde(default)]
    pub network: RawNetworkConfig,
}

/// Command execution settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCommandConfig {
    /// Shell used to interpret command strings (default: /bin/sh)
    pub shell: Option<PathBuf>,
}

/// Path settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPathsConfig {
    /// Installation prefix (default: /usr)
    pub prefix: Option<PathBuf>,

    /// Data directory, overrides `<prefix>/share/ips-common`
    pub data_dir: Option<PathBuf>,
}

/// Network settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNetworkConfig {
    /// Interface used when no default route is found (default: eth0)
    pub default_device: Option<String>,
}
