//! Configuration validation

use crate::schema::RawConfig;
use std::path::Path;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Shell '{path}': {message}")]
    InvalidShell { path: String, message: String },

    #[error("Path '{field}' must be absolute: {value}")]
    RelativePath { field: &'static str, value: String },

    #[error("Invalid network device '{0}'")]
    InvalidDevice(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(shell) = &config.command.shell {
        if shell.as_os_str().is_empty() {
            errors.push(ValidationError::InvalidShell {
                path: String::new(),
                message: "shell cannot be empty".into(),
            });
        } else if !shell.is_absolute() {
            errors.push(ValidationError::InvalidShell {
                path: shell.display().to_string(),
                message: "shell must be an absolute path".into(),
            });
        }
    }

    if let Some(prefix) = &config.paths.prefix {
        errors.extend(check_absolute("paths.prefix", prefix));
    }
    if let Some(data_dir) = &config.paths.data_dir {
        errors.extend(check_absolute("paths.data_dir", data_dir));
    }

    if let Some(device) = &config.network.default_device {
        if !is_valid_device_name(device) {
            errors.push(ValidationError::InvalidDevice(device.clone()));
        }
    }

    errors
}

fn check_absolute(field: &'static str, path: &Path) -> Option<ValidationError> {
    if path.is_absolute() {
        None
    } else {
        Some(ValidationError::RelativePath {
            field,
            value: path.display().to_string(),
        })
    }
}

/// Linux interface names: 1-15 bytes, no whitespace or '/'
fn is_valid_device_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 15
        && !name.chars().any(|c| c.is_whitespace() || c == '/')
}
