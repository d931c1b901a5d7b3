//! Error types for command execution

use std::string::FromUtf8Error;
use thiserror::Error;

/// Errors from running an external command
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command terminated with a non-zero status, or was killed.
    ///
    /// `code` is negative when the process died from a signal (-9 for SIGKILL).
    #[error("command \"{command}\" exited with an error: {code}: {output}")]
    ExitedWithError {
        command: String,
        code: i32,
        output: String,
    },

    #[error("command \"{command}\" produced invalid UTF-8: {source}")]
    Decode {
        command: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Kill failed: {0}")]
    KillFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// Exit code carried by [`CommandError::ExitedWithError`]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::ExitedWithError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;
