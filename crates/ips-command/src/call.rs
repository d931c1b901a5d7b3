//! Run-to-completion helpers on top of [`StreamingCommand`]

use std::path::{Path, PathBuf};
use tracing::debug;

use ips_util::DEFAULT_SHELL;

use crate::{CommandResult, StreamingCommand};

/// Runs command strings through a fixed shell
#[derive(Debug, Clone)]
pub struct CommandRunner {
    shell: PathBuf,
}

impl CommandRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }

    /// Start `command` and return its line stream
    pub fn stream(&self, command: impl Into<String>) -> CommandResult<StreamingCommand> {
        StreamingCommand::with_shell(command, &self.shell)
    }

    /// Run `command` to completion and return everything it printed.
    ///
    /// Fails with the stream's error, e.g. `ExitedWithError` on a non-zero exit.
    pub fn call(&self, command: impl Into<String>) -> CommandResult<String> {
        let cmd = self.stream(command)?;

        let mut buf = String::new();
        for line in &cmd {
            buf.push_str(&line?);
        }

        debug!(command = %cmd.command(), bytes = buf.len(), "Command finished");
        Ok(buf)
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

/// Run `command` under `/bin/sh` and return its combined output
pub fn call_external_command(command: impl Into<String>) -> CommandResult<String> {
    CommandRunner::default().call(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandError;

    #[test]
    fn call_echo() {
        assert_eq!(call_external_command("echo hello").unwrap(), "hello\n");
    }

    #[test]
    fn call_concatenates_lines() {
        assert_eq!(
            call_external_command("echo hello && echo world").unwrap(),
            "hello\nworld\n"
        );
    }

    #[test]
    fn call_false_fails() {
        match call_external_command("false") {
            Err(CommandError::ExitedWithError { code, output, .. }) => {
                assert_eq!(code, 1);
                assert_eq!(output, "");
            }
            other => panic!("expected exit error, got {:?}", other),
        }
    }

    #[test]
    fn call_failure_keeps_output() {
        let err = call_external_command("echo before; exit 2").unwrap_err();
        assert_eq!(
            err.to_string(),
            "command \"echo before; exit 2\" exited with an error: 2: before\n"
        );
    }

    #[test]
    fn call_stops_on_invalid_utf8() {
        let result = call_external_command("printf '\\377\\n'; echo after");
        assert!(matches!(
            result,
            Err(CommandError::Decode { ref command, .. }) if command == "printf '\\377\\n'; echo after"
        ));
    }

    #[test]
    fn default_runner_uses_shared_shell() {
        assert_eq!(CommandRunner::default().shell(), Path::new(DEFAULT_SHELL));
    }

    #[test]
    fn runner_uses_configured_shell() {
        let runner = CommandRunner::new("/bin/sh");
        assert_eq!(runner.shell(), Path::new("/bin/sh"));
        assert_eq!(runner.call("printf '%s' x | tr x y").unwrap(), "y");
    }
}
