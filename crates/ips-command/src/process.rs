//! Streaming command execution

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{self, Signal};
use nix::unistd::{pipe2, Pid};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Mutex, MutexGuard, PoisonError};
use ips_util::DEFAULT_SHELL;
use tracing::{debug, warn};

use crate::{CommandError, CommandResult};

/// Lifecycle of the child process. Reaped exactly once.
#[derive(Debug)]
enum ProcessState {
    Running(Child),
    Exited {
        code: i32,
        /// Whether a non-zero `code` has already been returned to a reader
        reported: bool,
    },
}

/// A shell command whose merged stdout/stderr is consumed line by line.
///
/// The child is spawned immediately, in its own process group, with stdin
/// closed and stdout and stderr writing to the same pipe. Lines are pulled
/// with [`next_line`](Self::next_line) or by iterating; a non-zero exit is
/// reported once, as [`CommandError::ExitedWithError`], when the end of the
/// output is reached.
///
/// All methods take `&self`, so the command can be shared (e.g. in an `Arc`)
/// and [`kill`](Self::kill)ed from another thread while a read is blocked.
#[derive(Debug)]
pub struct StreamingCommand {
    command: String,
    pid: u32,
    reader: Mutex<BufReader<File>>,
    state: Mutex<ProcessState>,
    output: Mutex<String>,
}

impl StreamingCommand {
    /// Spawn `command` under `/bin/sh -c`
    pub fn new(command: impl Into<String>) -> CommandResult<Self> {
        Self::with_shell(command, DEFAULT_SHELL)
    }

    /// Spawn `command` under `<shell> -c`
    pub fn with_shell(command: impl Into<String>, shell: impl AsRef<Path>) -> CommandResult<Self> {
        let command = command.into();
        let shell = shell.as_ref();
        debug!(command = %command, shell = %shell.display(), "Executing command");

        let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC)
            .map_err(|e| CommandError::SpawnFailed(format!("Failed to create pipe: {}", e)))?;
        let stderr_end = write_end.try_clone()?;

        let child = {
            let mut cmd = Command::new(shell);
            cmd.arg("-c")
                .arg(&command)
                .stdin(Stdio::null())
                .stdout(Stdio::from(write_end))
                .stderr(Stdio::from(stderr_end))
                .process_group(0);

            // `cmd` owns the parent's copies of the write end; they are closed
            // when it goes out of scope so EOF arrives once the child is done.
            cmd.spawn().map_err(|e| {
                CommandError::SpawnFailed(format!("Failed to spawn {}: {}", shell.display(), e))
            })?
        };

        let pid = child.id();
        debug!(pid = pid, command = %command, "Process spawned");

        Ok(Self {
            command,
            pid,
            reader: Mutex::new(BufReader::new(File::from(read_end))),
            state: Mutex::new(ProcessState::Running(child)),
            output: Mutex::new(String::new()),
        })
    }

    /// The command string as given
    pub fn command(&self) -> &str {
        &self.command
    }

    /// OS process ID of the shell, which is also its process group ID
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit code, once the process has been reaped.
    ///
    /// Negative values are the signal number that terminated the process.
    pub fn exit_code(&self) -> Option<i32> {
        match &*lock(&self.state) {
            ProcessState::Running(_) => None,
            ProcessState::Exited { code, .. } => Some(*code),
        }
    }

    /// Whether the process has been reaped and no more lines will be produced
    pub fn is_finished(&self) -> bool {
        self.exit_code().is_some()
    }

    /// Every line produced so far, concatenated
    pub fn output(&self) -> String {
        lock(&self.output).clone()
    }

    /// Read the next line of output.
    ///
    /// Blocks until a full line is available or the output is closed.
    /// Returns:
    /// - `Ok(Some(line))` with the trailing newline kept (a final unterminated
    ///   chunk is returned as-is)
    /// - `Ok(None)` once the process exited with status 0, and on every call
    ///   after termination has been reported
    /// - `Err(ExitedWithError)` exactly once, on the first read after the
    ///   process exited non-zero or was killed
    /// - `Err(Decode)` if the line is not valid UTF-8; the line is skipped and
    ///   reading may continue
    pub fn next_line(&self) -> CommandResult<Option<String>> {
        let mut reader = lock(&self.reader);

        {
            let mut state = lock(&self.state);
            if matches!(*state, ProcessState::Exited { .. }) {
                return self.report(&mut state);
            }
        }

        let mut buf = Vec::new();
        let read = reader.read_until(b'\n', &mut buf);

        let mut state = lock(&self.state);
        match read {
            Ok(0) => {
                self.reap(&mut state)?;
                return self.report(&mut state);
            }
            Ok(_) => {}
            Err(e) => {
                if matches!(*state, ProcessState::Exited { .. }) {
                    return self.report(&mut state);
                }
                return Err(e.into());
            }
        }

        // Killed while this line was being read: iteration is over.
        if matches!(*state, ProcessState::Exited { .. }) {
            return self.report(&mut state);
        }

        let line = String::from_utf8(buf).map_err(|source| CommandError::Decode {
            command: self.command.clone(),
            source,
        })?;
        debug!(command = %self.command, line = %line.trim_end(), "Got a line");

        lock(&self.output).push_str(&line);
        Ok(Some(line))
    }

    /// Forcibly terminate the command with SIGKILL and wait for it.
    ///
    /// The whole process group is signalled, so pipelines and background
    /// jobs started by the shell die too. Output not yet read is discarded;
    /// the next [`next_line`](Self::next_line) call fails with the signal's
    /// negative exit code. Killing an already reaped process is a no-op.
    pub fn kill(&self) -> CommandResult<()> {
        let mut state = lock(&self.state);
        let ProcessState::Running(child) = &mut *state else {
            debug!(command = %self.command, "Process already reaped, ignoring kill");
            return Ok(());
        };

        debug!(pid = self.pid, command = %self.command, "Sending SIGKILL to process group");
        match signal::kill(Pid::from_raw(-(self.pid as i32)), Signal::SIGKILL) {
            Ok(()) => {}
            Err(Errno::ESRCH) => {
                // Group already gone, the wait below still reaps the leader
            }
            Err(e) => {
                return Err(CommandError::KillFailed(format!(
                    "Failed to send SIGKILL to {}: {}",
                    self.pid, e
                )));
            }
        }

        let code = status_code(child.wait()?);
        debug!(command = %self.command, code = code, "Command exited");
        *state = ProcessState::Exited {
            code,
            reported: false,
        };
        Ok(())
    }

    /// Wait for a running child and record its exit code
    fn reap(&self, state: &mut ProcessState) -> CommandResult<()> {
        if let ProcessState::Running(child) = state {
            let code = status_code(child.wait()?);
            debug!(command = %self.command, code = code, "Command exited");
            *state = ProcessState::Exited {
                code,
                reported: false,
            };
        }
        Ok(())
    }

    /// Terminal result for an exited process
    fn report(&self, state: &mut ProcessState) -> CommandResult<Option<String>> {
        match state {
            ProcessState::Exited { code, reported } if *code != 0 && !*reported => {
                *reported = true;
                Err(CommandError::ExitedWithError {
                    command: self.command.clone(),
                    code: *code,
                    output: self.output(),
                })
            }
            _ => Ok(None),
        }
    }
}

impl Drop for StreamingCommand {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        if let ProcessState::Running(child) = state {
            debug!(pid = self.pid, command = %self.command, "Killing unfinished command on drop");
            let _ = signal::kill(Pid::from_raw(-(self.pid as i32)), Signal::SIGKILL);
            if let Err(e) = child.wait() {
                warn!(pid = self.pid, error = %e, "Failed to reap command on drop");
            }
        }
    }
}

impl Iterator for StreamingCommand {
    type Item = CommandResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

impl Iterator for &StreamingCommand {
    type Item = CommandResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

/// Exit code, or the negated signal number for signal deaths
fn status_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    const FOREVER: &str = "while true; do echo hello; sleep 1; done";

    #[test]
    fn lines_in_order_then_end_of_stream() {
        let cmd = StreamingCommand::new("echo hello && echo world").unwrap();

        assert_eq!(cmd.next_line().unwrap().as_deref(), Some("hello\n"));
        assert_eq!(cmd.next_line().unwrap().as_deref(), Some("world\n"));
        assert_eq!(cmd.next_line().unwrap(), None);
        assert_eq!(cmd.exit_code(), Some(0));
        assert_eq!(cmd.output(), "hello\nworld\n");
    }

    #[test]
    fn iterator_collects_lines() {
        let cmd = StreamingCommand::new("for i in 1 2 3; do echo $i; done").unwrap();
        let lines: Vec<String> = cmd.collect::<CommandResult<_>>().unwrap();
        assert_eq!(lines, vec!["1\n", "2\n", "3\n"]);
    }

    #[test]
    fn no_output_and_success_ends_immediately() {
        let cmd = StreamingCommand::new("true").unwrap();
        assert_eq!(cmd.next_line().unwrap(), None);
        assert!(cmd.is_finished());
    }

    #[test]
    fn stderr_is_merged() {
        let cmd = StreamingCommand::new("echo out; echo err >&2").unwrap();
        let lines: Vec<String> = (&cmd).collect::<CommandResult<_>>().unwrap();
        assert_eq!(lines, vec!["out\n", "err\n"]);
    }

    #[test]
    fn unterminated_last_line() {
        let cmd = StreamingCommand::new("printf 'a\\nb'").unwrap();
        assert_eq!(cmd.next_line().unwrap().as_deref(), Some("a\n"));
        assert_eq!(cmd.next_line().unwrap().as_deref(), Some("b"));
        assert_eq!(cmd.next_line().unwrap(), None);
    }

    #[test]
    fn non_zero_exit_reported_once() {
        let cmd = StreamingCommand::new("echo partial; exit 3").unwrap();
        assert_eq!(cmd.next_line().unwrap().as_deref(), Some("partial\n"));

        match cmd.next_line() {
            Err(CommandError::ExitedWithError {
                command,
                code,
                output,
            }) => {
                assert_eq!(command, "echo partial; exit 3");
                assert_eq!(code, 3);
                assert_eq!(output, "partial\n");
            }
            other => panic!("expected exit error, got {:?}", other),
        }

        // Terminal state is stable
        assert_eq!(cmd.next_line().unwrap(), None);
        assert_eq!(cmd.next_line().unwrap(), None);
        assert_eq!(cmd.exit_code(), Some(3));
    }

    #[test]
    fn false_fails_with_empty_output() {
        let cmd = StreamingCommand::new("false").unwrap();
        let err = cmd.next_line().unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(err.to_string(), "command \"false\" exited with an error: 1: ");
    }

    #[test]
    fn unknown_command_is_an_exit_error() {
        let cmd = StreamingCommand::new("no-such-command-for-ips-tests").unwrap();
        let lines: Vec<CommandResult<String>> = (&cmd).collect();
        let err = lines
            .into_iter()
            .find_map(Result::err)
            .expect("missing exit error");
        assert_eq!(err.exit_code(), Some(127));
    }

    #[test]
    fn kill_after_first_line() {
        let cmd = StreamingCommand::new(FOREVER).unwrap();
        assert_eq!(cmd.next_line().unwrap().as_deref(), Some("hello\n"));

        cmd.kill().unwrap();
        assert_eq!(cmd.exit_code(), Some(-9));

        match cmd.next_line() {
            Err(CommandError::ExitedWithError { code, output, .. }) => {
                assert_eq!(code, -9);
                assert_eq!(output, "hello\n");
            }
            other => panic!("expected exit error, got {:?}", other),
        }
        assert_eq!(cmd.next_line().unwrap(), None);
    }

    #[test]
    fn kill_twice_is_noop() {
        let cmd = StreamingCommand::new(FOREVER).unwrap();
        cmd.kill().unwrap();
        cmd.kill().unwrap();
        assert_eq!(cmd.exit_code(), Some(-9));
    }

    #[test]
    fn kill_after_natural_exit_is_noop() {
        let cmd = StreamingCommand::new("echo done").unwrap();
        assert_eq!(cmd.next_line().unwrap().as_deref(), Some("done\n"));
        assert_eq!(cmd.next_line().unwrap(), None);

        cmd.kill().unwrap();
        assert_eq!(cmd.exit_code(), Some(0));
        assert_eq!(cmd.next_line().unwrap(), None);
    }

    #[test]
    fn kill_from_another_thread_unblocks_reader() {
        let cmd = Arc::new(StreamingCommand::new("echo first; sleep 30").unwrap());
        assert_eq!(cmd.next_line().unwrap().as_deref(), Some("first\n"));

        let killer = {
            let cmd = Arc::clone(&cmd);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                cmd.kill().unwrap();
            })
        };

        let start = Instant::now();
        let err = cmd.next_line().unwrap_err();
        killer.join().unwrap();

        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(err.exit_code(), Some(-9));
        assert_eq!(cmd.output(), "first\n");
        assert_eq!(cmd.next_line().unwrap(), None);
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let cmd = StreamingCommand::new("printf '\\377\\n'; echo ok").unwrap();
        assert!(matches!(cmd.next_line(), Err(CommandError::Decode { .. })));
        assert_eq!(cmd.next_line().unwrap().as_deref(), Some("ok\n"));
        assert_eq!(cmd.next_line().unwrap(), None);
        assert_eq!(cmd.output(), "ok\n");
    }

    #[test]
    fn missing_shell_fails_at_spawn() {
        let result = StreamingCommand::with_shell("echo hello", "/nonexistent/ips-shell");
        assert!(matches!(result, Err(CommandError::SpawnFailed(_))));
    }

    #[test]
    fn drop_reaps_running_command() {
        let cmd = StreamingCommand::new("sleep 30").unwrap();
        let pid = Pid::from_raw(cmd.pid() as i32);
        drop(cmd);

        // The process is gone and reaped, not a zombie
        assert_eq!(signal::kill(pid, None::<Signal>), Err(Errno::ESRCH));
    }
}
