//! Running the control utility.
//!
//! [`Executor`] is the seam between the manager and the operating system.
//! [`ProcessExecutor`] runs a real child process; tests substitute a scripted
//! implementation.

use crate::error::{Error, Result};
use log::{debug, trace, warn};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Default time budget for one control-utility run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Complete standard output, decoded lossily.
    pub stdout: String,
    /// Exit code, `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ExecOutput {
    /// Output of a run that exited with code 0.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
        }
    }
}

/// Runs a program to completion and captures its output.
pub trait Executor: Send + Sync {
    /// Run `program` in `working_dir` with `args` and wait for it to exit.
    ///
    /// Output is buffered in full; a non-zero exit code is not an error.
    fn execute(&self, program: &Path, working_dir: &Path, args: &[String]) -> Result<ExecOutput>;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    timeout: Duration,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ProcessExecutor {
    /// Create an executor that kills runs lasting longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The time budget per run.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Drain a pipe on a background thread so the child never blocks on a full pipe.
///
/// The bytes arrive on the returned channel once the pipe closes, which may be
/// later than the child's exit if a descendant inherited the handle.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf) {
                debug!("Failed to read child output: {e}");
            }
        }
        // The receiver is gone after a timeout.
        let _ = tx.send(buf);
    });
    rx
}

/// Wait for drained output until `deadline`; `None` if it passes first.
fn collect_output(rx: &Receiver<Vec<u8>>, deadline: Instant) -> Option<String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}

#[cfg(windows)]
fn hide_console(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_command: &mut Command) {}

impl Executor for ProcessExecutor {
    fn execute(&self, program: &Path, working_dir: &Path, args: &[String]) -> Result<ExecOutput> {
        trace!("Running {} {}", program.display(), args.join(" "));

        let execution = |source: std::io::Error| Error::Execution {
            program: program.to_path_buf(),
            source,
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        hide_console(&mut command);

        let timed_out = || Error::Timeout {
            program: program.to_path_buf(),
            timeout: self.timeout,
        };

        let deadline = Instant::now() + self.timeout;
        let mut child = command.spawn().map_err(execution)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(self.timeout).map_err(execution)? {
            Some(status) => status,
            None => {
                warn!(
                    "{} exceeded {:?}, killing it",
                    program.display(),
                    self.timeout
                );
                let _ = child.kill();
                let _ = child.wait();
                // Reader threads finish on their own once the pipes close.
                return Err(timed_out());
            },
        };

        let Some(stdout) = collect_output(&stdout, deadline) else {
            warn!(
                "{} exited but its output stayed open past {:?}",
                program.display(),
                self.timeout
            );
            return Err(timed_out());
        };
        let stderr = collect_output(&stderr, deadline).unwrap_or_default();
        if !stderr.trim().is_empty() {
            debug!("stderr: {}", stderr.trim_end());
        }
        trace!("stdout:\n{stdout}");

        if !status.success() {
            debug!("{} exited with {status}", program.display());
        }

        Ok(ExecOutput {
            stdout,
            exit_code: status.code(),
        })
    }
}
