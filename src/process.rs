//! External process execution.
//!
//! Discovery goes through the [`Runner`] trait so the cache and registry can
//! be driven without spawning real processes. [`ShellRunner`] is the
//! production implementation.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::process::Command;

use crate::{glog_debug, glog_trace, Error, Result};

/// Fully captured output of a successful process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

pub trait Runner: Send + Sync {
    /// Run `command_line` in `cwd` and wait for it to exit.
    ///
    /// A non-zero or abnormal exit is an [`Error::Process`] that still
    /// carries the captured streams.
    fn run<'a>(&'a self, command_line: &'a str, cwd: &'a Path) -> BoxFuture<'a, Result<ProcessOutput>>;
}

/// Runs command lines through the platform shell.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    timeout: Option<Duration>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the process and fail with [`Error::Timeout`] if it runs longer
    /// than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn execute(&self, command_line: &str, cwd: &Path) -> Result<ProcessOutput> {
        glog_debug!("ShellRunner::run cwd={} cmd={}", cwd.display(), command_line);

        let mut cmd = shell_command(command_line);
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .map_err(|e| Error::process(format!("failed to spawn `{}`: {}", command_line, e)))?;

        // Dropped on every exit path of this future, including timeout and
        // abort, taking whatever the shell forked down with it.
        let _group = ProcessGroup::new(child.id());

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| Error::process(format!("failed to wait for `{}`: {}", command_line, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        glog_trace!("ShellRunner stdout: {} bytes, stderr: {} bytes", stdout.len(), stderr.len());

        if !output.status.success() {
            let cause = describe_status(command_line, output.status);
            glog_debug!("ShellRunner failed: {}", cause);
            return Err(Error::Process {
                cause,
                stdout,
                stderr,
            });
        }

        glog_debug!("ShellRunner exited cleanly: {}", command_line);
        Ok(ProcessOutput { stdout, stderr })
    }
}

impl Runner for ShellRunner {
    fn run<'a>(&'a self, command_line: &'a str, cwd: &'a Path) -> BoxFuture<'a, Result<ProcessOutput>> {
        self.execute(command_line, cwd).boxed()
    }
}

/// Process group led by a spawned shell. Dropping it sends SIGKILL to the
/// whole group so grandchildren (e.g. the binary `go run` builds) die too.
struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid.and_then(|p| libc::pid_t::try_from(p).ok()) {
            // ESRCH just means every member already exited.
            // SAFETY: killpg only signals; the group was created by our spawn.
            let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
            if rc == 0 {
                glog_trace!("killed process group {}", pgid);
            }
        }
    }
}

/// Build a shell invocation of `command_line` for the current platform.
pub fn shell_command(command_line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
}

fn describe_status(command_line: &str, status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("`{}` exited with code {}", command_line, code),
        None => format!("`{}` was terminated by a signal", command_line),
    }
}
