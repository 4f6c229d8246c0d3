//! Interpreter process lifecycle.
//!
//! Spawns `tclsh` with all three standard streams piped and tears it down
//! again. Framing and request handling live in [`crate::transport`]; this
//! module only owns the child process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// How long [`InterpreterProcess::shutdown`] waits for a voluntary exit.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The three pipes of a freshly spawned interpreter.
pub struct InterpreterPipes {
	pub stdin: ChildStdin,
	pub stdout: ChildStdout,
	pub stderr: ChildStderr,
}

/// A running interpreter child process.
#[derive(Debug)]
pub struct InterpreterProcess {
	child: Child,
	exe: PathBuf,
}

impl InterpreterProcess {
	/// Launch the interpreter.
	///
	/// `env` entries are added to the inherited environment.
	///
	/// # Errors
	///
	/// Returns `Error::ProcessStart` if the process cannot be spawned or
	/// exits immediately.
	pub async fn launch(
		exe: &Path,
		args: &[OsString],
		env: &[(OsString, OsString)],
	) -> Result<(Self, InterpreterPipes)> {
		let mut cmd = Command::new(exe);
		cmd.args(args)
			.envs(env.iter().map(|(k, v)| (k, v)))
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		let mut child = cmd
			.spawn()
			.map_err(|e| Error::ProcessStart(format!("failed to spawn {}: {e}", exe.display())))?;

		let pipes = match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
			(Some(stdin), Some(stdout), Some(stderr)) => InterpreterPipes { stdin, stdout, stderr },
			_ => {
				let _ = child.start_kill();
				return Err(Error::ProcessStart("interpreter pipes unavailable".to_string()));
			}
		};

		match child.try_wait() {
			Ok(Some(status)) => {
				return Err(Error::ProcessStart(format!(
					"interpreter exited immediately with status: {status}"
				)));
			}
			Ok(None) => {}
			Err(e) => {
				return Err(Error::ProcessStart(format!("failed to check process status: {e}")));
			}
		}

		debug!(
			target = "tclbridge",
			exe = %exe.display(),
			pid = child.id().unwrap_or_default(),
			"interpreter started"
		);

		Ok((
			Self {
				child,
				exe: exe.to_path_buf(),
			},
			pipes,
		))
	}

	pub fn exe(&self) -> &Path {
		&self.exe
	}

	pub fn id(&self) -> Option<u32> {
		self.child.id()
	}

	/// Returns whether the process has not exited yet.
	pub fn is_running(&mut self) -> bool {
		matches!(self.child.try_wait(), Ok(None))
	}

	/// Waits up to `grace` for the process to exit on its own, then kills it.
	///
	/// Callers ask the interpreter to exit (or close its stdin) first.
	pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
		match tokio::time::timeout(grace, self.child.wait()).await {
			Ok(Ok(status)) => {
				debug!(target = "tclbridge", %status, "interpreter exited");
				Ok(())
			}
			Ok(Err(e)) => Err(Error::Io(e)),
			Err(_) => {
				warn!(
					target = "tclbridge",
					grace_ms = grace.as_millis() as u64,
					"interpreter did not exit in time, killing"
				);
				self.kill().await
			}
		}
	}

	/// Force kill the process.
	pub async fn kill(mut self) -> Result<()> {
		if let Err(e) = self.child.kill().await {
			// Already reaped
			if self.child.try_wait().ok().flatten().is_none() {
				return Err(Error::Io(e));
			}
		}
		let _ = tokio::time::timeout(Duration::from_millis(500), self.child.wait()).await;
		Ok(())
	}
}
