//! Interpreter session.
//!
//! A [`Connection`] owns one interpreter process and serializes every
//! command through its transport: at most one transaction is in flight, and
//! its result is read completely before the next command is written.
//!
//! Fatal failures (process exit, broken pipes, timeouts) mark the session
//! dead. Every later call fails with [`Error::ProcessTerminated`] instead of
//! hanging.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::framing::Transaction;
use crate::interpreter::locate_interpreter;
use crate::process::{InterpreterProcess, SHUTDOWN_GRACE};
use crate::transport::PipeTransport;

/// Default limit for the startup handshake.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default limit for a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Command used to confirm the interpreter is responsive.
const HANDSHAKE_COMMAND: &str = "info patchlevel";

/// Options for starting an interpreter session.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
	/// Interpreter executable. Discovered when `None`.
	pub interpreter: Option<PathBuf>,
	/// Extra command-line arguments for the interpreter.
	pub args: Vec<OsString>,
	/// Extra environment variables for the interpreter.
	pub env: Vec<(OsString, OsString)>,
	pub startup_timeout: Duration,
	/// Per-command limit. `None` waits indefinitely.
	pub command_timeout: Option<Duration>,
	/// How long `stop` waits for a voluntary exit before killing.
	pub shutdown_timeout: Duration,
}

impl Default for ConnectionOptions {
	fn default() -> Self {
		Self {
			interpreter: None,
			args: Vec::new(),
			env: Vec::new(),
			startup_timeout: DEFAULT_STARTUP_TIMEOUT,
			command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
			shutdown_timeout: SHUTDOWN_GRACE,
		}
	}
}

impl ConnectionOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn interpreter(mut self, path: impl Into<PathBuf>) -> Self {
		self.interpreter = Some(path.into());
		self
	}

	pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
		self.args.push(arg.into());
		self
	}

	pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
		self.env.push((key.into(), value.into()));
		self
	}

	pub fn startup_timeout(mut self, timeout: Duration) -> Self {
		self.startup_timeout = timeout;
		self
	}

	pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.command_timeout = timeout;
		self
	}

	pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
		self.shutdown_timeout = timeout;
		self
	}
}

/// A live interpreter session.
#[derive(Debug)]
pub struct Connection {
	transport: Mutex<Option<PipeTransport>>,
	process: Mutex<Option<InterpreterProcess>>,
	alive: AtomicBool,
	command_timeout: Option<Duration>,
	shutdown_timeout: Duration,
	last_stderr: parking_lot::Mutex<String>,
	version: parking_lot::Mutex<Option<String>>,
}

impl Connection {
	/// Locates, spawns and handshakes with the interpreter.
	///
	/// # Errors
	///
	/// Returns `Error::ProcessStart` if the interpreter cannot be found,
	/// spawned, or does not answer the handshake in time.
	pub async fn start(options: &ConnectionOptions) -> Result<Self> {
		let exe = locate_interpreter(options.interpreter.as_deref())?;
		info!(target = "tclbridge", exe = %exe.display(), "starting interpreter");

		let (process, pipes) = InterpreterProcess::launch(&exe, &options.args, &options.env).await?;
		let mut connection = Self::assemble(PipeTransport::from_pipes(pipes), Some(process), options.command_timeout);
		connection.shutdown_timeout = options.shutdown_timeout;

		match connection.handshake(options.startup_timeout).await {
			Ok(version) => {
				info!(target = "tclbridge", version = %version, "interpreter ready");
				Ok(connection)
			}
			Err(e) => {
				let _ = connection.stop().await;
				Err(Error::ProcessStart(format!("interpreter handshake failed: {e}")))
			}
		}
	}

	/// Wraps an already connected transport with no process to supervise.
	pub fn from_transport(transport: PipeTransport, command_timeout: Option<Duration>) -> Self {
		Self::assemble(transport, None, command_timeout)
	}

	fn assemble(transport: PipeTransport, process: Option<InterpreterProcess>, command_timeout: Option<Duration>) -> Self {
		Self {
			transport: Mutex::new(Some(transport)),
			process: Mutex::new(process),
			alive: AtomicBool::new(true),
			command_timeout,
			shutdown_timeout: SHUTDOWN_GRACE,
			last_stderr: parking_lot::Mutex::new(String::new()),
			version: parking_lot::Mutex::new(None),
		}
	}

	/// Configures stream encodings and waits for `info patchlevel`.
	///
	/// Returns the interpreter's patch level.
	pub async fn handshake(&self, timeout: Duration) -> Result<String> {
		{
			let mut guard = self.transport.lock().await;
			let transport = guard.as_mut().ok_or_else(stopped)?;
			transport.send_preamble().await?;
		}

		let version = self.evaluate_with_timeout(HANDSHAKE_COMMAND, Some(timeout)).await?;
		*self.version.lock() = Some(version.clone());
		Ok(version)
	}

	/// Interpreter patch level, once the handshake has completed.
	pub fn version(&self) -> Option<String> {
		self.version.lock().clone()
	}

	/// Returns whether the session can still accept commands.
	pub fn is_alive(&self) -> bool {
		if !self.alive.load(Ordering::SeqCst) {
			return false;
		}
		match self.process.try_lock() {
			Ok(mut guard) => guard.as_mut().is_none_or(|p| p.is_running()),
			Err(_) => true,
		}
	}

	/// Stderr text of the most recent successful transaction.
	pub fn last_stderr(&self) -> String {
		self.last_stderr.lock().clone()
	}

	/// Evaluates one command with the session's default timeout.
	pub async fn evaluate(&self, command: &str) -> Result<String> {
		self.evaluate_with_timeout(command, self.command_timeout).await
	}

	/// Evaluates one command with an explicit timeout.
	pub async fn evaluate_with_timeout(&self, command: &str, timeout: Option<Duration>) -> Result<String> {
		self.transact(command, timeout).await?.into_result()
	}

	/// Runs one command and returns the full transaction record.
	pub async fn transact(&self, command: &str, timeout: Option<Duration>) -> Result<Transaction> {
		let mut guard = self.transport.lock().await;
		if !self.alive.load(Ordering::SeqCst) {
			return Err(stopped());
		}
		let transport = guard.as_mut().ok_or_else(stopped)?;

		let result = match timeout {
			Some(limit) => match tokio::time::timeout(limit, transport.transact(command)).await {
				Ok(result) => result,
				Err(_) => Err(Error::Timeout {
					command: command.to_string(),
					timeout_ms: limit.as_millis() as u64,
				}),
			},
			None => transport.transact(command).await,
		};

		match result {
			Ok(tx) => {
				*self.last_stderr.lock() = tx.stderr.clone();
				if !tx.is_ok() {
					debug!(target = "tclbridge", command, message = %tx.output, "interpreter error");
				}
				Ok(tx)
			}
			Err(e) => {
				if e.is_fatal() {
					warn!(target = "tclbridge", command, error = %e, "interpreter session lost");
					self.alive.store(false, Ordering::SeqCst);
					guard.take();
					drop(guard);
					self.kill_process().await;
				}
				Err(e)
			}
		}
	}

	/// Evaluates commands in order, stopping at the first failure.
	///
	/// # Errors
	///
	/// Returns `Error::BatchAborted` carrying the failing index, the results
	/// collected so far and the underlying error.
	pub async fn evaluate_batch<S: AsRef<str>>(&self, commands: &[S]) -> Result<Vec<String>> {
		let mut completed = Vec::with_capacity(commands.len());
		for (index, command) in commands.iter().enumerate() {
			match self.evaluate(command.as_ref()).await {
				Ok(output) => completed.push(output),
				Err(source) => {
					return Err(Error::BatchAborted {
						index,
						completed,
						source: Box::new(source),
					});
				}
			}
		}
		Ok(completed)
	}

	/// Ends the session. Safe to call more than once.
	///
	/// Asks the interpreter to exit when no command is in flight, then waits
	/// for the process and kills it if it lingers.
	pub async fn stop(&self) -> Result<()> {
		let was_alive = self.alive.swap(false, Ordering::SeqCst);

		// A command in flight keeps the transport; killing the process below
		// unblocks it with ProcessTerminated.
		let transport = match self.transport.try_lock() {
			Ok(mut guard) => guard.take(),
			Err(_) => None,
		};
		let graceful = transport.is_some();

		if let Some(mut transport) = transport {
			if was_alive {
				match tokio::time::timeout(Duration::from_secs(1), transport.send_exit()).await {
					Ok(Ok(())) => {}
					Ok(Err(e)) => debug!(target = "tclbridge", error = %e, "exit request failed"),
					Err(_) => debug!(target = "tclbridge", "exit request timed out"),
				}
			}
			drop(transport);
		}

		let process = self.process.lock().await.take();
		if let Some(process) = process {
			if graceful {
				process.shutdown(self.shutdown_timeout).await?;
			} else {
				process.kill().await?;
			}
			info!(target = "tclbridge", "interpreter stopped");
		}
		Ok(())
	}

	async fn kill_process(&self) {
		if let Some(process) = self.process.lock().await.take() {
			if let Err(e) = process.kill().await {
				warn!(target = "tclbridge", error = %e, "failed to kill interpreter");
			}
		}
	}
}

fn stopped() -> Error {
	Error::ProcessTerminated("interpreter session is not running".to_string())
}
