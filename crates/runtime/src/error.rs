//! Error types for the interpreter bridge.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the interpreter.
#[derive(Debug, Error)]
pub enum Error {
	/// Interpreter could not be located, spawned, or initialized, or a
	/// prerequisite directory is missing.
	#[error("Failed to start interpreter: {0}")]
	ProcessStart(String),

	/// Interpreter exited or closed its pipes. The session is dead until
	/// restarted.
	#[error("Interpreter process terminated: {0}")]
	ProcessTerminated(String),

	/// Interpreter ran the command and reported an error for it.
	#[error("Interpreter error while executing \"{command}\": {message}")]
	Interpreter {
		command: String,
		message: String,
		/// Anything the command wrote to stderr before failing.
		stderr: String,
	},

	/// No sentinel within the configured limit. The session was torn down.
	#[error("Timeout after {timeout_ms}ms waiting for \"{command}\"")]
	Timeout { command: String, timeout_ms: u64 },

	/// Named query result carried an error log entry.
	#[error("Command stored in {name} reported an error: {log}")]
	ResultContainsErrorLog { name: String, log: String },

	/// Named query variable held a plain value instead of a keyed list.
	#[error("Variable {name} is not a keyed list (value: {value})")]
	NotKeyed { name: String, value: String },

	/// Batch stopped at `index`; `completed` holds the earlier results.
	#[error("Batch aborted at command {index}: {source}")]
	BatchAborted {
		index: usize,
		completed: Vec<String>,
		#[source]
		source: Box<Error>,
	},

	/// Package could neither be loaded nor installed.
	#[error("Package {package} unavailable: {message}")]
	PackageUnavailable { package: String, message: String },

	/// Command name not present in the registry.
	#[error("Unknown command: {0}")]
	UnknownCommand(String),

	/// Invalid argument provided by the caller.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Output did not follow the framing protocol.
	#[error("Protocol error: {0}")]
	Protocol(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if the interpreter rejected the command itself.
	pub fn is_interpreter(&self) -> bool {
		matches!(self.root(), Error::Interpreter { .. })
	}

	/// Returns true for errors after which the session is unusable.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self.root(),
			Error::ProcessTerminated(_) | Error::Timeout { .. } | Error::Io(_) | Error::Protocol(_)
		)
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self.root(), Error::Timeout { .. })
	}

	/// Unwraps batch errors down to the failure that stopped the batch.
	pub fn root(&self) -> &Error {
		match self {
			Error::BatchAborted { source, .. } => source.root(),
			other => other,
		}
	}

	/// Returns the interpreter's message if this is an interpreter error.
	pub fn interpreter_message(&self) -> Option<&str> {
		match self.root() {
			Error::Interpreter { message, .. } => Some(message),
			_ => None,
		}
	}
}
