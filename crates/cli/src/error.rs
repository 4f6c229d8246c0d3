use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	/// Bad command-line input that clap could not catch.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// `call` was used without a manifest.
	#[error("no manifest configured; pass --manifest or set \"manifest\" in the config file")]
	NoManifest,

	#[error(transparent)]
	Bridge(#[from] tclbridge::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

fn bridge_error_code(err: &tclbridge::Error) -> ErrorCode {
	use tclbridge::Error;

	match err.root() {
		Error::ProcessStart(_) => ErrorCode::ProcessStartFailed,
		Error::ProcessTerminated(_) => ErrorCode::SessionError,
		Error::Interpreter { .. } => ErrorCode::InterpreterError,
		Error::Timeout { .. } => ErrorCode::Timeout,
		Error::ResultContainsErrorLog { .. } => ErrorCode::CommandFailed,
		Error::NotKeyed { .. } => ErrorCode::NotKeyed,
		Error::PackageUnavailable { .. } => ErrorCode::PackageUnavailable,
		Error::UnknownCommand(_) => ErrorCode::UnknownCommand,
		Error::InvalidArgument(_) => ErrorCode::InvalidInput,
		Error::Protocol(_) => ErrorCode::ProtocolError,
		Error::Io(_) => ErrorCode::IoError,
		Error::Json(_) | Error::BatchAborted { .. } => ErrorCode::InternalError,
	}
}

fn bridge_error_details(err: &tclbridge::Error) -> Option<serde_json::Value> {
	use tclbridge::Error;

	match err {
		Error::Interpreter { command, stderr, .. } => Some(serde_json::json!({
			"command": command,
			"stderr": stderr,
		})),
		Error::Timeout { command, timeout_ms } => Some(serde_json::json!({
			"command": command,
			"timeout_ms": timeout_ms,
		})),
		Error::ResultContainsErrorLog { name, log } => Some(serde_json::json!({ "name": name, "log": log })),
		Error::NotKeyed { name, value } => Some(serde_json::json!({ "name": name, "value": value })),
		Error::BatchAborted { index, completed, source } => {
			let mut details = serde_json::json!({ "index": index, "completed": completed });
			if let Some(inner) = bridge_error_details(source) {
				details["cause"] = inner;
			}
			Some(details)
		}
		Error::PackageUnavailable { package, .. } => Some(serde_json::json!({ "package": package })),
		_ => None,
	}
}

impl CliError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, message, details) = match self {
			CliError::InvalidInput(msg) => (ErrorCode::InvalidInput, msg.clone(), None),
			CliError::NoManifest => (ErrorCode::InvalidInput, self.to_string(), None),
			CliError::Bridge(err) => (bridge_error_code(err), err.to_string(), bridge_error_details(err)),
			CliError::Io(err) => (ErrorCode::IoError, err.to_string(), None),
			CliError::Json(err) => (ErrorCode::InternalError, format!("JSON error: {err}"), None),
			CliError::Anyhow(err) => (ErrorCode::InternalError, format!("{err:#}"), None),
		};

		CommandError { code, message, details }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn batch_abort_reports_root_code_and_progress() {
		let err = CliError::from(tclbridge::Error::BatchAborted {
			index: 2,
			completed: vec!["a".into(), "b".into()],
			source: Box::new(tclbridge::Error::Interpreter {
				command: "bogus".into(),
				message: "invalid command name \"bogus\"".into(),
				stderr: String::new(),
			}),
		});

		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::InterpreterError);
		let details = cmd.details.unwrap();
		assert_eq!(details["index"], 2);
		assert_eq!(details["completed"][1], "b");
		assert_eq!(details["cause"]["command"], "bogus");
	}

	#[test]
	fn usage_errors_are_invalid_input() {
		assert_eq!(CliError::NoManifest.to_command_error().code, ErrorCode::InvalidInput);
		assert_eq!(
			CliError::from(tclbridge::Error::UnknownCommand("sth_nope".into()))
				.to_command_error()
				.code,
			ErrorCode::UnknownCommand
		);
	}

	#[test]
	fn anyhow_keeps_context_chain() {
		let err = CliError::from(anyhow::anyhow!("no such file").context("reading batch.tcl"));
		assert_eq!(err.to_command_error().message, "reading batch.tcl: no such file");
	}
}
