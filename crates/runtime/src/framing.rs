//! Sentinel framing over the interpreter's boundary-less pipes.
//!
//! The interpreter offers no message boundaries, so every command is wrapped
//! in a small script that brackets its output with markers built from a
//! fresh random token:
//!
//! ```text
//! stdout: <<tclb:TOKEN:begin>> RESULT <<tclb:TOKEN:end:STATUS>>
//! stderr: <<tclb:TOKEN:begin>> STRAY  <<tclb:TOKEN:end>>
//! ```
//!
//! The command is handed to `catch` as one quoted word, so RESULT is either
//! the command's value or its error message and STATUS is the `catch` return
//! code. Quoting keeps a command with unbalanced braces from swallowing the
//! rest of the script. A token is a UUID v4 (122 random bits), so ordinary
//! output never contains a marker.

use tclbridge_protocol::{normalize_output, quote_word};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Interpreter variable receiving the `catch` result.
pub const RESULT_VAR: &str = "::tclbridge_result";

/// Interpreter variable receiving the `catch` return code.
pub const STATUS_VAR: &str = "::tclbridge_status";

const MARKER_OPEN: &str = "<<tclb:";
const MARKER_CLOSE: &str = ">>";

/// Written once after spawn so both directions use UTF-8 and LF line endings.
pub const SESSION_PREAMBLE: &str = "fconfigure stdin -encoding utf-8\n\
	fconfigure stdout -encoding utf-8 -translation lf\n\
	fconfigure stderr -encoding utf-8 -translation lf\n";

/// Command that asks the interpreter to exit.
pub const EXIT_COMMAND: &str = "exit\n";

/// Per-transaction marker token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
	token: String,
}

impl Default for Sentinel {
	fn default() -> Self {
		Self::new()
	}
}

impl Sentinel {
	/// Creates a sentinel with a fresh random token.
	pub fn new() -> Self {
		Self {
			token: Uuid::new_v4().simple().to_string(),
		}
	}

	/// Creates a sentinel from a known token. Intended for tests.
	pub fn from_token(token: impl Into<String>) -> Self {
		Self { token: token.into() }
	}

	pub fn token(&self) -> &str {
		&self.token
	}

	pub fn begin(&self) -> String {
		format!("{MARKER_OPEN}{}:begin{MARKER_CLOSE}", self.token)
	}

	/// Stdout trailer up to, not including, the status code.
	pub fn end_prefix(&self) -> String {
		format!("{MARKER_OPEN}{}:end:", self.token)
	}

	pub fn stderr_end(&self) -> String {
		format!("{MARKER_OPEN}{}:end{MARKER_CLOSE}", self.token)
	}

	/// Wraps `command` in the framing script.
	pub fn script(&self, command: &str) -> String {
		let begin = self.begin();
		let end_prefix = self.end_prefix();
		let stderr_end = self.stderr_end();
		let body = quote_word(command);
		format!(
			"puts -nonewline stdout {{{begin}}}\n\
			 puts -nonewline stderr {{{begin}}}\n\
			 set {STATUS_VAR} [catch {body} {RESULT_VAR}]\n\
			 puts -nonewline stdout ${RESULT_VAR}\n\
			 puts -nonewline stdout \"{end_prefix}${STATUS_VAR}{MARKER_CLOSE}\"\n\
			 puts -nonewline stderr {{{stderr_end}}}\n\
			 flush stdout\n\
			 flush stderr\n"
		)
	}
}

/// A complete stdout frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdoutFrame {
	/// Raw text between the markers.
	pub payload: String,
	/// `catch` return code.
	pub status: i32,
	/// Output that arrived before the begin marker.
	pub stray: String,
	/// Bytes of the buffer consumed by this frame.
	pub consumed: usize,
}

/// A complete stderr frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StderrFrame {
	pub payload: String,
	pub stray: String,
	pub consumed: usize,
}

/// Search progress for one frame across reads.
///
/// Bytes already searched for the current marker are not searched again;
/// only the last `marker.len() - 1` of them are revisited in case a marker
/// straddles two reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameScan {
	body_start: Option<usize>,
	scanned: usize,
}

impl FrameScan {
	fn find(&mut self, buf: &[u8], needle: &[u8], floor: usize) -> Option<usize> {
		let from = self.scanned.saturating_sub(needle.len().saturating_sub(1)).max(floor);
		match find_subslice(&buf[from..], needle) {
			Some(rel) => Some(from + rel),
			None => {
				self.scanned = buf.len();
				None
			}
		}
	}

	/// Locates the begin marker, remembering where the body starts.
	fn body_start(&mut self, buf: &[u8], begin: &[u8]) -> Option<usize> {
		if self.body_start.is_none() {
			let begin_at = self.find(buf, begin, 0)?;
			self.body_start = Some(begin_at + begin.len());
			self.scanned = begin_at + begin.len();
		}
		self.body_start
	}
}

/// Looks for a complete stdout frame in `buf`.
///
/// Returns `Ok(None)` while more input is needed. `scan` must be reused for
/// the same buffer until a frame is returned.
pub fn parse_stdout_frame(buf: &[u8], sentinel: &Sentinel, scan: &mut FrameScan) -> Result<Option<StdoutFrame>> {
	let begin = sentinel.begin();
	let end_prefix = sentinel.end_prefix();

	let Some(body_start) = scan.body_start(buf, begin.as_bytes()) else {
		return Ok(None);
	};
	let Some(end_at) = scan.find(buf, end_prefix.as_bytes(), body_start) else {
		return Ok(None);
	};
	let status_start = end_at + end_prefix.len();

	let Some(close_rel) = find_subslice(&buf[status_start..], MARKER_CLOSE.as_bytes()) else {
		// Find the end prefix again next time; the status is only a few bytes.
		scan.scanned = end_at;
		return Ok(None);
	};
	let status_end = status_start + close_rel;

	let status_text = String::from_utf8_lossy(&buf[status_start..status_end]);
	let status = status_text.trim().parse::<i32>().map_err(|_| {
		Error::Protocol(format!("malformed status {status_text:?} in trailer for {}", sentinel.token()))
	})?;

	Ok(Some(StdoutFrame {
		payload: String::from_utf8_lossy(&buf[body_start..end_at]).into_owned(),
		status,
		stray: String::from_utf8_lossy(&buf[..body_start - begin.len()]).into_owned(),
		consumed: status_end + MARKER_CLOSE.len(),
	}))
}

/// Looks for a complete stderr frame in `buf`.
pub fn parse_stderr_frame(buf: &[u8], sentinel: &Sentinel, scan: &mut FrameScan) -> Option<StderrFrame> {
	let begin = sentinel.begin();
	let end = sentinel.stderr_end();

	let body_start = scan.body_start(buf, begin.as_bytes())?;
	let end_at = scan.find(buf, end.as_bytes(), body_start)?;

	Some(StderrFrame {
		payload: String::from_utf8_lossy(&buf[body_start..end_at]).into_owned(),
		stray: String::from_utf8_lossy(&buf[..body_start - begin.len()]).into_owned(),
		consumed: end_at + end.len(),
	})
}

/// How a transaction ended, when the process survived it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Ok,
	/// The interpreter reported an error; `code` is the `catch` return code.
	InterpreterError { code: i32 },
}

impl Outcome {
	/// `TCL_OK` and `TCL_RETURN` are successes; everything else is an error.
	pub fn from_status(status: i32) -> Self {
		match status {
			0 | 2 => Outcome::Ok,
			code => Outcome::InterpreterError { code },
		}
	}
}

/// One command and its resolved result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	pub command: String,
	pub token: String,
	/// Normalized result text, or the error message on failure.
	pub output: String,
	/// Text the command wrote to stderr.
	pub stderr: String,
	pub outcome: Outcome,
}

impl Transaction {
	pub fn from_frames(command: &str, sentinel: &Sentinel, stdout: &StdoutFrame, stderr: &StderrFrame) -> Self {
		Self {
			command: command.to_string(),
			token: sentinel.token().to_string(),
			output: normalize_output(&stdout.payload),
			stderr: stderr.payload.clone(),
			outcome: Outcome::from_status(stdout.status),
		}
	}

	pub fn is_ok(&self) -> bool {
		self.outcome == Outcome::Ok
	}

	/// Converts the transaction into the caller-facing result.
	///
	/// `break` and `continue` leave no message behind, so one is supplied in
	/// the interpreter's own wording.
	pub fn into_result(self) -> Result<String> {
		match self.outcome {
			Outcome::Ok => Ok(self.output),
			Outcome::InterpreterError { code } => {
				let message = match (self.output.trim(), code) {
					("", 3) => "invoked \"break\" outside of a loop".to_string(),
					("", 4) => "invoked \"continue\" outside of a loop".to_string(),
					(message, _) => message.to_string(),
				};
				Err(Error::Interpreter {
					command: self.command,
					message,
					stderr: self.stderr,
				})
			}
		}
	}
}

/// Position of the first occurrence of `needle` in `hay`.
pub(crate) fn find_subslice(hay: &[u8], needle: &[u8]) -> Option<usize> {
	if needle.is_empty() {
		return Some(0);
	}
	hay.windows(needle.len()).position(|window| window == needle)
}
