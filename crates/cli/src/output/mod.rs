//! Result printing for all CLI commands.
//!
//! Text output prints just the data, one value per line. JSON output wraps it
//! in an envelope:
//!
//! ```json
//! {
//!   "ok": true,
//!   "command": "query",
//!   "data": { "status": 1, "name": "connect0" }
//! }
//! ```
//!
//! On failure:
//!
//! ```json
//! {
//!   "ok": false,
//!   "command": "eval",
//!   "error": {
//!     "code": "INTERPRETER_ERROR",
//!     "message": "Interpreter error while executing \"bogus\": invalid command name \"bogus\"",
//!     "details": { "command": "bogus", "stderr": "" }
//!   }
//! }
//! ```


use std::io::{self, Write};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use tclbridge::{AttributeMap, DecodeAmbiguity, DecodedValue, KeyedNode, KeyedResult, RegisteredCommand};

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Plain values, one per line
	#[default]
	Text,
	/// JSON envelope
	Json,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"text" => Ok(OutputFormat::Text),
			"json" => Ok(OutputFormat::Json),
			_ => Err(format!("unknown format: {s}")),
		}
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

/// Envelope printed for every command in JSON mode.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult<T: Serialize> {
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl<T: Serialize> CommandResult<T> {
	pub fn success(command: impl Into<String>, data: T) -> Self {
		Self {
			ok: true,
			command: command.into(),
			data: Some(data),
			error: None,
		}
	}

	pub fn failure(command: impl Into<String>, error: CommandError) -> Self {
		Self {
			ok: false,
			command: command.into(),
			data: None,
			error: Some(error),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Standardized error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Interpreter missing, failed to spawn or failed the handshake
	ProcessStartFailed,
	/// The interpreter died or the session was stopped
	SessionError,
	/// A command raised a Tcl error
	InterpreterError,
	Timeout,
	/// A named query result carried an error log
	CommandFailed,
	/// A named query result was not a keyed list
	NotKeyed,
	PackageUnavailable,
	UnknownCommand,
	ProtocolError,
	InvalidInput,
	IoError,
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let code = serde_json::to_value(self)
			.ok()
			.and_then(|v| v.as_str().map(str::to_string))
			.unwrap_or_default();
		f.write_str(&code)
	}
}

/// Plain-text rendering of command data.
pub trait RenderText {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl RenderText for () {
	fn render_text(&self, _out: &mut dyn Write) -> io::Result<()> {
		Ok(())
	}
}

impl RenderText for String {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		if self.is_empty() {
			return Ok(());
		}
		writeln!(out, "{self}")
	}
}

impl RenderText for bool {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{self}")
	}
}

impl<T: RenderText> RenderText for Vec<T> {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		for item in self {
			item.render_text(out)?;
		}
		Ok(())
	}
}

impl RenderText for KeyedNode {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		match self {
			KeyedNode::Leaf(value) => writeln!(out, "{value}"),
			KeyedNode::Keyed(keyed) => keyed.render_text(out),
		}
	}
}

impl RenderText for KeyedResult {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		write_keyed(out, self, 0)
	}
}

fn write_keyed(out: &mut dyn Write, keyed: &KeyedResult, depth: usize) -> io::Result<()> {
	let indent = "  ".repeat(depth);
	for (key, node) in keyed.iter() {
		match node {
			KeyedNode::Leaf(value) => writeln!(out, "{indent}{key}: {value}")?,
			KeyedNode::Keyed(nested) => {
				writeln!(out, "{indent}{key}:")?;
				write_keyed(out, nested, depth + 1)?;
			}
		}
	}
	Ok(())
}

impl RenderText for AttributeMap {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		for (name, value) in self.iter() {
			writeln!(out, "{name} = {value}")?;
		}
		Ok(())
	}
}

/// One token and what it coerced to.
#[derive(Debug, Clone, Serialize)]
pub struct CoercedToken {
	pub token: String,
	pub kind: &'static str,
	pub value: DecodedValue,
}

impl CoercedToken {
	pub fn new(token: &str, value: DecodedValue) -> Self {
		Self {
			token: token.to_string(),
			kind: value.kind(),
			value,
		}
	}
}

impl RenderText for CoercedToken {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{}\t{}\t{}", self.token, self.kind, self.value)
	}
}

/// Attributes decoded from a blob, with the segments that were skipped.
#[derive(Debug, Clone, Serialize)]
pub struct AttributesData {
	pub attributes: AttributeMap,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub skipped: Vec<SkippedSegment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSegment {
	pub offset: usize,
	pub segment: String,
}

impl From<DecodeAmbiguity> for SkippedSegment {
	fn from(ambiguity: DecodeAmbiguity) -> Self {
		Self {
			offset: ambiguity.offset,
			segment: ambiguity.segment,
		}
	}
}

impl RenderText for AttributesData {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		self.attributes.render_text(out)?;
		for skipped in &self.skipped {
			writeln!(out, "# skipped at {}: {}", skipped.offset, skipped.segment)?;
		}
		Ok(())
	}
}

/// A manifest entry as printed by `tclb manifest`.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
	pub wrapper: String,
	pub command: String,
	pub result_prefix: String,
}

impl From<&RegisteredCommand> for ManifestEntry {
	fn from(command: &RegisteredCommand) -> Self {
		Self {
			wrapper: command.wrapper.clone(),
			command: command.command.clone(),
			result_prefix: command.result_prefix.clone(),
		}
	}
}

impl RenderText for ManifestEntry {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{} -> {}", self.wrapper, self.command)
	}
}

/// Writes a result in the given format.
pub fn write_result<T: Serialize + RenderText>(
	out: &mut dyn Write,
	result: &CommandResult<T>,
	format: OutputFormat,
) -> io::Result<()> {
	match format {
		OutputFormat::Json => {
			let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
			writeln!(out, "{json}")
		}
		OutputFormat::Text => {
			if let Some(data) = &result.data {
				data.render_text(out)?;
			} else if let Some(error) = &result.error {
				writeln!(out, "Error [{}]: {}", error.code, error.message)?;
			}
			Ok(())
		}
	}
}

/// Print a command result to stdout.
pub fn print_result<T: Serialize + RenderText>(result: &CommandResult<T>, format: OutputFormat) {
	let mut stdout = io::stdout().lock();
	let _ = write_result(&mut stdout, result, format);
	let _ = stdout.flush();
}

/// Print an error to stderr in human-readable format
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("{} [{}]: {}", "Error".red().bold(), error.code, error.message);
}
