use std::io::{IsTerminal, Write};

use colored::Colorize;
use serde::Serialize;
use tclbridge::{AttributeMap, Bridge, KeyedNode};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{CliError, Result};
use crate::output::{self, CommandResult, OutputFormat, RenderText, print_error_stderr};

const COMMAND: &str = "repl";

/// One input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
	Eval(&'a str),
	Keyed { var: &'a str, path: &'a str },
	Attrs(&'a str),
	Probe(&'a str),
	Quit,
	Skip,
	Unknown(&'a str),
}

/// Parses a line: blank lines and `#` comments are skipped, lines starting
/// with `:` are directives, anything else is evaluated.
pub fn parse_directive(line: &str) -> Directive<'_> {
	let line = line.trim();
	if line.is_empty() || line.starts_with('#') {
		return Directive::Skip;
	}
	let Some(rest) = line.strip_prefix(':') else {
		return Directive::Eval(line);
	};

	let (word, arg) = match rest.split_once(char::is_whitespace) {
		Some((word, arg)) => (word, arg.trim()),
		None => (rest, ""),
	};
	match (word, arg) {
		("quit" | "q" | "exit", _) => Directive::Quit,
		("keyed", arg) if !arg.is_empty() => {
			let (var, path) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
			Directive::Keyed {
				var,
				path: path.trim(),
			}
		}
		("attrs", arg) if !arg.is_empty() => Directive::Attrs(arg),
		("probe", arg) if !arg.is_empty() => Directive::Probe(arg),
		_ => Directive::Unknown(line),
	}
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Reply {
	Value(String),
	Keyed(KeyedNode),
	Attributes(AttributeMap),
	Valid(bool),
}

impl RenderText for Reply {
	fn render_text(&self, out: &mut dyn Write) -> std::io::Result<()> {
		match self {
			Reply::Value(value) => value.render_text(out),
			Reply::Keyed(node) => node.render_text(out),
			Reply::Attributes(map) => map.render_text(out),
			Reply::Valid(valid) => valid.render_text(out),
		}
	}
}

async fn execute(bridge: &Bridge, directive: Directive<'_>) -> Result<Reply> {
	Ok(match directive {
		Directive::Eval(command) => Reply::Value(bridge.evaluate(command).await?),
		Directive::Keyed { var, path } => Reply::Keyed(bridge.decode_keyed(var, path).await?),
		Directive::Attrs(command) => Reply::Attributes(bridge.query_attributes(command).await?),
		Directive::Probe(handle) => Reply::Valid(bridge.probe_handle(handle).await?),
		Directive::Unknown(line) => {
			return Err(CliError::InvalidInput(format!(
				"unknown directive \"{line}\"; expected :keyed VAR [PATH], :attrs CMD, :probe HANDLE or :quit"
			)));
		}
		Directive::Quit | Directive::Skip => Reply::Value(String::new()),
	})
}

/// Errors that leave the session usable are reported and the loop goes on.
fn recoverable(err: &CliError) -> bool {
	match err {
		CliError::Bridge(e) => !e.is_fatal(),
		CliError::InvalidInput(_) => true,
		_ => false,
	}
}

/// Reads lines from stdin until EOF or `:quit`.
pub(super) async fn run(bridge: &Bridge, format: OutputFormat) -> Result<()> {
	let interactive = std::io::stdin().is_terminal();
	let mut lines = BufReader::new(tokio::io::stdin()).lines();

	loop {
		if interactive {
			eprint!("{} ", "tcl>".cyan().bold());
		}
		let Some(line) = lines.next_line().await? else {
			break;
		};

		let directive = parse_directive(&line);
		match directive {
			Directive::Quit => break,
			Directive::Skip => continue,
			_ => {}
		}

		match execute(bridge, directive).await {
			Ok(reply) => print_line(&CommandResult::success(COMMAND, reply), format),
			Err(err) if recoverable(&err) => {
				let error = err.to_command_error();
				print_error_stderr(&error);
				if format == OutputFormat::Json {
					print_line(&CommandResult::<()>::failure(COMMAND, error), format);
				}
			}
			Err(err) => return Err(err),
		}
	}

	Ok(())
}

/// Text as usual; JSON on a single line so each reply is one record.
fn print_line<T: Serialize + RenderText>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => output::print_result(result, format),
	}
}
