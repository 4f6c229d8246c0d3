use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tclbridge::{Bridge, Error};

use crate::error::{CliError, Result};
use crate::output::{OutputFormat, RenderText};

/// Splits a batch script into commands: one per non-blank line, `#`
/// comment lines skipped.
pub fn parse_batch(text: &str) -> Vec<String> {
	text.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.map(str::to_string)
		.collect()
}

/// Reads a batch from a file, or from stdin when `path` is `-`.
pub(super) fn read_batch(path: &Path) -> Result<Vec<String>> {
	let text = if path == Path::new("-") {
		let mut text = String::new();
		std::io::stdin()
			.read_to_string(&mut text)
			.context("reading commands from stdin")?;
		text
	} else {
		std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
	};

	let commands = parse_batch(&text);
	if commands.is_empty() {
		return Err(CliError::InvalidInput(format!("no commands in {}", path.display())));
	}
	Ok(commands)
}

/// Evaluates the batch. In text mode the results that completed before a
/// failure are still printed.
pub(super) async fn run(bridge: &Bridge, commands: &[String], format: OutputFormat) -> Result<Vec<String>> {
	match bridge.evaluate_batch(commands).await {
		Ok(results) => Ok(results),
		Err(Error::BatchAborted {
			index,
			completed,
			source,
		}) => {
			if format == OutputFormat::Text {
				let mut stdout = std::io::stdout().lock();
				let _ = completed.render_text(&mut stdout);
			}
			Err(Error::BatchAborted {
				index,
				completed,
				source,
			}
			.into())
		}
		Err(e) => Err(e.into()),
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::*;

	#[test]
	fn comments_and_blanks_are_skipped() {
		let script = "
# set up
set a 1

  incr a
# done
puts $a
";
		assert_eq!(parse_batch(script), vec!["set a 1", "incr a", "puts $a"]);
	}

	#[test]
	fn crlf_lines() {
		assert_eq!(parse_batch("set a 1\r\nset b 2\r\n"), vec!["set a 1", "set b 2"]);
	}

	#[test]
	fn read_from_file() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("batch.tcl");
		fs::write(&path, "expr {1 + 1}\n# nothing\n").unwrap();
		assert_eq!(read_batch(&path).unwrap(), vec!["expr {1 + 1}"]);

		fs::write(&path, "# only a comment\n").unwrap();
		assert!(matches!(read_batch(&path), Err(CliError::InvalidInput(_))));

		let missing = read_batch(&temp.path().join("missing.tcl")).unwrap_err();
		assert!(matches!(missing, CliError::Anyhow(_)));
		assert!(missing.to_string().contains("missing.tcl"));
	}
}
