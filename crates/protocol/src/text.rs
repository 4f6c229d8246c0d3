//! Line normalization for raw interpreter output.

/// Converts CRLF and lone CR line endings to LF and trims trailing newlines.
pub fn normalize_output(raw: &str) -> String {
	let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
	unified.trim_end_matches('\n').to_string()
}

/// Drops blank lines from multi-line output.
///
/// A single line comes back untouched, so a value that happens to be only
/// whitespace survives.
pub fn compact_lines(text: &str) -> String {
	let lines: Vec<&str> = text.lines().collect();
	if lines.len() <= 1 {
		return lines.first().copied().unwrap_or_default().to_string();
	}
	lines
		.into_iter()
		.filter(|line| !line.trim().is_empty())
		.collect::<Vec<_>>()
		.join("\n")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_line_endings() {
		assert_eq!(normalize_output("a\r\nb\rc\n\n"), "a\nb\nc");
		assert_eq!(normalize_output(""), "");
		assert_eq!(normalize_output("  x  "), "  x  ");
	}

	#[test]
	fn compacts_multi_line_output() {
		assert_eq!(compact_lines("first\n\n  \nsecond\n"), "first\nsecond");
		assert_eq!(compact_lines("  only  "), "  only  ");
		assert_eq!(compact_lines(""), "");
	}
}
