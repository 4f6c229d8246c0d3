//! Tcl list parsing and word quoting.
//!
//! [`split_list`] follows the interpreter's own list grammar: elements are
//! separated by whitespace and may be brace-quoted (taken verbatim),
//! double-quoted, or bare (both with backslash substitution).
//! [`quote_word`] is the inverse and produces a word that the interpreter
//! reads back as exactly one element with the original content.

use thiserror::Error;

/// Errors raised while splitting malformed list text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
	#[error("unmatched open brace in list")]
	UnmatchedBrace,

	#[error("unmatched open quote in list")]
	UnmatchedQuote,

	#[error("list element in {quote} followed by {found:?} instead of space at byte {position}")]
	TrailingCharacters {
		quote: &'static str,
		found: char,
		position: usize,
	},
}

/// A possibly nested list value to be rendered as Tcl text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
	Word(String),
	List(Vec<ListItem>),
}

impl ListItem {
	/// Renders this item as a single Tcl word.
	pub fn to_tcl(&self) -> String {
		match self {
			ListItem::Word(word) => quote_word(word),
			ListItem::List(items) => quote_word(&render_items(items)),
		}
	}
}

impl From<&str> for ListItem {
	fn from(word: &str) -> Self {
		ListItem::Word(word.to_string())
	}
}

impl From<String> for ListItem {
	fn from(word: String) -> Self {
		ListItem::Word(word)
	}
}

impl<T: Into<ListItem>> From<Vec<T>> for ListItem {
	fn from(items: Vec<T>) -> Self {
		ListItem::List(items.into_iter().map(Into::into).collect())
	}
}

fn render_items(items: &[ListItem]) -> String {
	items.iter().map(ListItem::to_tcl).collect::<Vec<_>>().join(" ")
}

/// Renders a nested list as Tcl list text.
pub fn render_nested(items: &[ListItem]) -> String {
	render_items(items)
}

fn is_list_space(c: char) -> bool {
	matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{0b}' | '\u{0c}')
}

/// Splits Tcl list text into its elements.
pub fn split_list(text: &str) -> Result<Vec<String>, ListError> {
	let chars: Vec<(usize, char)> = text.char_indices().collect();
	let mut elements = Vec::new();
	let mut i = 0;

	while i < chars.len() {
		while i < chars.len() && is_list_space(chars[i].1) {
			i += 1;
		}
		if i >= chars.len() {
			break;
		}

		let (element, next) = match chars[i].1 {
			'{' => read_braced(&chars, i + 1)?,
			'"' => read_quoted(&chars, i + 1)?,
			_ => read_bare(&chars, i),
		};

		if let Some(&(position, found)) = chars.get(next) {
			if !is_list_space(found) {
				let quote = if chars[i].1 == '{' { "braces" } else { "quotes" };
				return Err(ListError::TrailingCharacters { quote, found, position });
			}
		}

		elements.push(element);
		i = next;
	}

	Ok(elements)
}

fn read_braced(chars: &[(usize, char)], mut i: usize) -> Result<(String, usize), ListError> {
	let mut depth = 1;
	let mut out = String::new();

	while i < chars.len() {
		let c = chars[i].1;
		match c {
			'\\' => {
				out.push(c);
				if let Some(&(_, escaped)) = chars.get(i + 1) {
					out.push(escaped);
					i += 1;
				}
			}
			'{' => {
				depth += 1;
				out.push(c);
			}
			'}' => {
				depth -= 1;
				if depth == 0 {
					return Ok((out, i + 1));
				}
				out.push(c);
			}
			_ => out.push(c),
		}
		i += 1;
	}

	Err(ListError::UnmatchedBrace)
}

fn read_quoted(chars: &[(usize, char)], mut i: usize) -> Result<(String, usize), ListError> {
	let mut out = String::new();

	while i < chars.len() {
		match chars[i].1 {
			'"' => return Ok((out, i + 1)),
			'\\' => i = substitute_backslash(chars, i, &mut out),
			c => {
				out.push(c);
				i += 1;
			}
		}
	}

	Err(ListError::UnmatchedQuote)
}

fn read_bare(chars: &[(usize, char)], mut i: usize) -> (String, usize) {
	let mut out = String::new();

	while i < chars.len() && !is_list_space(chars[i].1) {
		if chars[i].1 == '\\' {
			i = substitute_backslash(chars, i, &mut out);
		} else {
			out.push(chars[i].1);
			i += 1;
		}
	}

	(out, i)
}

/// Applies one backslash sequence starting at `chars[i] == '\\'`.
///
/// Returns the index just past the sequence.
fn substitute_backslash(chars: &[(usize, char)], i: usize, out: &mut String) -> usize {
	let Some(&(_, c)) = chars.get(i + 1) else {
		out.push('\\');
		return i + 1;
	};

	let simple = match c {
		'a' => Some('\u{07}'),
		'b' => Some('\u{08}'),
		'f' => Some('\u{0c}'),
		'n' => Some('\n'),
		'r' => Some('\r'),
		't' => Some('\t'),
		'v' => Some('\u{0b}'),
		_ => None,
	};
	if let Some(sub) = simple {
		out.push(sub);
		return i + 2;
	}

	match c {
		'\n' => {
			let mut j = i + 2;
			while j < chars.len() && matches!(chars[j].1, ' ' | '\t') {
				j += 1;
			}
			out.push(' ');
			j
		}
		'x' => read_code_point(chars, i + 2, 16, 2, out).unwrap_or_else(|| {
			out.push('x');
			i + 2
		}),
		'u' => read_code_point(chars, i + 2, 16, 4, out).unwrap_or_else(|| {
			out.push('u');
			i + 2
		}),
		'0'..='7' => read_code_point(chars, i + 1, 8, 3, out).unwrap_or(i + 2),
		other => {
			out.push(other);
			i + 2
		}
	}
}

fn read_code_point(chars: &[(usize, char)], start: usize, radix: u32, max: usize, out: &mut String) -> Option<usize> {
	let mut value: u32 = 0;
	let mut j = start;
	while j < chars.len() && j - start < max {
		let Some(digit) = chars[j].1.to_digit(radix) else {
			break;
		};
		value = value * radix + digit;
		j += 1;
	}
	if j == start {
		return None;
	}
	out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
	Some(j)
}

/// Strips every brace and splits on whitespace, discarding all nesting.
pub fn flatten_words(text: &str) -> Vec<String> {
	text.replace(['{', '}'], " ")
		.split_whitespace()
		.map(str::to_string)
		.collect()
}

fn needs_quoting(word: &str) -> bool {
	word.is_empty()
		|| word.starts_with('#')
		|| word
			.chars()
			.any(|c| is_list_space(c) || matches!(c, '{' | '}' | '[' | ']' | '$' | '"' | '\\' | ';'))
}

fn braces_balanced(word: &str) -> bool {
	let mut depth: i32 = 0;
	let mut escaped = false;
	for c in word.chars() {
		if escaped {
			escaped = false;
			continue;
		}
		match c {
			'\\' => escaped = true,
			'{' => depth += 1,
			'}' => {
				depth -= 1;
				if depth < 0 {
					return false;
				}
			}
			_ => {}
		}
	}
	depth == 0 && !escaped
}

/// Quotes `word` so the interpreter reads it back as one element.
pub fn quote_word(word: &str) -> String {
	if !needs_quoting(word) {
		return word.to_string();
	}
	if braces_balanced(word) && !word.contains("\\\n") {
		return format!("{{{word}}}");
	}

	let mut out = String::with_capacity(word.len() * 2);
	for c in word.chars() {
		match c {
			'\n' => out.push_str("\\n"),
			'\t' => out.push_str("\\t"),
			'\r' => out.push_str("\\r"),
			'\u{0b}' => out.push_str("\\v"),
			'\u{0c}' => out.push_str("\\f"),
			' ' | '{' | '}' | '[' | ']' | '$' | '"' | '\\' | ';' | '#' => {
				out.push('\\');
				out.push(c);
			}
			_ => out.push(c),
		}
	}
	out
}

/// Joins words into Tcl list text, quoting each as needed.
pub fn join_list<I, S>(words: I) -> String
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	words
		.into_iter()
		.map(|w| quote_word(w.as_ref()))
		.collect::<Vec<_>>()
		.join(" ")
}
