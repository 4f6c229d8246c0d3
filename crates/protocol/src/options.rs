//! Ordered `-name value` argument lists for interpreter commands.
//!
//! Most commands driven through the bridge take dash-prefixed options.
//! [`CommandArgs`] keeps them in insertion order and renders each value as a
//! single Tcl word.

use std::fmt;

use crate::list::{ListItem, quote_word, render_nested};
use crate::value::DecodedValue;

/// A single option value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
	/// Quoted as one word.
	Text(String),
	Integer(i64),
	Float(f64),
	Boolean(bool),
	/// Rendered as a brace-quoted list.
	List(Vec<ListItem>),
	/// Passed through verbatim, for values that are already Tcl syntax
	/// such as `[command substitution]` or a pre-built list.
	Raw(String),
}

impl ArgValue {
	/// Renders the value as a single Tcl word.
	pub fn render(&self) -> String {
		match self {
			ArgValue::Text(text) => quote_word(text),
			ArgValue::Integer(v) => v.to_string(),
			ArgValue::Float(v) => DecodedValue::Float(*v).to_string(),
			ArgValue::Boolean(v) => v.to_string(),
			ArgValue::List(items) => quote_word(&render_nested(items)),
			ArgValue::Raw(raw) => raw.clone(),
		}
	}
}

impl From<&str> for ArgValue {
	fn from(value: &str) -> Self {
		ArgValue::Text(value.to_string())
	}
}

impl From<String> for ArgValue {
	fn from(value: String) -> Self {
		ArgValue::Text(value)
	}
}

impl From<i64> for ArgValue {
	fn from(value: i64) -> Self {
		ArgValue::Integer(value)
	}
}

impl From<i32> for ArgValue {
	fn from(value: i32) -> Self {
		ArgValue::Integer(value.into())
	}
}

impl From<u32> for ArgValue {
	fn from(value: u32) -> Self {
		ArgValue::Integer(value.into())
	}
}

impl From<f64> for ArgValue {
	fn from(value: f64) -> Self {
		ArgValue::Float(value)
	}
}

impl From<bool> for ArgValue {
	fn from(value: bool) -> Self {
		ArgValue::Boolean(value)
	}
}

impl From<Vec<ListItem>> for ArgValue {
	fn from(items: Vec<ListItem>) -> Self {
		ArgValue::List(items)
	}
}

/// Ordered `-name value` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
	pairs: Vec<(String, ArgValue)>,
}

impl CommandArgs {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an option. The leading dash is added on render.
	pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
		self.push(name, value);
		self
	}

	pub fn push(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) {
		self.pairs.push((name.into(), value.into()));
	}

	/// Parses `name=value` assignments as text options.
	///
	/// Returns the first entry without an `=`, or with an empty name, as the
	/// error.
	pub fn from_assignments<I, S>(assignments: I) -> Result<Self, String>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut args = Self::new();
		for entry in assignments {
			let entry = entry.as_ref();
			match entry.split_once('=') {
				Some((name, value)) if !name.trim().is_empty() => {
					args.push(name.trim().trim_start_matches('-'), value);
				}
				_ => return Err(entry.to_string()),
			}
		}
		Ok(args)
	}

	pub fn get(&self, name: &str) -> Option<&ArgValue> {
		self.pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
	}

	/// Drops every option whose name is listed.
	pub fn without(mut self, names: &[&str]) -> Self {
		self.pairs.retain(|(n, _)| !names.contains(&n.as_str()));
		self
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}

	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	/// Renders `-name value -name value`.
	pub fn render(&self) -> String {
		self.pairs
			.iter()
			.map(|(name, value)| format!("-{name} {}", value.render()))
			.collect::<Vec<_>>()
			.join(" ")
	}
}

impl fmt::Display for CommandArgs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.render())
	}
}

impl<K: Into<String>, V: Into<ArgValue>> FromIterator<(K, V)> for CommandArgs {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		}
	}
}
