//! Decoding of flat `-name value` attribute blobs.
//!
//! Object queries answer with a single line such as
//! `-Active true -Name {My Port} -Speed 1000`. Each pair is a dash, a word
//! name, one space, then either a brace group (which may contain spaces but
//! no nested braces) or a single non-space token.

use std::ops::Index;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::value::{DecodedValue, coerce};

static PAIR_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?:^|\s)-(\w+) (\{[^{}]*\}|\S+)").unwrap());

/// A segment of an attribute blob that did not match the pair grammar.
///
/// Reported through `tracing` and skipped; never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeAmbiguity {
	/// Byte offset of the segment in the input.
	pub offset: usize,
	/// The unmatched text, trimmed.
	pub segment: String,
}

/// Attribute name (lowercased) to coerced value, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeMap {
	values: IndexMap<String, DecodedValue>,
}

impl AttributeMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Looks an attribute up by name, ignoring case.
	pub fn get(&self, name: &str) -> Option<&DecodedValue> {
		self.values.get(name.to_ascii_lowercase().as_str())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// Inserts a value under the lowercased name, replacing any previous one.
	pub fn insert(&mut self, name: &str, value: DecodedValue) -> Option<DecodedValue> {
		self.values.insert(name.to_ascii_lowercase(), value)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.values.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &DecodedValue)> {
		self.values.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn to_json(&self) -> serde_json::Value {
		serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
	}
}

impl Index<&str> for AttributeMap {
	type Output = DecodedValue;

	fn index(&self, name: &str) -> &DecodedValue {
		self.get(name)
			.unwrap_or_else(|| panic!("no attribute named {name:?}"))
	}
}

impl<'a> IntoIterator for &'a AttributeMap {
	type Item = (&'a String, &'a DecodedValue);
	type IntoIter = indexmap::map::Iter<'a, String, DecodedValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.values.iter()
	}
}

/// Decodes an attribute blob, logging and skipping segments that do not parse.
pub fn decode_attributes(text: &str) -> AttributeMap {
	let (map, skipped) = decode_attributes_detailed(text);
	for ambiguity in &skipped {
		warn!(
			offset = ambiguity.offset,
			segment = %ambiguity.segment,
			"attribute segment does not match -name value; skipped"
		);
	}
	map
}

/// Decodes an attribute blob and also returns every skipped segment.
pub fn decode_attributes_detailed(text: &str) -> (AttributeMap, Vec<DecodeAmbiguity>) {
	let mut map = AttributeMap::new();
	let mut skipped = Vec::new();
	let mut cursor = 0;

	for caps in PAIR_RE.captures_iter(text) {
		let Some(whole) = caps.get(0) else { continue };
		note_gap(text, cursor, whole.start(), &mut skipped);
		cursor = whole.end();

		let name = &caps[1];
		let raw = &caps[2];
		let unwrapped = raw
			.strip_prefix('{')
			.and_then(|v| v.strip_suffix('}'))
			.unwrap_or(raw);
		map.insert(name, coerce(unwrapped));
	}
	note_gap(text, cursor, text.len(), &mut skipped);

	(map, skipped)
}

fn note_gap(text: &str, start: usize, end: usize, skipped: &mut Vec<DecodeAmbiguity>) {
	let gap = &text[start..end];
	let trimmed = gap.trim();
	if trimmed.is_empty() {
		return;
	}
	let lead = gap.len() - gap.trim_start().len();
	skipped.push(DecodeAmbiguity {
		offset: start + lead,
		segment: trimmed.to_string(),
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_mixed_pairs() {
		let map = decode_attributes("-Active true -Name {My Port} -Speed 1000");
		assert_eq!(map.len(), 3);
		assert_eq!(map["active"], DecodedValue::Boolean(true));
		assert_eq!(map["name"], DecodedValue::Text("My Port".into()));
		assert_eq!(map["speed"], DecodedValue::Integer(1000));
		assert_eq!(map.names().collect::<Vec<_>>(), vec!["active", "name", "speed"]);
	}

	#[test]
	fn lookup_ignores_case() {
		let map = decode_attributes("-PortHandle port1");
		assert_eq!(map.get("PORTHANDLE"), Some(&DecodedValue::Text("port1".into())));
		assert!(map.contains("porthandle"));
	}

	#[test]
	fn braces_stripped_before_coercion() {
		let map = decode_attributes("-Rate {1000} -Empty {} -Ratio {0.5}");
		assert_eq!(map["rate"], DecodedValue::Integer(1000));
		assert_eq!(map["empty"], DecodedValue::Null);
		assert_eq!(map["ratio"], DecodedValue::Float(0.5));
	}

	#[test]
	fn negative_values_and_dashes_inside_values() {
		let map = decode_attributes("-Offset -5 -Date 2020-01-01 -Label {a -b c}");
		assert_eq!(map["offset"], DecodedValue::Integer(-5));
		assert_eq!(map["date"], DecodedValue::Text("2020-01-01".into()));
		assert_eq!(map["label"], DecodedValue::Text("a -b c".into()));
	}

	#[test]
	fn timestamp_values_in_braces() {
		let map = decode_attributes("-LastModified {2021-3-4 05:06:07} -Never {0000-00-00 00:00:00}");
		assert!(map["lastmodified"].as_timestamp().is_some());
		assert_eq!(map["never"], DecodedValue::Null);
	}

	#[test]
	fn noise_is_skipped_and_reported() {
		let (map, skipped) = decode_attributes_detailed("garbage -Active true  stray words -Name x");
		assert_eq!(map.len(), 2);
		assert_eq!(map["name"], DecodedValue::Text("x".into()));
		assert_eq!(
			skipped,
			vec![
				DecodeAmbiguity {
					offset: 0,
					segment: "garbage".into()
				},
				DecodeAmbiguity {
					offset: 22,
					segment: "stray words".into()
				},
			]
		);
	}

	#[test]
	fn empty_input_yields_empty_map() {
		let (map, skipped) = decode_attributes_detailed("   ");
		assert!(map.is_empty());
		assert!(skipped.is_empty());
	}

	#[test]
	fn dash_inside_word_is_not_a_name() {
		let (map, skipped) = decode_attributes_detailed("foo-bar baz");
		assert!(map.is_empty());
		assert_eq!(skipped.len(), 1);
	}

	#[test]
	fn later_duplicate_wins() {
		let map = decode_attributes("-Name a -NAME b");
		assert_eq!(map.len(), 1);
		assert_eq!(map["name"], DecodedValue::Text("b".into()));
	}

	#[test]
	fn serializes_as_object() {
		let map = decode_attributes("-Active true -Speed 10");
		assert_eq!(map.to_json(), serde_json::json!({"active": true, "speed": 10}));
	}
}
