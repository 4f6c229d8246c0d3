//! Result tree for keyed-list decoding.

use std::ops::Index;

use indexmap::IndexMap;
use serde::Serialize;

use crate::value::DecodedValue;

/// One child of a keyed list: either a coerced leaf or a nested keyed list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeyedNode {
	Leaf(DecodedValue),
	Keyed(KeyedResult),
}

impl KeyedNode {
	pub fn as_value(&self) -> Option<&DecodedValue> {
		match self {
			KeyedNode::Leaf(value) => Some(value),
			KeyedNode::Keyed(_) => None,
		}
	}

	pub fn as_keyed(&self) -> Option<&KeyedResult> {
		match self {
			KeyedNode::Keyed(keyed) => Some(keyed),
			KeyedNode::Leaf(_) => None,
		}
	}

	pub fn into_keyed(self) -> Result<KeyedResult, DecodedValue> {
		match self {
			KeyedNode::Keyed(keyed) => Ok(keyed),
			KeyedNode::Leaf(value) => Err(value),
		}
	}

	pub fn is_leaf(&self) -> bool {
		matches!(self, KeyedNode::Leaf(_))
	}
}

impl From<DecodedValue> for KeyedNode {
	fn from(value: DecodedValue) -> Self {
		KeyedNode::Leaf(value)
	}
}

impl From<KeyedResult> for KeyedNode {
	fn from(keyed: KeyedResult) -> Self {
		KeyedNode::Keyed(keyed)
	}
}

/// An ordered mapping decoded from a keyed list.
///
/// Keys keep the order the interpreter enumerated them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KeyedResult {
	entries: IndexMap<String, KeyedNode>,
}

impl KeyedResult {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<&KeyedNode> {
		self.entries.get(key)
	}

	/// Follows a dotted path (`port_handle.10.0.0.1`) through nested lists.
	///
	/// Keys themselves may contain dots, so at each level the longest key
	/// that prefixes the remaining path wins.
	pub fn get_path(&self, path: &str) -> Option<&KeyedNode> {
		if let Some(node) = self.entries.get(path) {
			return Some(node);
		}

		let mut best: Option<(&str, &KeyedNode)> = None;
		for (key, node) in &self.entries {
			let Some(rest) = path.strip_prefix(key.as_str()) else {
				continue;
			};
			let Some(rest) = rest.strip_prefix('.') else {
				continue;
			};
			if best.is_none_or(|(prev, _)| rest.len() < prev.len()) {
				best = Some((rest, node));
			}
		}

		let (rest, node) = best?;
		node.as_keyed()?.get_path(rest)
	}

	/// Shortcut for a leaf value at a dotted path.
	pub fn value(&self, path: &str) -> Option<&DecodedValue> {
		self.get_path(path)?.as_value()
	}

	pub fn insert(&mut self, key: impl Into<String>, node: impl Into<KeyedNode>) -> Option<KeyedNode> {
		self.entries.insert(key.into(), node.into())
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyedNode)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn to_json(&self) -> serde_json::Value {
		serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
	}
}

impl Index<&str> for KeyedResult {
	type Output = KeyedNode;

	fn index(&self, key: &str) -> &KeyedNode {
		self.get(key).unwrap_or_else(|| panic!("no key {key:?} in keyed result"))
	}
}

impl<K: Into<String>, N: Into<KeyedNode>> FromIterator<(K, N)> for KeyedResult {
	fn from_iter<I: IntoIterator<Item = (K, N)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().map(|(k, n)| (k.into(), n.into())).collect(),
		}
	}
}
