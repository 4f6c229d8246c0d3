//! Keyed-list decoding through follow-up interpreter queries.
//!
//! A keyed list cannot be parsed from its string form alone: a value that
//! happens to look like a nested list is indistinguishable from a real
//! sub-list. The decoder asks the interpreter instead, enumerating keys with
//! `keylkeys` and reading leaves with `keylget`.

use std::future::Future;
use std::pin::Pin;

use tclbridge_protocol::{DecodedValue, KeyedNode, KeyedResult, coerce};
use tclbridge_runtime::{Error, Evaluate, Result};
use tracing::trace;

/// What a keyed-list path refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	/// A plain value.
	Leaf,
	/// A nested keyed list with these child keys, in interpreter order.
	Keyed(Vec<String>),
}

/// Joins a parent path and a child key with a dot.
pub fn child_path(path: &str, key: &str) -> String {
	if path.is_empty() {
		key.to_string()
	} else {
		format!("{path}.{key}")
	}
}

fn keyl_command(op: &str, var: &str, path: &str) -> String {
	if path.is_empty() {
		format!("{op} {var}")
	} else {
		format!("{op} {var} {path}")
	}
}

/// Classifies the node at `path`.
///
/// `keylkeys` fails on anything that is not a keyed list. That interpreter
/// error is the only leaf signal available, and it is consumed here and
/// nowhere else. Process failures still propagate.
pub async fn classify(eval: &dyn Evaluate, var: &str, path: &str) -> Result<NodeKind> {
	match eval.evaluate(&keyl_command("keylkeys", var, path)).await {
		Ok(keys) => Ok(NodeKind::Keyed(keys.split_whitespace().map(str::to_string).collect())),
		Err(Error::Interpreter { .. }) => {
			trace!(target = "tclbridge", var, path, "leaf node");
			Ok(NodeKind::Leaf)
		}
		Err(e) => Err(e),
	}
}

/// Reads and coerces the value at `path`.
pub async fn keyed_value(eval: &dyn Evaluate, var: &str, path: &str) -> Result<DecodedValue> {
	let raw = eval.evaluate(&keyl_command("keylget", var, path)).await?;
	Ok(coerce(&raw))
}

/// Recursively decodes the keyed list stored in `var`, starting at `path`.
///
/// An empty path is the root.
pub fn decode_keyed<'a>(
	eval: &'a dyn Evaluate,
	var: &'a str,
	path: &'a str,
) -> Pin<Box<dyn Future<Output = Result<KeyedNode>> + Send + 'a>> {
	Box::pin(async move {
		match classify(eval, var, path).await? {
			NodeKind::Leaf => Ok(KeyedNode::Leaf(keyed_value(eval, var, path).await?)),
			NodeKind::Keyed(keys) => {
				let mut node = KeyedResult::new();
				for key in keys {
					let child = child_path(path, &key);
					let value = decode_keyed(eval, var, &child).await?;
					node.insert(key, value);
				}
				Ok(KeyedNode::Keyed(node))
			}
		}
	})
}
