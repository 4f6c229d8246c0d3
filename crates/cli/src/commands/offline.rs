//! Commands that exercise the codecs without starting an interpreter.

use std::path::Path;

use tclbridge::{Registry, coerce as coerce_token, decode_attributes_detailed};

use crate::error::Result;
use crate::output::{AttributesData, CoercedToken, ManifestEntry};

pub(super) fn coerce(tokens: &[String]) -> Vec<CoercedToken> {
	tokens
		.iter()
		.map(|token| CoercedToken::new(token, coerce_token(token)))
		.collect()
}

pub(super) fn attrs(text: &str) -> AttributesData {
	let (attributes, skipped) = decode_attributes_detailed(text);
	AttributesData {
		attributes,
		skipped: skipped.into_iter().map(Into::into).collect(),
	}
}

pub(super) fn manifest(path: &Path, namespace: Option<&str>) -> Result<Vec<ManifestEntry>> {
	let registry = Registry::load(path, namespace)?;
	Ok(registry.iter().map(ManifestEntry::from).collect())
}
