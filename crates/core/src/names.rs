//! Unique interpreter variable names.

use std::collections::HashMap;

/// Hands out `base0`, `base1`, ... per base name.
///
/// A trailing number on the requested name is dropped before lookup, so
/// `connect12` and `connect` draw from the same counter. Names are never
/// checked against the interpreter; uniqueness holds because a counter only
/// moves forward for the lifetime of the allocator.
#[derive(Debug, Clone, Default)]
pub struct NameAllocator {
	counters: HashMap<String, u64>,
}

impl NameAllocator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Allocates the next name for `base`, starting at index 0.
	pub fn allocate(&mut self, base: &str) -> String {
		self.allocate_from(base, 0)
	}

	/// Allocates the next name for `base`.
	///
	/// `start` only matters on the first request for a base; later requests
	/// continue from the stored counter.
	pub fn allocate_from(&mut self, base: &str, start: u64) -> String {
		let base = base_name(base);
		let counter = self.counters.entry(base.clone()).or_insert(start);
		let name = format!("{base}{counter}");
		*counter += 1;
		name
	}

	/// Next index that would be handed out for `base`, if it was seen.
	pub fn peek(&self, base: &str) -> Option<u64> {
		self.counters.get(&base_name(base)).copied()
	}
}

/// Strips a numeric suffix and replaces characters that would need quoting.
fn base_name(name: &str) -> String {
	let sanitized: String = name
		.trim()
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
		.collect();

	let stripped = sanitized.trim_end_matches(|c: char| c.is_ascii_digit());
	if stripped.is_empty() {
		sanitized
	} else {
		stripped.to_string()
	}
}
