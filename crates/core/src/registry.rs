//! Command registry built from a manifest file.
//!
//! A manifest lists fully qualified interpreter commands, one per line:
//!
//! ```text
//! sth::connect
//! sth::interface_config
//! sth::traffic_control
//! ```
//!
//! Each becomes a wrapper name (`sth_connect`) that runs the command as a
//! named query. The result variable is named after the unqualified command.

use std::collections::BTreeMap;
use std::path::Path;

use tclbridge_protocol::{CommandArgs, KeyedResult};
use tclbridge_runtime::{Error, Result};
use tracing::{debug, warn};

use crate::bridge::Bridge;

/// A manifest command reachable through its wrapper name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCommand {
	/// Wrapper name, `ns_cmd`.
	pub wrapper: String,
	/// Fully qualified command, `ns::cmd`.
	pub command: String,
	/// Base for result variable names, `cmd`.
	pub result_prefix: String,
}

impl RegisteredCommand {
	/// Parses `ns::cmd`. Returns `None` for names without a namespace.
	pub fn parse(qualified: &str) -> Option<Self> {
		let (namespace, name) = qualified.split_once("::")?;
		let namespace = namespace.trim();
		let name = name.trim();
		if namespace.is_empty() || name.is_empty() || namespace.contains(char::is_whitespace) {
			return None;
		}

		Some(Self {
			wrapper: qualified.trim().replace("::", "_"),
			command: qualified.trim().to_string(),
			result_prefix: name.rsplit("::").next().unwrap_or(name).to_string(),
		})
	}

	pub fn namespace(&self) -> &str {
		self.command.split_once("::").map_or("", |(ns, _)| ns)
	}
}

/// Reads manifest lines: trimmed, blanks dropped, deduplicated and sorted.
pub fn read_manifest(text: &str) -> Vec<String> {
	let mut lines: Vec<String> = text
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(str::to_string)
		.collect();
	lines.sort();
	lines.dedup();
	lines
}

/// Lookup table from wrapper name to command.
#[derive(Debug, Clone, Default)]
pub struct Registry {
	commands: BTreeMap<String, RegisteredCommand>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a registry from manifest text.
	///
	/// With a `namespace`, only commands in that namespace are registered.
	pub fn from_manifest(text: &str, namespace: Option<&str>) -> Self {
		let mut registry = Self::new();
		for line in read_manifest(text) {
			if let Some(ns) = namespace {
				if !line.starts_with(&format!("{ns}::")) {
					continue;
				}
			}
			match RegisteredCommand::parse(&line) {
				Some(command) => registry.register(command),
				None => warn!(target = "tclbridge", line = %line, "skipping manifest entry without a namespace"),
			}
		}
		registry
	}

	/// Reads and parses a manifest file.
	pub fn load(path: &Path, namespace: Option<&str>) -> Result<Self> {
		let text = std::fs::read_to_string(path)?;
		let registry = Self::from_manifest(&text, namespace);
		debug!(target = "tclbridge", path = %path.display(), commands = registry.len(), "loaded manifest");
		Ok(registry)
	}

	/// Adds a command. An existing wrapper with the same name is kept.
	pub fn register(&mut self, command: RegisteredCommand) {
		if self.commands.contains_key(&command.wrapper) {
			debug!(target = "tclbridge", wrapper = %command.wrapper, "already registered, skipping");
			return;
		}
		self.commands.insert(command.wrapper.clone(), command);
	}

	pub fn get(&self, wrapper: &str) -> Option<&RegisteredCommand> {
		self.commands.get(wrapper)
	}

	pub fn contains(&self, wrapper: &str) -> bool {
		self.commands.contains_key(wrapper)
	}

	/// Wrapper names in sorted order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.commands.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = &RegisteredCommand> {
		self.commands.values()
	}

	pub fn len(&self) -> usize {
		self.commands.len()
	}

	pub fn is_empty(&self) -> bool {
		self.commands.is_empty()
	}

	/// Runs a registered command as a named query.
	///
	/// # Errors
	///
	/// Returns `Error::UnknownCommand` if `wrapper` is not registered.
	pub async fn invoke(&self, bridge: &Bridge, wrapper: &str, args: &CommandArgs) -> Result<KeyedResult> {
		let entry = self
			.get(wrapper)
			.ok_or_else(|| Error::UnknownCommand(wrapper.to_string()))?;
		bridge.run_named_query(&entry.result_prefix, &entry.command, args).await
	}
}
