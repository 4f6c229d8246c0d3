//! The command dispatcher.
//!
//! [`Bridge`] wraps one interpreter [`Connection`] with the operations
//! callers actually use: plain evaluation, batches, named queries whose
//! keyed-list results are decoded into a [`KeyedResult`], attribute queries,
//! handle probes and package loading.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use tclbridge_protocol::{
	AttributeMap, CommandArgs, DecodedValue, KeyedNode, KeyedResult, compact_lines, decode_attributes, quote_word,
	split_list,
};
use tclbridge_runtime::{Connection, Error, Evaluate, Result};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::decoder;
use crate::names::NameAllocator;

/// Key holding the allocated variable name in every named query result.
pub const NAME_KEY: &str = "name";

/// Key whose presence marks a named query as failed.
pub const ERROR_LOG_KEY: &str = "log";

/// A prepared interpreter session.
#[derive(Debug)]
pub struct Bridge {
	connection: Connection,
	names: Mutex<NameAllocator>,
	package_installer: Option<String>,
	probe_command: Option<String>,
}

impl Bridge {
	/// Validates prerequisites, starts the interpreter and loads packages.
	///
	/// Order: install directory check, interpreter start, `auto_path`
	/// entries, then each configured package.
	pub async fn launch(config: &BridgeConfig) -> Result<Self> {
		let install_dir = match config.install_requirement() {
			Some(requirement) => Some(requirement.resolve()?),
			None => None,
		};

		let connection = Connection::start(&config.connection_options()).await?;
		let bridge = Self::with_config(connection, config);

		let prepared = async {
			for dir in config.auto_path.iter().chain(install_dir.iter()) {
				bridge.append_auto_path(dir).await?;
			}
			for package in &config.packages {
				bridge.require_package(package).await?;
			}
			Ok::<_, Error>(())
		};
		if let Err(e) = prepared.await {
			let _ = bridge.stop().await;
			return Err(e);
		}

		Ok(bridge)
	}

	/// Wraps an existing connection with default settings.
	pub fn new(connection: Connection) -> Self {
		Self::with_config(connection, &BridgeConfig::default())
	}

	/// Wraps an existing connection, taking installer and probe settings
	/// from `config`.
	pub fn with_config(connection: Connection, config: &BridgeConfig) -> Self {
		Self {
			connection,
			names: Mutex::new(NameAllocator::new()),
			package_installer: config.package_installer.clone(),
			probe_command: config.probe_command.clone(),
		}
	}

	pub fn connection(&self) -> &Connection {
		&self.connection
	}

	pub fn is_alive(&self) -> bool {
		self.connection.is_alive()
	}

	pub async fn stop(&self) -> Result<()> {
		self.connection.stop().await
	}

	/// Evaluates one command.
	pub async fn evaluate(&self, command: &str) -> Result<String> {
		self.connection.evaluate(command).await
	}

	/// Evaluates commands in order, stopping at the first failure.
	pub async fn evaluate_batch<S: AsRef<str>>(&self, commands: &[S]) -> Result<Vec<String>> {
		self.connection.evaluate_batch(commands).await
	}

	/// Evaluates a command and splits its result as a Tcl list.
	pub async fn evaluate_list(&self, command: &str) -> Result<Vec<String>> {
		let output = self.evaluate(command).await?;
		split_list(&output).map_err(|e| Error::Protocol(format!("result of \"{command}\" is not a list: {e}")))
	}

	/// Evaluates a command and drops blank lines from multi-line output.
	pub async fn evaluate_compact(&self, command: &str) -> Result<String> {
		Ok(compact_lines(&self.evaluate(command).await?))
	}

	/// Allocates a fresh variable name derived from `base`.
	pub fn allocate_name(&self, base: &str) -> String {
		self.names.lock().allocate(base)
	}

	/// Runs `command args`, stores the result in a fresh variable and decodes
	/// it as a keyed list.
	///
	/// The variable name is added to the result under [`NAME_KEY`].
	///
	/// # Errors
	///
	/// Returns `Error::NotKeyed` if the stored value is not a keyed list and
	/// `Error::ResultContainsErrorLog` if it carries an [`ERROR_LOG_KEY`]
	/// entry.
	pub async fn run_named_query(&self, prefix: &str, command: &str, args: &CommandArgs) -> Result<KeyedResult> {
		let name = self.allocate_name(prefix);
		let script = if args.is_empty() {
			format!("set {name} [ {command} ]")
		} else {
			format!("set {name} [ {command} {args} ]")
		};
		debug!(target = "tclbridge", name = %name, command, "named query");
		let raw = self.evaluate(&script).await?;

		let mut result = match self.decode_keyed(&name, "").await? {
			KeyedNode::Keyed(result) => result,
			KeyedNode::Leaf(_) => return Err(Error::NotKeyed { name, value: raw }),
		};

		if let Some(log) = result.get(ERROR_LOG_KEY) {
			let log = match log {
				KeyedNode::Leaf(value) => value.to_string(),
				KeyedNode::Keyed(nested) => nested.to_json().to_string(),
			};
			return Err(Error::ResultContainsErrorLog { name, log });
		}

		if result.contains_key(NAME_KEY) {
			warn!(target = "tclbridge", name = %name, "result already has a \"{NAME_KEY}\" key; replacing it");
		}
		result.insert(NAME_KEY, DecodedValue::Text(name));
		Ok(result)
	}

	/// Decodes the keyed list in `var` at the dotted `path` (empty for root).
	pub async fn decode_keyed(&self, var: &str, path: &str) -> Result<KeyedNode> {
		decoder::decode_keyed(self, var, path).await
	}

	/// Reads one value from a keyed list without enumerating it.
	pub async fn keyed_value(&self, var: &str, path: &str) -> Result<DecodedValue> {
		decoder::keyed_value(self, var, path).await
	}

	/// Evaluates a command returning `-name value` pairs and decodes them.
	pub async fn query_attributes(&self, command: &str) -> Result<AttributeMap> {
		Ok(decode_attributes(&self.evaluate(command).await?))
	}

	/// Checks whether `handle` still refers to a live object.
	///
	/// Runs the configured probe command against the handle. The probe is
	/// expected to be a read-only query, so repeated probes return the same
	/// answer. An interpreter error means the handle is invalid; process
	/// failures propagate.
	pub async fn probe_handle(&self, handle: &str) -> Result<bool> {
		let probe = self
			.probe_command
			.as_deref()
			.ok_or_else(|| Error::InvalidArgument("no probe command configured".to_string()))?;
		if handle.trim().is_empty() {
			return Ok(false);
		}

		match self.evaluate(&format!("{probe} {}", quote_word(handle))).await {
			Ok(_) => Ok(true),
			Err(Error::Interpreter { .. }) => {
				debug!(target = "tclbridge", handle, "handle probe failed");
				Ok(false)
			}
			Err(e) => Err(e),
		}
	}

	/// Loads a package, installing it first if it is missing and an
	/// installer is configured. Returns the loaded version.
	pub async fn require_package(&self, package: &str) -> Result<String> {
		let require = format!("package require {}", quote_word(package));
		info!(target = "tclbridge", package, "package require");

		let first = match self.evaluate(&require).await {
			Ok(version) => return Ok(version),
			Err(Error::Interpreter { message, .. }) => message,
			Err(e) => return Err(e),
		};

		let Some(installer) = &self.package_installer else {
			return Err(Error::PackageUnavailable {
				package: package.to_string(),
				message: first,
			});
		};

		info!(target = "tclbridge", package, installer = %installer, "installing missing package");
		let installed = self.evaluate(&format!("{installer} {}", quote_word(package))).await;
		if let Err(e) = installed {
			if !e.is_interpreter() {
				return Err(e);
			}
			return Err(Error::PackageUnavailable {
				package: package.to_string(),
				message: format!("{first}; install failed: {}", e.interpreter_message().unwrap_or_default()),
			});
		}

		match self.evaluate(&require).await {
			Ok(version) => Ok(version),
			Err(Error::Interpreter { message, .. }) => Err(Error::PackageUnavailable {
				package: package.to_string(),
				message,
			}),
			Err(e) => Err(e),
		}
	}

	/// Appends a directory to the interpreter's package search path.
	pub async fn append_auto_path(&self, dir: &Path) -> Result<()> {
		let dir = dir.to_string_lossy().replace('\\', "/");
		info!(target = "tclbridge", dir = %dir, "lappend auto_path");
		self.evaluate(&format!("lappend auto_path {}", quote_word(&dir))).await?;
		Ok(())
	}
}

#[async_trait]
impl Evaluate for Bridge {
	async fn evaluate(&self, command: &str) -> Result<String> {
		Bridge::evaluate(self, command).await
	}
}

#[cfg(test)]
mod tests;
