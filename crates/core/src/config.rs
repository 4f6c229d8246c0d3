//! Bridge configuration.
//!
//! Every field has a default, so a JSON file only names what it changes:
//!
//! ```json
//! {
//!   "install": { "env_var": "SpirentTestCenter", "marker": "TestCenter.exe" },
//!   "packages": ["SpirentTestCenter", "SpirentHltApi"],
//!   "package_installer": "teacup install",
//!   "manifest": "API.TXT",
//!   "namespace": "sth"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tclbridge_runtime::{ConnectionOptions, DEFAULT_COMMAND_TIMEOUT, DEFAULT_STARTUP_TIMEOUT, InstallRequirement, Result};

/// Installation directory that must exist before launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConfig {
	/// Environment variable holding the directory.
	pub env_var: String,
	/// File expected directly inside the directory.
	#[serde(default)]
	pub marker: Option<String>,
}

/// Everything needed to launch and prepare a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
	/// Interpreter executable; discovered when unset.
	pub interpreter: Option<PathBuf>,
	/// Extra interpreter arguments.
	pub args: Vec<String>,
	/// Per-command limit in milliseconds. `0` waits indefinitely.
	pub command_timeout_ms: u64,
	pub startup_timeout_ms: u64,
	pub shutdown_timeout_ms: u64,
	pub install: Option<InstallConfig>,
	/// Directories appended to `auto_path` before packages load. The
	/// resolved install directory is appended after these.
	pub auto_path: Vec<PathBuf>,
	/// Packages loaded with `package require` at launch, in order.
	pub packages: Vec<String>,
	/// Command prefix run as `INSTALLER NAME` when a package is missing.
	pub package_installer: Option<String>,
	/// Command prefix run as `PROBE HANDLE` to test a handle.
	pub probe_command: Option<String>,
	/// File listing commands for the registry, one per line.
	pub manifest: Option<PathBuf>,
	/// Only manifest commands in this namespace are registered.
	pub namespace: Option<String>,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			interpreter: None,
			args: Vec::new(),
			command_timeout_ms: DEFAULT_COMMAND_TIMEOUT.as_millis() as u64,
			startup_timeout_ms: DEFAULT_STARTUP_TIMEOUT.as_millis() as u64,
			shutdown_timeout_ms: 5_000,
			install: None,
			auto_path: Vec::new(),
			packages: Vec::new(),
			package_installer: None,
			probe_command: None,
			manifest: None,
			namespace: None,
		}
	}
}

impl BridgeConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads a JSON configuration file.
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path)?;
		Self::from_json(&text)
	}

	pub fn from_json(text: &str) -> Result<Self> {
		Ok(serde_json::from_str(text)?)
	}

	pub fn command_timeout(&self) -> Option<Duration> {
		(self.command_timeout_ms > 0).then(|| Duration::from_millis(self.command_timeout_ms))
	}

	pub fn connection_options(&self) -> ConnectionOptions {
		let mut options = ConnectionOptions::new()
			.command_timeout(self.command_timeout())
			.startup_timeout(Duration::from_millis(self.startup_timeout_ms))
			.shutdown_timeout(Duration::from_millis(self.shutdown_timeout_ms));
		if let Some(path) = &self.interpreter {
			options = options.interpreter(path);
		}
		for arg in &self.args {
			options = options.arg(arg);
		}
		options
	}

	pub fn install_requirement(&self) -> Option<InstallRequirement> {
		self.install.as_ref().map(|install| {
			let requirement = InstallRequirement::new(&install.env_var);
			match &install.marker {
				Some(marker) => requirement.with_marker(marker),
				None => requirement,
			}
		})
	}
}
