//! Interpreter discovery and startup prerequisites.
//!
//! Locates the `tclsh` executable to drive and validates installation
//! directories that must exist before the bridge is constructed. Both are
//! startup preconditions: failures surface as [`Error::ProcessStart`] before
//! any process is spawned.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment variable overriding interpreter discovery.
pub const TCLSH_ENV: &str = "TCLBRIDGE_TCLSH";

/// Executable names tried on `PATH`, most generic first.
const TCLSH_NAMES: &[&str] = &["tclsh", "tclsh9.0", "tclsh8.6", "tclsh8.5"];

/// Get the path to the interpreter executable
///
/// This function attempts to locate the interpreter in the following order:
/// 1. The explicitly configured path (a bare name is looked up on `PATH`)
/// 2. `TCLBRIDGE_TCLSH` environment variable
/// 3. `tclsh` and versioned variants on `PATH`
/// 4. Common installation locations
///
/// # Errors
///
/// Returns `Error::ProcessStart` if no candidate exists.
pub fn locate_interpreter(explicit: Option<&Path>) -> Result<PathBuf> {
	locate_with(explicit, |name| std::env::var(name).ok(), |name| which::which(name).ok())
}

fn locate_with<E, W>(explicit: Option<&Path>, env: E, which: W) -> Result<PathBuf>
where
	E: Fn(&str) -> Option<String>,
	W: Fn(&str) -> Option<PathBuf>,
{
	// 1. Explicit configuration wins and never falls back silently
	if let Some(path) = explicit {
		return resolve_candidate("configured", path, &which).ok_or_else(|| {
			Error::ProcessStart(format!("interpreter not found at {}", path.display()))
		});
	}

	// 2. Environment override
	if let Some(value) = env(TCLSH_ENV).filter(|v| !v.trim().is_empty()) {
		let path = PathBuf::from(value.trim());
		if let Some(found) = resolve_candidate(TCLSH_ENV, &path, &which) {
			return Ok(found);
		}
		warn!(
			target = "tclbridge",
			path = %path.display(),
			"{TCLSH_ENV} does not point to an executable; falling back to PATH lookup"
		);
	}

	// 3. PATH lookup
	for name in TCLSH_NAMES {
		if let Some(found) = which(name) {
			debug!(target = "tclbridge", path = %found.display(), "found interpreter on PATH");
			return Ok(found);
		}
	}

	// 4. Common locations
	for location in common_locations() {
		let path = PathBuf::from(location);
		if path.is_file() {
			return Ok(path);
		}
	}

	Err(Error::ProcessStart(format!(
		"Tcl interpreter not found. Install tclsh and add it to PATH, or set {TCLSH_ENV}."
	)))
}

fn resolve_candidate<W>(label: &str, path: &Path, which: &W) -> Option<PathBuf>
where
	W: Fn(&str) -> Option<PathBuf>,
{
	if path.is_file() {
		debug!(target = "tclbridge", source = label, path = %path.display(), "interpreter candidate");
		return Some(path.to_path_buf());
	}

	// A bare executable name such as "tclsh8.6"
	if path.components().count() == 1 {
		if let Some(name) = path.to_str() {
			return which(name);
		}
	}

	None
}

fn common_locations() -> &'static [&'static str] {
	#[cfg(not(windows))]
	{
		&[
			"/usr/bin/tclsh",
			"/usr/local/bin/tclsh",
			"/opt/homebrew/bin/tclsh",
			"/opt/local/bin/tclsh",
		]
	}

	#[cfg(windows)]
	{
		&[
			"C:\\ActiveTcl\\bin\\tclsh.exe",
			"C:\\Tcl\\bin\\tclsh.exe",
			"C:\\Program Files\\Tcl\\bin\\tclsh.exe",
		]
	}
}

/// An installation directory named by an environment variable.
///
/// Vendor Tcl packages are commonly found through a variable pointing at
/// their install root. The directory, and optionally a marker file inside
/// it, must exist before the interpreter is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequirement {
	/// Environment variable holding the directory.
	pub env_var: String,
	/// File that must exist directly inside the directory.
	pub marker: Option<String>,
}

impl InstallRequirement {
	pub fn new(env_var: impl Into<String>) -> Self {
		Self {
			env_var: env_var.into(),
			marker: None,
		}
	}

	pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
		self.marker = Some(marker.into());
		self
	}

	/// Resolves and validates the installation directory from the process
	/// environment.
	pub fn resolve(&self) -> Result<PathBuf> {
		self.resolve_with(|name| std::env::var(name).ok())
	}

	/// Same as [`resolve`](Self::resolve) with an explicit variable lookup.
	pub fn resolve_with<E>(&self, env: E) -> Result<PathBuf>
	where
		E: Fn(&str) -> Option<String>,
	{
		let value = env(&self.env_var)
			.filter(|v| !v.trim().is_empty())
			.ok_or_else(|| {
				Error::ProcessStart(format!(
					"environment variable {} is not set; point it to the installation directory",
					self.env_var
				))
			})?;

		let dir = PathBuf::from(value.trim());
		if !dir.is_dir() {
			return Err(Error::ProcessStart(format!(
				"{} points to {}, which is not a directory",
				self.env_var,
				dir.display()
			)));
		}

		if let Some(marker) = &self.marker {
			if !dir.join(marker).exists() {
				return Err(Error::ProcessStart(format!(
					"{} must point to the directory containing {marker}; not found in {}",
					self.env_var,
					dir.display()
				)));
			}
		}

		Ok(dir)
	}
}
