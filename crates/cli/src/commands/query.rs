use tclbridge::{BridgeConfig, CommandArgs, Error, Registry};

use crate::error::{CliError, Result};

/// Parses `NAME=VALUE` words into command options.
pub(super) fn parse_options(options: &[String]) -> Result<CommandArgs> {
	CommandArgs::from_assignments(options)
		.map_err(|entry| CliError::InvalidInput(format!("expected NAME=VALUE, got \"{entry}\"")))
}

pub(super) fn load_registry(config: &BridgeConfig) -> Result<Registry> {
	let path = config.manifest.as_ref().ok_or(CliError::NoManifest)?;
	Ok(Registry::load(path, config.namespace.as_deref())?)
}

/// Fails before the interpreter starts if `wrapper` is not registered.
pub(super) fn check_wrapper(registry: &Registry, wrapper: &str) -> Result<()> {
	if registry.contains(wrapper) {
		return Ok(());
	}
	Err(Error::UnknownCommand(wrapper.to_string()).into())
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::*;

	#[test]
	fn options_render_as_flags() {
		let args = parse_options(&["device=10.0.0.1".into(), "port_list=1/8 1/9".into()]).unwrap();
		assert_eq!(args.to_string(), "-device 10.0.0.1 -port_list {1/8 1/9}");
	}

	#[test]
	fn bare_word_is_rejected() {
		let err = parse_options(&["device".into()]).unwrap_err();
		assert!(matches!(err, CliError::InvalidInput(ref msg) if msg.contains("\"device\"")));
	}

	#[test]
	fn registry_requires_manifest() {
		assert!(matches!(load_registry(&BridgeConfig::default()), Err(CliError::NoManifest)));

		let temp = TempDir::new().unwrap();
		let path = temp.path().join("API.TXT");
		fs::write(&path, "sth::connect\nstc::get\n").unwrap();
		let config = BridgeConfig {
			manifest: Some(path),
			namespace: Some("sth".into()),
			..BridgeConfig::default()
		};

		let registry = load_registry(&config).unwrap();
		assert!(check_wrapper(&registry, "sth_connect").is_ok());
		let err = check_wrapper(&registry, "stc_get").unwrap_err();
		assert!(matches!(err, CliError::Bridge(Error::UnknownCommand(_))));
	}
}
