//! Command implementations and dispatch.

mod batch;
mod offline;
mod query;
mod repl;

use tclbridge::{Bridge, BridgeConfig, InstallConfig};
use tracing::warn;

use crate::cli::{Cli, Commands, SessionArgs};
use crate::error::Result;
use crate::output::{CommandResult, OutputFormat, RenderText, print_result};

pub use batch::parse_batch;
pub use repl::{Directive, parse_directive};

/// Runs the parsed command line.
///
/// The configuration is read only by commands that use it, so `coerce` and
/// `attrs` work with a `--config` that cannot be loaded.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let format = cli.format;
	let name = cli.command.name();
	let config = || bridge_config(&cli.session);

	match cli.command {
		Commands::Coerce(args) => emit(name, offline::coerce(&args.tokens), format),
		Commands::Attrs(args) => emit(name, offline::attrs(&args.text), format),
		Commands::Manifest(args) => {
			let config = config()?;
			emit(name, offline::manifest(&args.file, config.namespace.as_deref())?, format)
		}
		Commands::Eval(args) => {
			let bridge = Bridge::launch(&config()?).await?;
			let outcome = bridge.evaluate(&args.command).await.map_err(Into::into);
			emit(name, finish(&bridge, outcome).await?, format)
		}
		Commands::Batch(args) => {
			let config = config()?;
			let commands = batch::read_batch(&args.file)?;
			let bridge = Bridge::launch(&config).await?;
			let outcome = batch::run(&bridge, &commands, format).await;
			emit(name, finish(&bridge, outcome).await?, format)
		}
		Commands::Query(args) => {
			let config = config()?;
			let options = query::parse_options(&args.options)?;
			let bridge = Bridge::launch(&config).await?;
			let outcome = bridge
				.run_named_query(&args.prefix, &args.command, &options)
				.await
				.map_err(Into::into);
			emit(name, finish(&bridge, outcome).await?, format)
		}
		Commands::Call(args) => {
			let config = config()?;
			let registry = query::load_registry(&config)?;
			query::check_wrapper(&registry, &args.wrapper)?;
			let options = query::parse_options(&args.options)?;
			let bridge = Bridge::launch(&config).await?;
			let outcome = registry
				.invoke(&bridge, &args.wrapper, &options)
				.await
				.map_err(Into::into);
			emit(name, finish(&bridge, outcome).await?, format)
		}
		Commands::Repl => {
			let bridge = Bridge::launch(&config()?).await?;
			let outcome = repl::run(&bridge, format).await;
			finish(&bridge, outcome).await
		}
	}
}

/// Builds the bridge configuration: the `--config` file if given, then
/// individual flags on top.
pub fn bridge_config(session: &SessionArgs) -> Result<BridgeConfig> {
	let mut config = match &session.config {
		Some(path) => BridgeConfig::load(path)?,
		None => BridgeConfig::default(),
	};

	if let Some(tclsh) = &session.tclsh {
		config.interpreter = Some(tclsh.clone());
	}
	if let Some(ms) = session.timeout {
		config.command_timeout_ms = ms;
	}
	if let Some(env_var) = &session.install_env {
		config.install = Some(InstallConfig {
			env_var: env_var.clone(),
			marker: session.install_marker.clone(),
		});
	}
	for dir in &session.auto_path {
		if !config.auto_path.contains(dir) {
			config.auto_path.push(dir.clone());
		}
	}
	for package in &session.packages {
		if !config.packages.contains(package) {
			config.packages.push(package.clone());
		}
	}
	if let Some(manifest) = &session.manifest {
		config.manifest = Some(manifest.clone());
	}
	if let Some(namespace) = &session.namespace {
		config.namespace = Some(namespace.clone());
	}

	Ok(config)
}

/// Stops the interpreter and hands back the command outcome.
async fn finish<T>(bridge: &Bridge, outcome: Result<T>) -> Result<T> {
	if let Err(e) = bridge.stop().await {
		warn!(target = "tclb", error = %e, "interpreter did not stop cleanly");
	}
	outcome
}

fn emit<T: serde::Serialize + RenderText>(command: &str, data: T, format: OutputFormat) -> Result<()> {
	print_result(&CommandResult::success(command, data), format);
	Ok(())
}

#[cfg(test)]
mod tests {
	use std::fs;
	use std::path::PathBuf;

	use tempfile::TempDir;

	use super::*;

	#[test]
	fn defaults_without_config_file() {
		let config = bridge_config(&SessionArgs::default()).unwrap();
		assert_eq!(config, BridgeConfig::default());
	}

	#[test]
	fn flags_override_config_file() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("bridge.json");
		fs::write(
			&path,
			r#"{
				"interpreter": "/usr/bin/tclsh8.5",
				"command_timeout_ms": 1000,
				"packages": ["SpirentTestCenter"],
				"auto_path": ["/opt/lib"],
				"namespace": "stc"
			}"#,
		)
		.unwrap();

		let session = SessionArgs {
			config: Some(path),
			tclsh: Some(PathBuf::from("/usr/bin/tclsh8.6")),
			timeout: Some(0),
			install_env: Some("SpirentTestCenter".into()),
			install_marker: Some("TestCenter.exe".into()),
			auto_path: vec![PathBuf::from("/opt/lib"), PathBuf::from("/opt/hltapi")],
			packages: vec!["SpirentTestCenter".into(), "SpirentHltApi".into()],
			manifest: Some(PathBuf::from("API.TXT")),
			namespace: Some("sth".into()),
		};
		let config = bridge_config(&session).unwrap();

		assert_eq!(config.interpreter, Some(PathBuf::from("/usr/bin/tclsh8.6")));
		assert_eq!(config.command_timeout(), None);
		assert_eq!(config.packages, vec!["SpirentTestCenter", "SpirentHltApi"]);
		assert_eq!(config.auto_path, vec![PathBuf::from("/opt/lib"), PathBuf::from("/opt/hltapi")]);
		assert_eq!(config.namespace.as_deref(), Some("sth"));
		assert_eq!(config.manifest, Some(PathBuf::from("API.TXT")));
		let install = config.install.unwrap();
		assert_eq!(install.env_var, "SpirentTestCenter");
		assert_eq!(install.marker.as_deref(), Some("TestCenter.exe"));
	}

	#[test]
	fn missing_config_file_is_an_error() {
		let session = SessionArgs {
			config: Some(PathBuf::from("/definitely/not/here.json")),
			..SessionArgs::default()
		};
		assert!(bridge_config(&session).is_err());
	}
}
