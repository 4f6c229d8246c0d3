use std::collections::HashMap;
use std::time::Duration;

use tclbridge_runtime::testing::{CommandLog, Reply, fake_connection};
use tclbridge_runtime::{ConnectionOptions, locate_interpreter};
use tempfile::TempDir;

use super::*;

const NOT_KEYED: &str = "keyed list entry must be a two element list";

/// Keyed-list contents by dotted path: `Ok` holds child keys, `Err` a leaf.
type Tree = HashMap<&'static str, std::result::Result<&'static str, &'static str>>;

fn connect_tree() -> Tree {
	HashMap::from([
		("", Ok("status port_handle")),
		("status", Err("1")),
		("port_handle", Ok("10.0.0.1")),
		("port_handle.10.0.0.1", Ok("1/8 1/9")),
		("port_handle.10.0.0.1.1/8", Err("port1")),
		("port_handle.10.0.0.1.1/9", Err("port2")),
	])
}

/// Answers named queries from `tree` and everything else from `other`.
fn keyed_bridge<F>(tree: Tree, mut other: F) -> (Bridge, CommandLog)
where
	F: FnMut(&str) -> Reply + Send + 'static,
{
	let (connection, log) = fake_connection(move |cmd| {
		if cmd.starts_with("set ") {
			return Reply::ok("{status 1} {port_handle ...}");
		}
		let mut parts = cmd.splitn(3, ' ');
		let op = parts.next().unwrap_or_default();
		let _var = parts.next();
		let path = parts.next().unwrap_or_default();
		match (op, tree.get(path)) {
			("keylkeys", Some(Ok(keys))) => Reply::ok(*keys),
			("keylkeys", _) => Reply::error(NOT_KEYED),
			("keylget", Some(Err(value))) => Reply::ok(*value),
			("keylget", Some(Ok(_))) => Reply::ok("{...}"),
			("keylget", None) => Reply::error(format!("key \"{path}\" not found in keyed list")),
			_ => other(cmd),
		}
	});
	(Bridge::new(connection), log)
}

fn plain_bridge<F>(config: &BridgeConfig, respond: F) -> (Bridge, CommandLog)
where
	F: FnMut(&str) -> Reply + Send + 'static,
{
	let (connection, log) = fake_connection(respond);
	(Bridge::with_config(connection, config), log)
}

#[tokio::test]
async fn test_named_query_decodes_result() {
	let (bridge, log) = keyed_bridge(connect_tree(), |_| Reply::error("unexpected"));

	let args = CommandArgs::new()
		.arg("device", "10.0.0.1")
		.arg("port_list", "1/8 1/9")
		.arg("offline", 1);
	let result = bridge.run_named_query("connect", "sth::connect", &args).await.unwrap();

	assert_eq!(
		log.commands()[0],
		"set connect0 [ sth::connect -device 10.0.0.1 -port_list {1/8 1/9} -offline 1 ]"
	);
	assert_eq!(result.value("status"), Some(&DecodedValue::Integer(1)));
	assert_eq!(
		result.value("port_handle.10.0.0.1.1/9"),
		Some(&DecodedValue::Text("port2".into()))
	);
	assert_eq!(result.value(NAME_KEY), Some(&DecodedValue::Text("connect0".into())));
	assert_eq!(
		result.keys().collect::<Vec<_>>(),
		vec!["status", "port_handle", "name"]
	);
}

#[tokio::test]
async fn test_named_queries_get_fresh_names() {
	let (bridge, log) = keyed_bridge(connect_tree(), |_| Reply::error("unexpected"));

	let first = bridge.run_named_query("connect", "sth::connect", &CommandArgs::new()).await.unwrap();
	let second = bridge.run_named_query("connect5", "sth::connect", &CommandArgs::new()).await.unwrap();

	assert_eq!(first.value(NAME_KEY), Some(&DecodedValue::Text("connect0".into())));
	assert_eq!(second.value(NAME_KEY), Some(&DecodedValue::Text("connect1".into())));
	assert!(log.commands().contains(&"set connect1 [ sth::connect ]".to_string()));
}

#[tokio::test]
async fn test_named_query_with_error_log() {
	let tree = HashMap::from([
		("", Ok("status log")),
		("status", Err("0")),
		("log", Err("port 1/8 is reserved by another user")),
	]);
	let (bridge, _log) = keyed_bridge(tree, |_| Reply::error("unexpected"));

	let err = bridge
		.run_named_query("connect", "sth::connect", &CommandArgs::new())
		.await
		.unwrap_err();
	match err {
		Error::ResultContainsErrorLog { name, log } => {
			assert_eq!(name, "connect0");
			assert_eq!(log, "port 1/8 is reserved by another user");
		}
		other => panic!("expected ResultContainsErrorLog, got {other:?}"),
	}
}

#[tokio::test]
async fn test_named_query_on_plain_value() {
	let tree = HashMap::from([("", Err("42"))]);
	let (bridge, _log) = keyed_bridge(tree, |_| Reply::error("unexpected"));

	let err = bridge
		.run_named_query("count", "llength", &CommandArgs::new())
		.await
		.unwrap_err();
	assert!(matches!(err, Error::NotKeyed { ref name, .. } if name == "count0"));
}

#[tokio::test]
async fn test_named_query_reserved_name_key_is_replaced() {
	let tree = HashMap::from([("", Ok("name")), ("name", Err("device1"))]);
	let (bridge, _log) = keyed_bridge(tree, |_| Reply::error("unexpected"));

	let result = bridge
		.run_named_query("device", "sth::device_info", &CommandArgs::new())
		.await
		.unwrap();
	assert_eq!(result.len(), 1);
	assert_eq!(result.value(NAME_KEY), Some(&DecodedValue::Text("device0".into())));
}

#[tokio::test]
async fn test_named_query_command_failure_propagates() {
	let (bridge, log) = plain_bridge(&BridgeConfig::new(), |_| Reply::error("invalid command name \"sth::nope\""));

	let err = bridge
		.run_named_query("nope", "sth::nope", &CommandArgs::new())
		.await
		.unwrap_err();
	assert!(err.is_interpreter());
	assert_eq!(log.commands().len(), 1);
}

#[tokio::test]
async fn test_bridges_allocate_independently() {
	let (first, _) = plain_bridge(&BridgeConfig::new(), |_| Reply::ok(""));
	let (second, _) = plain_bridge(&BridgeConfig::new(), |_| Reply::ok(""));

	assert_eq!(first.allocate_name("stream"), "stream0");
	assert_eq!(first.allocate_name("stream"), "stream1");
	assert_eq!(second.allocate_name("stream"), "stream0");
}

#[tokio::test]
async fn test_query_attributes() {
	let (bridge, log) = plain_bridge(&BridgeConfig::new(), |_| {
		Reply::ok("-Active true -Name {My Port} -Speed 1000")
	});

	let attrs = bridge.query_attributes("stc::get port1").await.unwrap();
	assert_eq!(attrs.get("active"), Some(&DecodedValue::Boolean(true)));
	assert_eq!(attrs.get("Name"), Some(&DecodedValue::Text("My Port".into())));
	assert_eq!(attrs.get("speed"), Some(&DecodedValue::Integer(1000)));
	assert_eq!(log.commands(), vec!["stc::get port1"]);
}

#[tokio::test]
async fn test_evaluate_list_and_compact() {
	let (bridge, _log) = plain_bridge(&BridgeConfig::new(), |cmd| match cmd {
		"stc::get system1 -children" => Reply::ok("project1 {port 2} automationoptions"),
		"stc::help" => Reply::ok("Usage:\n\n  stc::help topic\n\n"),
		_ => Reply::ok("{unbalanced"),
	});

	assert_eq!(
		bridge.evaluate_list("stc::get system1 -children").await.unwrap(),
		vec!["project1", "port 2", "automationoptions"]
	);
	assert_eq!(bridge.evaluate_compact("stc::help").await.unwrap(), "Usage:\n  stc::help topic");
	assert!(matches!(bridge.evaluate_list("other").await, Err(Error::Protocol(_))));
}

#[tokio::test]
async fn test_probe_handle() {
	let config = BridgeConfig {
		probe_command: Some("stc::get".into()),
		..BridgeConfig::default()
	};
	let (bridge, log) = plain_bridge(&config, |cmd| match cmd {
		"stc::get port1" => Reply::ok("-Name port1"),
		_ => Reply::error("invalid handle"),
	});

	assert!(bridge.probe_handle("port1").await.unwrap());
	assert!(bridge.probe_handle("port1").await.unwrap());
	assert!(!bridge.probe_handle("port99").await.unwrap());
	assert!(!bridge.probe_handle("port99").await.unwrap());
	assert!(!bridge.probe_handle("  ").await.unwrap());

	assert_eq!(
		log.commands(),
		vec!["stc::get port1", "stc::get port1", "stc::get port99", "stc::get port99"]
	);
	assert!(bridge.is_alive());
}

#[tokio::test]
async fn test_probe_handle_requires_command() {
	let (bridge, _log) = plain_bridge(&BridgeConfig::new(), |_| Reply::ok(""));
	assert!(matches!(
		bridge.probe_handle("port1").await,
		Err(Error::InvalidArgument(_))
	));
}

#[tokio::test]
async fn test_probe_handle_process_failure_propagates() {
	let config = BridgeConfig {
		probe_command: Some("stc::get".into()),
		..BridgeConfig::default()
	};
	let (bridge, _log) = plain_bridge(&config, |_| Reply::Exit);
	assert!(matches!(
		bridge.probe_handle("port1").await,
		Err(Error::ProcessTerminated(_))
	));
}

#[tokio::test]
async fn test_require_package_present() {
	let (bridge, _log) = plain_bridge(&BridgeConfig::new(), |cmd| match cmd {
		"package require Tclx" => Reply::ok("8.4"),
		_ => Reply::error("unexpected"),
	});
	assert_eq!(bridge.require_package("Tclx").await.unwrap(), "8.4");
}

#[tokio::test]
async fn test_require_package_missing_without_installer() {
	let (bridge, log) = plain_bridge(&BridgeConfig::new(), |_| {
		Reply::error("can't find package ip")
	});

	let err = bridge.require_package("ip").await.unwrap_err();
	assert!(matches!(
		err,
		Error::PackageUnavailable { ref package, ref message } if package == "ip" && message == "can't find package ip"
	));
	assert_eq!(log.commands().len(), 1);
}

#[tokio::test]
async fn test_require_package_installs_and_retries_once() {
	let config = BridgeConfig {
		package_installer: Some("teacup install".into()),
		..BridgeConfig::default()
	};
	let mut installed = false;
	let (bridge, log) = plain_bridge(&config, move |cmd| match cmd {
		"package require ip" if installed => Reply::ok("1.4"),
		"package require ip" => Reply::error("can't find package ip"),
		"teacup install ip" => {
			installed = true;
			Reply::ok("Installed")
		}
		_ => Reply::error("unexpected"),
	});

	assert_eq!(bridge.require_package("ip").await.unwrap(), "1.4");
	assert_eq!(
		log.commands(),
		vec!["package require ip", "teacup install ip", "package require ip"]
	);
}

#[tokio::test]
async fn test_require_package_install_failure() {
	let config = BridgeConfig {
		package_installer: Some("teacup install".into()),
		..BridgeConfig::default()
	};
	let (bridge, log) = plain_bridge(&config, |cmd| match cmd {
		"teacup install Tclx" => Reply::error("network unreachable"),
		_ => Reply::error("can't find package Tclx"),
	});

	let err = bridge.require_package("Tclx").await.unwrap_err();
	match err {
		Error::PackageUnavailable { package, message } => {
			assert_eq!(package, "Tclx");
			assert!(message.contains("network unreachable"));
		}
		other => panic!("expected PackageUnavailable, got {other:?}"),
	}
	assert_eq!(log.commands().len(), 2);
}

#[tokio::test]
async fn test_append_auto_path_quotes_directory() {
	let (bridge, log) = plain_bridge(&BridgeConfig::new(), |_| Reply::ok(""));
	bridge
		.append_auto_path(Path::new("/opt/Spirent TestCenter/lib"))
		.await
		.unwrap();
	assert_eq!(log.commands(), vec!["lappend auto_path {/opt/Spirent TestCenter/lib}"]);
}

#[tokio::test]
async fn test_launch_fails_before_start_without_install_dir() {
	let config = BridgeConfig {
		interpreter: Some("/definitely/not/tclsh".into()),
		install: Some(crate::config::InstallConfig {
			env_var: "TCLBRIDGE_TEST_UNSET_INSTALL_DIR".into(),
			marker: None,
		}),
		..BridgeConfig::default()
	};

	let err = Bridge::launch(&config).await.unwrap_err();
	assert!(matches!(err, Error::ProcessStart(ref msg) if msg.contains("TCLBRIDGE_TEST_UNSET_INSTALL_DIR")));
}

#[tokio::test]
async fn test_launch_with_missing_interpreter() {
	let config = BridgeConfig {
		interpreter: Some("/definitely/not/tclsh".into()),
		..BridgeConfig::default()
	};
	assert!(matches!(Bridge::launch(&config).await, Err(Error::ProcessStart(_))));
}

/// Defines `keylkeys`/`keylget` over dicts so keyed decoding runs without TclX.
const KEYL_SHIM: &str = r#"
proc keylkeys {var {path {}}} {
    upvar #0 $var value
    set node $value
    if {$path ne {}} { set node [dict get $value {*}[split $path .]] }
    if {[llength $node] == 0 || [llength $node] % 2} { error "keyed list entry must be a two element list" }
    return [dict keys $node]
}
proc keylget {var {path {}}} {
    upvar #0 $var value
    if {$path eq {}} { return $value }
    return [dict get $value {*}[split $path .]]
}
proc make_result {args} {
    return [list status 1 count [llength $args] port_handle {port1 {speed 1000}}]
}
"#;

#[tokio::test]
async fn test_real_interpreter_named_query() {
	if locate_interpreter(None).is_err() {
		eprintln!("tclsh not found, skipping");
		return;
	}

	let connection = Connection::start(&ConnectionOptions::default()).await.unwrap();
	let bridge = Bridge::new(connection);
	bridge.evaluate(KEYL_SHIM).await.unwrap();

	let result = bridge
		.run_named_query("result", "make_result", &CommandArgs::new().arg("mode", "fast"))
		.await
		.unwrap();
	assert_eq!(
		result.to_json(),
		serde_json::json!({
			"status": 1,
			"count": 2,
			"port_handle": {"port1": {"speed": 1000}},
			"name": "result0"
		})
	);
	assert_eq!(bridge.evaluate("set result0").await.unwrap(), "status 1 count 2 port_handle {port1 {speed 1000}}");

	bridge.stop().await.unwrap();
}

#[tokio::test]
async fn test_real_interpreter_launch_sets_auto_path() {
	if locate_interpreter(None).is_err() {
		eprintln!("tclsh not found, skipping");
		return;
	}

	let temp = TempDir::new().unwrap();
	let config = BridgeConfig {
		auto_path: vec![temp.path().to_path_buf()],
		packages: vec!["Tcl".into()],
		command_timeout_ms: 30_000,
		..BridgeConfig::default()
	};

	let bridge = Bridge::launch(&config).await.unwrap();
	let last = bridge.evaluate("lindex $auto_path end").await.unwrap();
	assert_eq!(last, temp.path().to_string_lossy().replace('\\', "/"));
	assert!(bridge.connection().version().is_some());

	tokio::time::timeout(Duration::from_secs(10), bridge.stop())
		.await
		.unwrap()
		.unwrap();
}
