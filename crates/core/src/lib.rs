//! Drive a long-lived Tcl interpreter from Rust.
//!
//! ```ignore
//! use tclbridge::{Bridge, BridgeConfig, CommandArgs};
//!
//! let bridge = Bridge::launch(&BridgeConfig::default()).await?;
//! let sum = bridge.evaluate("expr {1 + 2}").await?;
//!
//! let args = CommandArgs::new().arg("device", "10.0.0.1").arg("port_list", "1/8 1/9");
//! let result = bridge.run_named_query("connect", "sth::connect", &args).await?;
//! let handle = result.value("port_handle.10.0.0.1.1/8");
//! bridge.stop().await?;
//! ```
//!
//! The interpreter is an external `tclsh` process; see
//! [`tclbridge_runtime`] for the process and framing layer and
//! [`tclbridge_protocol`] for the result codecs.

pub mod bridge;
pub mod config;
pub mod decoder;
pub mod names;
pub mod registry;

pub use bridge::{Bridge, ERROR_LOG_KEY, NAME_KEY};
pub use config::{BridgeConfig, InstallConfig};
pub use decoder::NodeKind;
pub use names::NameAllocator;
pub use registry::{RegisteredCommand, Registry, read_manifest};
pub use tclbridge_protocol::{
	ArgValue, AttributeMap, CommandArgs, DecodeAmbiguity, DecodedValue, KeyedNode, KeyedResult, ListItem, coerce,
	decode_attributes, decode_attributes_detailed, join_list, quote_word, split_list,
};
pub use tclbridge_runtime::{
	Connection, ConnectionOptions, Error, Evaluate, InstallRequirement, Result, locate_interpreter,
};
