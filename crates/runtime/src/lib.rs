//! Tcl interpreter runtime - process supervision, framing and sessions
//!
//! This crate drives an external `tclsh` over its standard streams:
//!
//! - **Interpreter discovery**: Locating the executable and validating
//!   installation prerequisites
//! - **Process**: Spawning and tearing down the child process
//! - **Framing**: Sentinel-delimited scripts that mark where each result
//!   starts and ends on the boundary-less pipes
//! - **Transport**: Writing scripts and reading stdout and stderr
//!   concurrently
//! - **Connection**: One serialized session with timeouts and batch
//!   execution
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  tclbridge   │  Named queries, decoding, registry
//! └──────┬───────┘
//!        │ implements Evaluate
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌────────┐  │
//! │  │ Conn   │  │  Serialization, timeouts, batches
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Framed stdio
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Proc   │  │  Process management
//! │  └────────┘  │
//! └──────────────┘
//! ```

use async_trait::async_trait;

pub mod connection;
pub mod error;
pub mod framing;
pub mod interpreter;
pub mod process;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use connection::{Connection, ConnectionOptions, DEFAULT_COMMAND_TIMEOUT, DEFAULT_STARTUP_TIMEOUT};
pub use error::{Error, Result};
pub use framing::{Outcome, Sentinel, Transaction};
pub use interpreter::{InstallRequirement, TCLSH_ENV, locate_interpreter};
pub use process::InterpreterProcess;
pub use transport::PipeTransport;

/// Anything that can evaluate a command and return its result text.
///
/// Decoders that need follow-up queries take `&dyn Evaluate`, so they run
/// against a live [`Connection`] or a scripted stand-in alike.
#[async_trait]
pub trait Evaluate: Send + Sync {
	async fn evaluate(&self, command: &str) -> Result<String>;
}

#[async_trait]
impl Evaluate for Connection {
	async fn evaluate(&self, command: &str) -> Result<String> {
		Connection::evaluate(self, command).await
	}
}
