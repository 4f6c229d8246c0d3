//! Library half of the `tclb` binary, split out so integration tests and
//! the binary share argument parsing and output formatting.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
