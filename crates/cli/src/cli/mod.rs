use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;


fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default().bold())
		.usage(AnsiColor::Yellow.on_default().bold())
		.literal(AnsiColor::Green.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "tclb")]
#[command(about = "Drive a Tcl interpreter: evaluate commands, decode keyed lists and attribute blobs")]
#[command(version, styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(flatten)]
	pub session: SessionArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// Interpreter settings. Each flag overrides the matching config file value.
#[derive(Args, Debug, Default, Clone)]
pub struct SessionArgs {
	/// JSON configuration file
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Interpreter executable (default: $TCLBRIDGE_TCLSH, then tclsh on PATH)
	#[arg(long, global = true, value_name = "PATH")]
	pub tclsh: Option<PathBuf>,

	/// Per-command timeout in milliseconds, 0 to wait indefinitely
	#[arg(long, global = true, value_name = "MS")]
	pub timeout: Option<u64>,

	/// Environment variable naming a required installation directory
	#[arg(long, global = true, value_name = "VAR")]
	pub install_env: Option<String>,

	/// File that must exist inside the installation directory
	#[arg(long, global = true, value_name = "FILE", requires = "install_env")]
	pub install_marker: Option<String>,

	/// Directory appended to auto_path (repeatable)
	#[arg(long = "auto-path", global = true, value_name = "DIR")]
	pub auto_path: Vec<PathBuf>,

	/// Package loaded at startup (repeatable)
	#[arg(long = "package", global = true, value_name = "NAME")]
	pub packages: Vec<String>,

	/// Command manifest, one qualified command per line
	#[arg(long, global = true, value_name = "FILE")]
	pub manifest: Option<PathBuf>,

	/// Only register manifest commands in this namespace
	#[arg(long, global = true, value_name = "NS")]
	pub namespace: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Evaluate one command and print its result
	Eval(EvalArgs),

	/// Evaluate commands from a file, one per line, stopping at the first error
	Batch(BatchArgs),

	/// Run a command into a fresh variable and decode it as a keyed list
	Query(QueryArgs),

	/// Run a manifest command by its wrapper name
	Call(CallArgs),

	/// Read commands from stdin until EOF or :quit
	#[command(long_about = "Read commands from stdin until EOF or :quit.\n\n\
		Lines starting with ':' are directives:\n  \
		:keyed VAR [PATH]  decode the keyed list in VAR\n  \
		:attrs CMD         run CMD and decode its -name value pairs\n  \
		:probe HANDLE      check whether HANDLE is still valid\n  \
		:quit              end the session")]
	Repl,

	/// Show how tokens are coerced into typed values (no interpreter needed)
	Coerce(CoerceArgs),

	/// Decode a -name value attribute blob (no interpreter needed)
	Attrs(AttrsArgs),

	/// List the wrapper names a manifest file defines (no interpreter needed)
	Manifest(ManifestArgs),
}

impl Commands {
	/// Name used in the JSON envelope.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Eval(_) => "eval",
			Commands::Batch(_) => "batch",
			Commands::Query(_) => "query",
			Commands::Call(_) => "call",
			Commands::Repl => "repl",
			Commands::Coerce(_) => "coerce",
			Commands::Attrs(_) => "attrs",
			Commands::Manifest(_) => "manifest",
		}
	}
}

#[derive(Args, Debug)]
pub struct EvalArgs {
	/// Tcl command
	pub command: String,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
	/// File with one command per line, or - for stdin
	pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
	/// Base for the result variable name
	pub prefix: String,

	/// Command to run
	pub command: String,

	/// Options passed as -NAME VALUE
	#[arg(value_name = "NAME=VALUE")]
	pub options: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
	/// Wrapper name, e.g. sth_connect for sth::connect
	pub wrapper: String,

	/// Options passed as -NAME VALUE
	#[arg(value_name = "NAME=VALUE")]
	pub options: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CoerceArgs {
	#[arg(required = true, allow_negative_numbers = true)]
	pub tokens: Vec<String>,
}

#[derive(Args, Debug)]
pub struct AttrsArgs {
	/// Attribute text, e.g. "-name port1 -speed 1000"
	#[arg(allow_hyphen_values = true)]
	pub text: String,
}

#[derive(Args, Debug)]
pub struct ManifestArgs {
	pub file: PathBuf,
}
