use clap::Parser;
use tclbridge_cli::{
	cli::Cli,
	commands,
	error::CliError,
	logging,
	output::{self, CommandResult, OutputFormat},
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		handle_error(command, &err, format);
		std::process::exit(1);
	}
}

fn handle_error(command: &str, err: &CliError, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	// Always print to stderr for humans
	output::print_error_stderr(&cmd_error);

	// JSON consumers also get an envelope on stdout
	if format == OutputFormat::Json {
		let result: CommandResult<()> = CommandResult::failure(command, cmd_error);
		output::print_result(&result, format);
	}
}
