use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process::ExitCode;

use bepsync::config;
use bepsync::logging;

fn main() -> ExitCode {
	let matches = Command::new("bepsync")
		.version("0.1.0")
		.about("BEP-compatible file synchronization daemon")
		.arg(
			Arg::new("config_dir")
				.short('c')
				.long("config-dir")
				.value_name("DIR")
				.help("Configuration directory (overrides SYNCSPIRIT_CONFIG_DIR)"),
		)
		.arg(
			Arg::new("command")
				.long("command")
				.value_name("COMMAND")
				.action(ArgAction::Append)
				.help("Startup command, e.g. add_folder:label=docs:path=/data/docs"),
		)
		.arg(
			Arg::new("log_level")
				.short('l')
				.long("log-level")
				.value_name("LEVEL")
				.default_value("info")
				.help("Default log level (overridden by RUST_LOG)"),
		)
		.get_matches();

	let level = matches.get_one::<String>("log_level").map(|s| s.as_str()).unwrap_or("info");
	logging::init_tracing(level);

	let config_dir = matches
		.get_one::<String>("config_dir")
		.map(PathBuf::from)
		.unwrap_or_else(config::config_dir);
	let commands: Vec<String> =
		matches.get_many::<String>("command").unwrap_or_default().cloned().collect();

	match bepsync::daemon::run(&config_dir, &commands) {
		0 => ExitCode::SUCCESS,
		_ => ExitCode::FAILURE,
	}
}

// vim: ts=4
