//! Corten VM CLI
//!
//! Entry point. Parses CLI arguments, installs logging and delegates to
//! the Runtime.

use clap::Parser as ClapParser;
use engine_cli::{load_config, Cli, CliError, CliResult, Command, ConsoleHost, Runtime};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match execute(cli.command) {
        Ok(()) => {}
        Err(CliError::Runtime(error)) => {
            eprintln!("{}", error);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(command: Command) -> CliResult<()> {
    match command {
        Command::Check { file } => {
            let report = Runtime::check_file(&file)?;
            println!("{}", report);
            if report.error_count > 0 {
                return Err(CliError::Resolution(report.error_count));
            }
        }
        Command::Config { file } => {
            let config = load_config(file.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Run { file, engine } => {
            let runtime = Runtime::from_args(&engine)?;
            let bundle = Runtime::load_bundle(&file)?;
            let mut vm = runtime.instantiate(bundle, ConsoleHost)?;
            let stdin = std::io::stdin();
            runtime.run_to_end(&mut vm, &mut stdin.lock())?;
        }
        Command::Debug { file, engine } => {
            let runtime = Runtime::from_args(&engine)?;
            let bundle = Runtime::load_bundle(&file)?;
            let mut vm = runtime.instantiate(bundle, ConsoleHost)?;
            engine_cli::repl::run_debugger(&runtime, &mut vm)?;
        }
    }
    Ok(())
}
