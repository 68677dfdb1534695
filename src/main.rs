//! sloppose - docker-compose to sloppy.io converter
//!
//! This is the main CLI entry point for sloppose.

use clap::Parser;
use sloppose::cli::CommandRegistry;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// sloppose - docker-compose to sloppy.io converter
#[derive(Parser)]
#[command(name = "sloppose")]
#[command(version)]
#[command(about = "Converts docker-compose files into sloppy.io project files", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Command to run
    command: Option<String>,

    /// Command arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let registry = CommandRegistry::with_defaults();

    let Some(name) = cli.command else {
        eprintln!("Please specify a command...");
        eprint!("{}", registry.usage());
        return ExitCode::FAILURE;
    };

    let Some(command) = registry.get(&name) else {
        eprintln!("Unknown command: {}", name);
        eprint!("{}", registry.usage());
        return ExitCode::FAILURE;
    };

    match command.run(&cli.args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}\n", e);
            eprintln!("{}", command.help());
            ExitCode::FAILURE
        }
    }
}
