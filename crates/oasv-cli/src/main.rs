//! # oasv CLI entry point
//!
//! Parses arguments, resolves configuration and dispatches to the
//! subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use oasv_cli::compile::{run_compile, CompileArgs};
use oasv_cli::config::{CliConfig, ConfigArgs};
use oasv_cli::resolve::{run_resolve, ResolveArgs};
use oasv_cli::route::{run_route, RouteArgs};
use oasv_cli::validate::{run_validate, ValidateArgs};
use oasv_cli::EXIT_ERROR;

/// OpenAPI schema validation engine.
///
/// Validates payloads against the schemas of an OpenAPI 3.x document,
/// resolves request paths to operations and emits compiled validators.
#[derive(Parser, Debug)]
#[command(name = "oasv", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a payload against a component schema or an operation body.
    Validate(ValidateArgs),

    /// Show which operation a method and path resolve to.
    Route(RouteArgs),

    /// Print a component schema with every reference expanded.
    Resolve(ResolveArgs),

    /// Emit the Rust source of a compiled validator.
    Compile(CompileArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match CliConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args, &config),
        Commands::Route(args) => run_route(&args, &config),
        Commands::Resolve(args) => run_resolve(&args, &config),
        Commands::Compile(args) => run_compile(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
