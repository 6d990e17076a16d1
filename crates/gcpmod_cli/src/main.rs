//! gcpmod CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

use gcpmod_core::CoreError;
use gcpmod_stack::StackError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
}

/// Install the stderr subscriber. Returns false when one is already set.
fn init_logging(verbose: bool, quiet: bool) -> bool {
    let default_level = if verbose {
        "gcpmod=debug"
    } else if quiet {
        "gcpmod=warn"
    } else {
        "gcpmod=info"
    };
    let mut filter = EnvFilter::from_default_env();
    for directive in [default_level, "warn"] {
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .is_ok()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Plan(args) => commands::plan::execute(args),
        Commands::Render(args) => commands::render::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<StackError>() {
            if err.validation_errors().is_some() {
                return ExitCodes::VALIDATION_FAILURE;
            }
            if let StackError::Core(core) = err {
                if let Some(code) = categorize_core_error(core) {
                    return code;
                }
            }
        }
        if let Some(code) = cause.downcast_ref::<CoreError>().and_then(categorize_core_error) {
            return code;
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("not found") || msg.contains("argument") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

fn categorize_core_error(e: &CoreError) -> Option<u8> {
    match e {
        CoreError::Invalid(_) => Some(ExitCodes::VALIDATION_FAILURE),
        CoreError::UnsupportedFormat(_)
        | CoreError::Yaml(_)
        | CoreError::Json(_)
        | CoreError::Toml(_) => Some(ExitCodes::INVALID_ARGS),
        _ => None,
    }
}
