//! Validate command - Check a stack config.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use gcpmod_stack::StackError;

use super::{load_config, print_warnings};

#[derive(Args)]
pub struct ValidateArgs {
    /// Stack config file (YAML, JSON or TOML)
    #[arg(short, long)]
    config: PathBuf,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("Validating {:?}", args.config);

    let config = load_config(&args.config)?;

    println!("📋 Validating {}...", args.config.display());
    match config.validate() {
        Ok(validated) => {
            println!("   ✅ Validation passed");
            print_warnings(&validated.warnings);
            Ok(())
        }
        Err(errors) => {
            println!("   ❌ {} problem(s) found", errors.len());
            Err(StackError::Invalid(errors)).context("Validation failed")
        }
    }
}
