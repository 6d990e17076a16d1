//! Render command - Write a stack as a Terraform JSON module.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use gcpmod_core::TerraformJson;
use gcpmod_stack::plan;

use super::{load_config, print_warnings};

#[derive(Args)]
pub struct RenderArgs {
    /// Stack config file (YAML, JSON or TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "gcpmod-out")]
    output: PathBuf,
}

pub fn execute(args: RenderArgs) -> Result<()> {
    info!("Rendering {:?} into {:?}", args.config, args.output);

    let config = load_config(&args.config)?;
    let planned = plan(&config).context("Validation failed")?;

    let written = TerraformJson::write_module(&args.output, &planned.composition, &planned.outputs)
        .with_context(|| format!("Failed to write module to {:?}", args.output))?;

    println!("✅ Rendered {} resource(s)", planned.composition.len());
    for path in &written {
        println!("   📄 {}", path.display());
    }
    print_warnings(&planned.warnings);

    Ok(())
}
