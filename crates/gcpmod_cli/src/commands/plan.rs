//! Plan command - Show what a stack config composes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use gcpmod_stack::{plan, StackPlan};

use super::{load_config, print_warnings};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Stack config file (YAML, JSON or TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = PlanFormat::Text)]
    format: PlanFormat,
}

/// Machine-readable plan.
#[derive(Debug, Serialize)]
struct PlanReport {
    resources: Vec<ResourceReport>,
    outputs: Value,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ResourceReport {
    address: String,
    depends_on: Vec<String>,
    attributes: Value,
}

pub fn execute(args: PlanArgs) -> Result<()> {
    info!("Planning {:?}", args.config);

    let config = load_config(&args.config)?;
    let planned = plan(&config).context("Validation failed")?;

    match args.format {
        PlanFormat::Text => print_text(&planned)?,
        PlanFormat::Json => println!("{}", serde_json::to_string_pretty(&report(&planned)?)?),
    }
    Ok(())
}

fn report(planned: &StackPlan) -> Result<PlanReport> {
    let resources = planned
        .composition
        .ordered()?
        .into_iter()
        .map(|decl| ResourceReport {
            address: decl.address.to_string(),
            depends_on: decl.depends_on.iter().map(|d| d.to_string()).collect(),
            attributes: decl.attributes.clone(),
        })
        .collect();

    Ok(PlanReport {
        resources,
        outputs: serde_json::to_value(&planned.outputs)?,
        warnings: planned.warnings.clone(),
    })
}

fn print_text(planned: &StackPlan) -> Result<()> {
    let ordered = planned.composition.ordered()?;
    println!("📦 {} resource(s) to declare:\n", ordered.len());
    for decl in ordered {
        println!("   + {}", decl.address);
        for dep in &decl.depends_on {
            println!("       ↳ after {}", dep);
        }
    }

    println!("\n🔗 Outputs:");
    for (name, handle) in &planned.outputs {
        match handle {
            Some(handle) => println!("   {} = {}", name, handle),
            None => println!("   {} = null", name),
        }
    }

    if !planned.warnings.is_empty() {
        println!();
        print_warnings(&planned.warnings);
    }
    Ok(())
}
