//! CLI command definitions.
//!
//! Every command reads a stack document holding a `group` section, a
//! `balancer` section, or both.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gcpmod_stack::StackConfig;

pub mod plan;
pub mod render;
pub mod validate;

/// gcpmod - validate and compose GCP instance group and load balancer modules
#[derive(Parser)]
#[command(name = "gcpmod")]
#[command(version, about = "gcpmod - GCP managed instance group and internal load balancer modules")]
#[command(long_about = r#"
gcpmod validates instance group and internal load balancer configurations and
composes them into Terraform JSON.

COMMANDS:
  validate  → Check a config and report every problem at once
  plan      → Show the resources a config composes, in dependency order
  render    → Write main.tf.json and outputs.tf.json

CONFIG FILES:
  YAML (.yaml, .yml), JSON (.json) or TOML (.toml) with a `group` section,
  a `balancer` section, or both.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a stack config
    Validate(validate::ValidateArgs),

    /// Show composed resources and their dependencies
    Plan(plan::PlanArgs),

    /// Render a stack config as a Terraform JSON module
    Render(render::RenderArgs),
}

/// Load a stack document, failing early on a missing file.
pub(crate) fn load_config(path: &Path) -> Result<StackConfig> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {:?}", path);
    }
    StackConfig::from_file(path).with_context(|| format!("Failed to load {:?}", path))
}

pub(crate) fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("   ⚠️  {}", warning);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    pub const STACK_YAML: &str = r#"
group:
  name: web
  project: my-project
  zone: us-central1-a
  instance_template: web-tpl
  auto_healing:
    health_check_config:
      type: tcp
      port: 8080
balancer:
  name: web-ilb
  project: my-project
  region: us-central1
  backends: [{}]
  ports: [8080]
  health_check_config:
    type: tcp
    port: 8080
"#;

    pub fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}
