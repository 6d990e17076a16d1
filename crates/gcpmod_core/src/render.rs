//! Terraform JSON rendering for composed modules.
//!
//! Declarations are written in Terraform's JSON configuration syntax so the
//! provisioning engine can consume them without any HCL templating.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::error::CoreResult;
use crate::graph::Composition;
use crate::resource::Handle;

/// Named module outputs. `None` marks a resource that was not composed.
pub type OutputMap = BTreeMap<String, Option<Handle>>;

/// Renderer producing Terraform JSON documents.
pub struct TerraformJson;

impl TerraformJson {
    /// Render every declaration, in dependency order, as a `resource` document.
    pub fn render_resources(composition: &Composition) -> CoreResult<Value> {
        let mut by_type: Map<String, Value> = Map::new();

        for decl in composition.ordered()? {
            let mut body = decl.attributes.clone();
            if !decl.depends_on.is_empty() {
                if let Value::Object(map) = &mut body {
                    let deps: Vec<String> = decl.depends_on.iter().map(|d| d.to_string()).collect();
                    map.insert("depends_on".into(), json!(deps));
                }
            }

            let entry = by_type
                .entry(decl.address.kind.terraform_type().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(resources) = entry {
                resources.insert(decl.address.name.clone(), body);
            }
        }

        Ok(json!({ "resource": Value::Object(by_type) }))
    }

    /// Render module outputs as an `output` document.
    pub fn render_outputs(outputs: &OutputMap) -> Value {
        let blocks: Map<String, Value> = outputs
            .iter()
            .map(|(name, handle)| {
                let value = match handle {
                    Some(handle) => json!(handle.expression()),
                    None => Value::Null,
                };
                (name.clone(), json!({ "value": value }))
            })
            .collect();

        json!({ "output": Value::Object(blocks) })
    }

    /// Write `main.tf.json` and `outputs.tf.json` into `dir`.
    pub fn write_module(
        dir: &Path,
        composition: &Composition,
        outputs: &OutputMap,
    ) -> CoreResult<Vec<PathBuf>> {
        info!("Writing Terraform module to {:?}", dir);
        fs::create_dir_all(dir)?;

        let main = dir.join("main.tf.json");
        fs::write(
            &main,
            serde_json::to_string_pretty(&Self::render_resources(composition)?)?,
        )?;
        debug!("Wrote {} resources to main.tf.json", composition.len());

        let outputs_path = dir.join("outputs.tf.json");
        fs::write(
            &outputs_path,
            serde_json::to_string_pretty(&Self::render_outputs(outputs))?,
        )?;
        debug!("Wrote {} outputs to outputs.tf.json", outputs.len());

        Ok(vec![main, outputs_path])
    }
}
