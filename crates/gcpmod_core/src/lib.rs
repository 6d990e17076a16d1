//! # gcpmod_core
//!
//! Shared building blocks for the gcpmod infrastructure modules.
//!
//! This crate handles the parts every module needs: collecting validation
//! errors, addressing and ordering resource declarations, the shared health
//! check spec, and rendering the result as Terraform JSON.
//!
//! ## Features
//!
//! - Error taxonomy with dotted field paths, reported all at once
//! - Resource handles that resolve to composed or external references
//! - Dependency-ordered compositions with cycle detection
//! - Terraform JSON output (`main.tf.json`, `outputs.tf.json`)
//! - YAML, JSON and TOML config loading
//!
//! ## Example
//!
//! ```rust,no_run
//! use gcpmod_core::{compose_health_check, Composition, HealthCheckConfig, HealthProtocol, OutputMap, TerraformJson};
//! use std::path::Path;
//!
//! let hc = HealthCheckConfig::new(HealthProtocol::Http).with_request_path("/healthz");
//! let decl = compose_health_check("web-hc", "my-project", &hc);
//!
//! let mut outputs = OutputMap::new();
//! outputs.insert("health_check".into(), Some(decl.address.self_link()));
//!
//! let mut composition = Composition::new();
//! composition.add(decl).unwrap();
//! TerraformJson::write_module(Path::new("./out"), &composition, &outputs).unwrap();
//! ```

pub mod error;
pub mod graph;
pub mod health_check;
pub mod loader;
pub mod render;
pub mod resource;
pub mod violations;

pub use error::{CoreError, CoreResult, ValidationError, ValidationErrors};
pub use graph::Composition;
pub use health_check::{
    compose_health_check, HealthCheckConfig, HealthCheckPort, HealthCheckSource, HealthProtocol,
    ProxyHeader, RawHealthCheckConfig,
};
pub use loader::{load_document, ConfigFormat};
pub use render::{OutputMap, TerraformJson};
pub use resource::{Handle, ResourceAddress, ResourceDecl, ResourceKind};
pub use violations::{indexed, is_valid_name, ConfigEnum, Validated, Violations};
