//! # gcpmod_mig
//!
//! Managed instance group module: validation, composition and outputs.
//!
//! A [`RawGroupConfig`] is validated into a [`GroupConfig`], composed into a
//! health check (when auto-created), an instance group manager and an
//! optional autoscaler, and projected into [`MigOutputs`] for other modules.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gcpmod_mig::{plan, RawAutoscalerConfig, RawGroupConfig};
//!
//! let raw = RawGroupConfig::new("web", "my-project")
//!     .zonal("us-central1-a")
//!     .with_template("web-template-v1")
//!     .with_autoscaler(RawAutoscalerConfig::replicas(2, 8).with_cpu_target(0.7));
//!
//! let planned = plan(&raw).unwrap();
//! for warning in &planned.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//! println!("{}", planned.value.outputs.instance_group);
//! ```

pub mod composer;
pub mod config;
pub mod error;
pub mod model;
pub mod projector;
pub mod validator;

pub use composer::{compose_versions, ComposedVersion, MigComposer, MigPlan, DEFAULT_VERSION};
pub use config::{
    RawAutoHealing, RawAutoscalerConfig, RawGroupConfig, RawMetric, RawNamedPort, RawUpdatePolicy,
    RawVersion,
};
pub use error::{MigError, MigResult};
pub use model::*;
pub use projector::MigOutputs;
pub use validator::GroupValidator;

use gcpmod_core::Validated;

/// Validate and compose a group in one pass.
pub fn plan(raw: &RawGroupConfig) -> MigResult<Validated<MigPlan>> {
    let validated = raw.build()?;
    let plan = MigComposer::new(&validated.value).compose()?;
    Ok(Validated {
        value: plan,
        warnings: validated.warnings,
    })
}
