//! # gcpmod_ilb
//!
//! Internal TCP/UDP load balancer module.
//!
//! A [`RawBalancerConfig`] is validated into a [`BalancerConfig`] and composed
//! into a regional backend service, a forwarding rule, an optional health
//! check and firewall rules for client traffic and health probes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gcpmod_ilb::{plan, RawBackend, RawBalancerConfig};
//!
//! let raw = RawBalancerConfig::new("web-ilb", "my-project", "us-central1")
//!     .with_backend(RawBackend::group("projects/my-project/zones/us-central1-a/instanceGroups/web"))
//!     .with_ports(&[80, 443]);
//!
//! let planned = plan(&raw).unwrap();
//! println!("{}", planned.value.outputs.ip_address);
//! ```

pub mod composer;
pub mod config;
pub mod error;
pub mod model;
pub mod projector;
pub mod validator;

pub use composer::{IlbComposer, IlbPlan, HEALTH_CHECK_SOURCE_RANGES};
pub use config::{RawBackend, RawBalancerConfig};
pub use error::{IlbError, IlbResult};
pub use model::*;
pub use projector::IlbOutputs;
pub use validator::BalancerValidator;

use gcpmod_core::Validated;

/// Validate and compose a standalone balancer.
pub fn plan(raw: &RawBalancerConfig) -> IlbResult<Validated<IlbPlan>> {
    let validated = raw.build()?;
    let plan = IlbComposer::new(&validated.value).compose()?;
    Ok(Validated {
        value: plan,
        warnings: validated.warnings,
    })
}
