//! # gcpmod_stack
//!
//! Composes a managed instance group and the internal load balancer in front
//! of it from a single document.
//!
//! Balancer backends that omit `group` are bound to the stack's instance
//! group, and when both sides ask for a new health check only one is
//! declared and shared by reference.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gcpmod_stack::{plan, StackConfig};
//! use std::path::Path;
//!
//! let config = StackConfig::from_file(Path::new("stack.yaml")).unwrap();
//! let planned = plan(&config).unwrap();
//! for decl in planned.composition.ordered().unwrap() {
//!     println!("{}", decl.address);
//! }
//! ```

pub mod composer;
pub mod config;
pub mod error;

pub use composer::{compose, plan, StackPlan};
pub use config::{group_handle, StackConfig, ValidatedStack, BALANCER_SECTION, GROUP_SECTION};
pub use error::{StackError, StackResult};
