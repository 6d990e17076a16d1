//! Internal load balancer configuration as written by callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use gcpmod_core::{Handle, RawHealthCheckConfig, Validated, ValidationErrors};

use crate::model::BalancerConfig;
use crate::validator::BalancerValidator;

/// Internal load balancer config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawBalancerConfig {
    pub name: Option<String>,
    pub project: Option<String>,
    pub region: Option<String>,
    /// Defaults to `default`.
    pub network: Option<String>,
    pub subnetwork: Option<String>,
    pub backends: Vec<RawBackend>,
    /// Defaults to `NONE`.
    pub session_affinity: Option<String>,
    pub connection_draining_timeout_sec: Option<i64>,
    /// Enables backend request logging at this rate.
    pub log_sample_rate: Option<f64>,
    /// Ephemeral internal address when absent.
    pub ip_address: Option<String>,
    /// Defaults to `TCP`.
    pub ip_protocol: Option<String>,
    pub ports: Option<Vec<i64>>,
    pub all_ports: Option<bool>,
    pub global_access: Option<bool>,
    pub service_label: Option<String>,
    /// Existing health check name or self-link.
    pub health_check: Option<String>,
    /// Spec for a health check to create.
    pub health_check_config: Option<RawHealthCheckConfig>,
    /// Defaults to true.
    pub create_backend_firewall: Option<bool>,
    /// Defaults to true.
    pub create_health_check_firewall: Option<bool>,
    pub firewall_enable_logging: Option<bool>,
    pub source_tags: Vec<String>,
    pub source_ip_ranges: Vec<String>,
    pub target_tags: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// Backend entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawBackend {
    /// Instance group self-link. Bound by the enclosing stack when absent.
    pub group: Option<String>,
    pub description: Option<String>,
    /// Defaults to `CONNECTION`.
    pub balancing_mode: Option<String>,
    pub failover: Option<bool>,
}

impl RawBalancerConfig {
    pub fn new(
        name: impl Into<String>,
        project: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            project: Some(project.into()),
            region: Some(region.into()),
            ..Default::default()
        }
    }

    pub fn with_backend(mut self, backend: RawBackend) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn with_ports(mut self, ports: &[u16]) -> Self {
        self.ports = Some(ports.iter().map(|p| i64::from(*p)).collect());
        self
    }

    pub fn with_all_ports(mut self) -> Self {
        self.all_ports = Some(true);
        self
    }

    pub fn with_health_check_config(mut self, config: RawHealthCheckConfig) -> Self {
        self.health_check_config = Some(config);
        self
    }

    pub fn with_existing_health_check(mut self, reference: impl Into<String>) -> Self {
        self.health_check = Some(reference.into());
        self
    }

    /// Validate and normalize a standalone balancer.
    pub fn build(&self) -> Result<Validated<BalancerConfig>, ValidationErrors> {
        BalancerValidator::validate(self, None)
    }

    /// Validate with backends lacking a `group` bound to `group`.
    pub fn build_with_group(
        &self,
        group: &Handle,
    ) -> Result<Validated<BalancerConfig>, ValidationErrors> {
        BalancerValidator::validate(self, Some(group))
    }
}

impl RawBackend {
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            ..Default::default()
        }
    }

    pub fn with_balancing_mode(mut self, mode: impl Into<String>) -> Self {
        self.balancing_mode = Some(mode.into());
        self
    }

    pub fn failover(mut self) -> Self {
        self.failover = Some(true);
        self
    }
}
