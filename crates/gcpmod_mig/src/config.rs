//! Managed instance group configuration as written by callers.
//!
//! Every field is optional here; [`RawGroupConfig::build`] applies defaults
//! and checks every rule, producing a [`GroupConfig`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use gcpmod_core::{RawHealthCheckConfig, Validated, ValidationErrors};

use crate::model::GroupConfig;
use crate::validator::GroupValidator;

/// Managed instance group config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawGroupConfig {
    pub name: Option<String>,
    pub project: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub distribution_policy_zones: Option<Vec<String>>,
    /// Defaults to `name`.
    pub base_instance_name: Option<String>,
    /// Required when `versions` is empty.
    pub instance_template: Option<String>,
    /// Defaults to 1. Ignored by the provider while an autoscaler is attached.
    pub target_size: Option<i64>,
    pub target_pools: Vec<String>,
    pub named_ports: Vec<RawNamedPort>,
    pub versions: Option<BTreeMap<String, RawVersion>>,
    pub update_policy: Option<RawUpdatePolicy>,
    pub auto_healing: Option<RawAutoHealing>,
    pub autoscaler: Option<RawAutoscalerConfig>,
    pub wait_for_instances: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawNamedPort {
    pub name: Option<String>,
    pub port: Option<i64>,
}

/// One entry of the `versions` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawVersion {
    pub instance_template: Option<String>,
    /// `fixed` (default) or `percent`.
    pub target_type: Option<String>,
    /// Absent means this version takes the remainder.
    pub target_size: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawUpdatePolicy {
    #[serde(rename = "type")]
    pub update_type: Option<String>,
    pub minimal_action: Option<String>,
    pub most_disruptive_allowed_action: Option<String>,
    pub replacement_method: Option<String>,
    pub max_surge_fixed: Option<i64>,
    pub max_surge_percent: Option<i64>,
    pub max_unavailable_fixed: Option<i64>,
    pub max_unavailable_percent: Option<i64>,
    pub min_ready_sec: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawAutoHealing {
    /// Existing health check name or self-link.
    pub health_check: Option<String>,
    /// Spec for a health check to create.
    pub health_check_config: Option<RawHealthCheckConfig>,
    /// Defaults to 300.
    pub initial_delay_sec: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawAutoscalerConfig {
    /// Defaults to `<group name>-autoscaler`.
    pub name: Option<String>,
    pub min_replicas: Option<i64>,
    pub max_replicas: Option<i64>,
    pub cooldown_period: Option<i64>,
    pub mode: Option<String>,
    pub cpu_utilization_target: Option<f64>,
    pub load_balancing_utilization_target: Option<f64>,
    pub metric: Option<RawMetric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawMetric {
    pub name: Option<String>,
    pub target: Option<f64>,
    /// Defaults to `GAUGE`.
    pub target_type: Option<String>,
}

impl RawGroupConfig {
    pub fn new(name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            project: Some(project.into()),
            ..Default::default()
        }
    }

    pub fn zonal(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn regional(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.instance_template = Some(template.into());
        self
    }

    pub fn with_target_size(mut self, size: u32) -> Self {
        self.target_size = Some(size.into());
        self
    }

    pub fn with_version(mut self, name: impl Into<String>, version: RawVersion) -> Self {
        self.versions
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), version);
        self
    }

    pub fn with_named_port(mut self, name: impl Into<String>, port: u16) -> Self {
        self.named_ports.push(RawNamedPort {
            name: Some(name.into()),
            port: Some(port.into()),
        });
        self
    }

    pub fn with_auto_healing(mut self, auto_healing: RawAutoHealing) -> Self {
        self.auto_healing = Some(auto_healing);
        self
    }

    pub fn with_autoscaler(mut self, autoscaler: RawAutoscalerConfig) -> Self {
        self.autoscaler = Some(autoscaler);
        self
    }

    pub fn with_update_policy(mut self, policy: RawUpdatePolicy) -> Self {
        self.update_policy = Some(policy);
        self
    }

    /// Validate and normalize.
    pub fn build(&self) -> Result<Validated<GroupConfig>, ValidationErrors> {
        GroupValidator::validate(self)
    }
}

impl RawVersion {
    pub fn fixed(template: impl Into<String>, size: u32) -> Self {
        Self {
            instance_template: Some(template.into()),
            target_type: Some("fixed".into()),
            target_size: Some(size.into()),
        }
    }

    pub fn percent(template: impl Into<String>, percent: u8) -> Self {
        Self {
            instance_template: Some(template.into()),
            target_type: Some("percent".into()),
            target_size: Some(percent.into()),
        }
    }

    pub fn remainder(template: impl Into<String>) -> Self {
        Self {
            instance_template: Some(template.into()),
            ..Default::default()
        }
    }
}

impl RawAutoHealing {
    pub fn existing(reference: impl Into<String>) -> Self {
        Self {
            health_check: Some(reference.into()),
            ..Default::default()
        }
    }

    pub fn auto_create(config: RawHealthCheckConfig) -> Self {
        Self {
            health_check_config: Some(config),
            ..Default::default()
        }
    }
}

impl RawAutoscalerConfig {
    pub fn replicas(min: u32, max: u32) -> Self {
        Self {
            min_replicas: Some(min.into()),
            max_replicas: Some(max.into()),
            ..Default::default()
        }
    }

    pub fn with_cpu_target(mut self, target: f64) -> Self {
        self.cpu_utilization_target = Some(target);
        self
    }

    pub fn with_load_balancing_target(mut self, target: f64) -> Self {
        self.load_balancing_utilization_target = Some(target);
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, target: f64) -> Self {
        self.metric = Some(RawMetric {
            name: Some(name.into()),
            target: Some(target),
            target_type: None,
        });
        self
    }
}
