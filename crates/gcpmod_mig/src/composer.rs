//! Resource composition for managed instance groups.
//!
//! Declaration order is health check, instance group manager, autoscaler.
//! Each later resource depends on the earlier ones it references.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use gcpmod_core::{
    compose_health_check, Composition, Handle, HealthCheckSource, ResourceAddress, ResourceDecl,
    ResourceKind,
};

use crate::error::MigResult;
use crate::model::{
    Allowance, AutoscalerConfig, GroupConfig, Location, UpdatePolicy, UtilizationSignal,
    VersionTarget,
};
use crate::projector::{self, MigOutputs};

/// Name of the version synthesized when no versions are configured.
pub const DEFAULT_VERSION: &str = "default";

pub(crate) const HEALTH_CHECK_SUFFIX: &str = "-hc";

/// A version as declared on the instance group manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedVersion {
    pub instance_template: String,
    pub target: VersionTarget,
}

/// Everything composed for one group.
#[derive(Debug, Clone)]
pub struct MigPlan {
    pub composition: Composition,
    pub versions: BTreeMap<String, ComposedVersion>,
    pub outputs: MigOutputs,
}

/// Composer for a validated [`GroupConfig`].
pub struct MigComposer<'a> {
    config: &'a GroupConfig,
    shared_health_check: Option<Handle>,
}

impl<'a> MigComposer<'a> {
    pub fn new(config: &'a GroupConfig) -> Self {
        Self {
            config,
            shared_health_check: None,
        }
    }

    /// Reference `handle` instead of declaring the auto-healing health check.
    ///
    /// Only consulted when the group asks for an auto-created health check.
    pub fn with_health_check(mut self, handle: Handle) -> Self {
        self.shared_health_check = Some(handle);
        self
    }

    pub fn health_check_address(config: &GroupConfig) -> ResourceAddress {
        ResourceAddress::new(ResourceKind::HealthCheck, format!("{}{}", config.name(), HEALTH_CHECK_SUFFIX))
    }

    pub fn manager_address(config: &GroupConfig) -> ResourceAddress {
        let kind = if config.location().is_regional() {
            ResourceKind::RegionInstanceGroupManager
        } else {
            ResourceKind::InstanceGroupManager
        };
        ResourceAddress::new(kind, config.name())
    }

    pub fn autoscaler_address(config: &GroupConfig) -> Option<ResourceAddress> {
        config.autoscaler().map(|autoscaler| {
            let kind = if config.location().is_regional() {
                ResourceKind::RegionAutoscaler
            } else {
                ResourceKind::Autoscaler
            };
            ResourceAddress::new(kind, autoscaler.name())
        })
    }

    /// Compose every resource the group needs.
    pub fn compose(&self) -> MigResult<MigPlan> {
        let config = self.config;
        info!("Composing managed instance group {}", config.name());

        let mut composition = Composition::new();

        if let (HealthCheckSource::AutoCreate(spec), None) =
            (config.health_check(), &self.shared_health_check)
        {
            let address = Self::health_check_address(config);
            composition.add(compose_health_check(&address.name, config.project(), spec))?;
        }
        let health_check =
            projector::health_check_handle(config, self.shared_health_check.as_ref());

        let versions = compose_versions(config);
        let manager = Self::manager_address(config);
        let mut manager_decl = ResourceDecl::new(
            manager.clone(),
            manager_attributes(config, &versions, health_check.as_ref()),
        );
        if let Some(handle) = &health_check {
            manager_decl = manager_decl.depends_on_handle(handle);
        }
        composition.add(manager_decl)?;

        if let (Some(autoscaler), Some(address)) =
            (config.autoscaler(), Self::autoscaler_address(config))
        {
            composition.add(
                ResourceDecl::new(address, autoscaler_attributes(config, autoscaler, &manager))
                    .depends_on(&manager),
            )?;
        }

        debug!(
            "Composed {} resources for group {}",
            composition.len(),
            config.name()
        );

        Ok(MigPlan {
            composition,
            versions,
            outputs: MigOutputs::project(config, self.shared_health_check.as_ref()),
        })
    }
}

/// Versions to declare: the configured ones, or a single default version
/// sized to `target_size`.
pub fn compose_versions(config: &GroupConfig) -> BTreeMap<String, ComposedVersion> {
    if config.versions().is_empty() {
        let mut versions = BTreeMap::new();
        versions.insert(
            DEFAULT_VERSION.to_string(),
            ComposedVersion {
                instance_template: config.instance_template().unwrap_or_default().to_string(),
                target: VersionTarget::Fixed(config.target_size()),
            },
        );
        return versions;
    }

    config
        .versions()
        .iter()
        .map(|v| {
            (
                v.name.clone(),
                ComposedVersion {
                    instance_template: v.instance_template.clone(),
                    target: v.target,
                },
            )
        })
        .collect()
}

fn manager_attributes(
    config: &GroupConfig,
    versions: &BTreeMap<String, ComposedVersion>,
    health_check: Option<&Handle>,
) -> Value {
    let (location_key, location) = config.location().attribute();
    let mut attrs = json!({
        "name": config.name(),
        "project": config.project(),
        "base_instance_name": config.base_instance_name(),
        "wait_for_instances": config.wait_for_instances(),
    });
    attrs[location_key] = json!(location);

    if let Location::Regional {
        distribution_zones, ..
    } = config.location()
    {
        if !distribution_zones.is_empty() {
            attrs["distribution_policy_zones"] = json!(distribution_zones);
        }
    }

    // The autoscaler owns the size once attached.
    if config.autoscaler().is_none() {
        attrs["target_size"] = json!(config.target_size());
    }

    // A sole version always covers the whole group, and the provider rejects
    // an explicit size on it.
    let sole = versions.len() == 1;
    let version_blocks: Vec<Value> = versions
        .iter()
        .map(|(name, version)| {
            let mut block = json!({
                "name": name,
                "instance_template": version.instance_template,
            });
            match version.target {
                VersionTarget::Fixed(n) if !sole => block["target_size"] = json!({ "fixed": n }),
                VersionTarget::Percent(p) if !sole => {
                    block["target_size"] = json!({ "percent": p })
                }
                _ => {}
            }
            block
        })
        .collect();
    attrs["version"] = json!(version_blocks);

    if !config.target_pools().is_empty() {
        attrs["target_pools"] = json!(config.target_pools());
    }

    if !config.named_ports().is_empty() {
        let ports: Vec<Value> = config
            .named_ports()
            .iter()
            .map(|p| json!({ "name": p.name, "port": p.port }))
            .collect();
        attrs["named_port"] = json!(ports);
    }

    if let Some(policy) = config.update_policy() {
        attrs["update_policy"] = update_policy_attributes(policy);
    }

    if let (Some(policy), Some(handle)) = (config.auto_healing(), health_check) {
        attrs["auto_healing_policies"] = json!({
            "health_check": handle,
            "initial_delay_sec": policy.initial_delay_sec,
        });
    }

    attrs
}

fn update_policy_attributes(policy: &UpdatePolicy) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), json!(policy.update_type.to_string()));
    map.insert("minimal_action".into(), json!(policy.minimal_action.to_string()));
    if let Some(action) = policy.most_disruptive_allowed_action {
        map.insert("most_disruptive_allowed_action".into(), json!(action.to_string()));
    }
    map.insert(
        "replacement_method".into(),
        json!(policy.replacement_method.to_string()),
    );

    for (prefix, allowance) in [
        ("max_surge", policy.max_surge),
        ("max_unavailable", policy.max_unavailable),
    ] {
        match allowance {
            Some(Allowance::Fixed(n)) => {
                map.insert(format!("{}_fixed", prefix), json!(n));
            }
            Some(Allowance::Percent(p)) => {
                map.insert(format!("{}_percent", prefix), json!(p));
            }
            None => {}
        }
    }

    if let Some(sec) = policy.min_ready_sec {
        map.insert("min_ready_sec".into(), json!(sec));
    }

    Value::Object(map)
}

fn autoscaler_attributes(
    config: &GroupConfig,
    autoscaler: &AutoscalerConfig,
    manager: &ResourceAddress,
) -> Value {
    let (location_key, location) = config.location().attribute();

    let mut policy = json!({
        "min_replicas": autoscaler.min_replicas(),
        "max_replicas": autoscaler.max_replicas(),
        "cooldown_period": autoscaler.cooldown_period(),
        "mode": autoscaler.mode().to_string(),
    });
    match autoscaler.signal() {
        UtilizationSignal::Cpu { target } => {
            policy["cpu_utilization"] = json!({ "target": target });
        }
        UtilizationSignal::LoadBalancing { target } => {
            policy["load_balancing_utilization"] = json!({ "target": target });
        }
        UtilizationSignal::Metric {
            name,
            target,
            target_type,
        } => {
            policy["metric"] = json!([{
                "name": name,
                "target": target,
                "type": target_type.to_string(),
            }]);
        }
    }

    let mut attrs = json!({
        "name": autoscaler.name(),
        "project": config.project(),
        "target": manager.id(),
        "autoscaling_policy": policy,
    });
    attrs[location_key] = json!(location);
    attrs
}
