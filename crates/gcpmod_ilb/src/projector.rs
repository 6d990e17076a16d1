//! Output handles of a composed internal load balancer.

use gcpmod_core::{Handle, HealthCheckSource, OutputMap};

use crate::composer::IlbComposer;
use crate::model::BalancerConfig;

/// Handles other modules consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IlbOutputs {
    pub forwarding_rule: Handle,
    /// Internal address clients connect to.
    pub ip_address: Handle,
    pub backend_service: Handle,
    /// External reference when an existing health check was configured,
    /// `None` when there is no health check at all.
    pub health_check: Option<Handle>,
    pub backend_firewall: Option<Handle>,
    pub health_check_firewall: Option<Handle>,
}

impl IlbOutputs {
    pub fn project(config: &BalancerConfig, shared_health_check: Option<&Handle>) -> Self {
        let rule = IlbComposer::forwarding_rule_address(config);
        Self {
            forwarding_rule: rule.self_link(),
            ip_address: rule.handle("ip_address"),
            backend_service: IlbComposer::backend_service_address(config).self_link(),
            health_check: health_check_handle(config, shared_health_check),
            backend_firewall: IlbComposer::backend_firewall_address(config).map(|a| a.self_link()),
            health_check_firewall: IlbComposer::health_check_firewall_address(config)
                .map(|a| a.self_link()),
        }
    }

    pub fn to_map(&self) -> OutputMap {
        let mut outputs = OutputMap::new();
        outputs.insert("forwarding_rule".into(), Some(self.forwarding_rule.clone()));
        outputs.insert("ip_address".into(), Some(self.ip_address.clone()));
        outputs.insert("backend_service".into(), Some(self.backend_service.clone()));
        outputs.insert("health_check".into(), self.health_check.clone());
        outputs.insert("backend_firewall".into(), self.backend_firewall.clone());
        outputs.insert(
            "health_check_firewall".into(),
            self.health_check_firewall.clone(),
        );
        outputs
    }
}

pub(crate) fn health_check_handle(
    config: &BalancerConfig,
    shared: Option<&Handle>,
) -> Option<Handle> {
    match config.health_check() {
        HealthCheckSource::Absent => None,
        HealthCheckSource::Existing(reference) => Some(Handle::external(reference.clone())),
        HealthCheckSource::AutoCreate(_) => Some(
            shared
                .cloned()
                .unwrap_or_else(|| IlbComposer::health_check_address(config).self_link()),
        ),
    }
}
