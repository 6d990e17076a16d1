//! Output handles of a composed managed instance group.

use gcpmod_core::{Handle, HealthCheckSource, OutputMap};

use crate::composer::MigComposer;
use crate::model::GroupConfig;

/// Handles other modules consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigOutputs {
    pub instance_group_manager: Handle,
    /// The managed instance group itself, for load-balancer backends.
    pub instance_group: Handle,
    pub self_link: Handle,
    /// External reference when an existing health check was configured,
    /// `None` when there is no health check at all.
    pub health_check: Option<Handle>,
    pub autoscaler: Option<Handle>,
}

impl MigOutputs {
    /// Project the outputs of `config`. `shared_health_check` replaces the
    /// group's own auto-created health check, as in [`MigComposer::with_health_check`].
    pub fn project(config: &GroupConfig, shared_health_check: Option<&Handle>) -> Self {
        let manager = MigComposer::manager_address(config);
        Self {
            instance_group_manager: manager.id(),
            instance_group: manager.handle("instance_group"),
            self_link: manager.self_link(),
            health_check: health_check_handle(config, shared_health_check),
            autoscaler: MigComposer::autoscaler_address(config).map(|a| a.id()),
        }
    }

    pub fn to_map(&self) -> OutputMap {
        let mut outputs = OutputMap::new();
        outputs.insert(
            "instance_group_manager".into(),
            Some(self.instance_group_manager.clone()),
        );
        outputs.insert("instance_group".into(), Some(self.instance_group.clone()));
        outputs.insert("self_link".into(), Some(self.self_link.clone()));
        outputs.insert("health_check".into(), self.health_check.clone());
        outputs.insert("autoscaler".into(), self.autoscaler.clone());
        outputs
    }
}

/// Health check the group's auto-healing policy points at.
pub(crate) fn health_check_handle(
    config: &GroupConfig,
    shared: Option<&Handle>,
) -> Option<Handle> {
    match config.health_check() {
        HealthCheckSource::Absent => None,
        HealthCheckSource::Existing(reference) => Some(Handle::external(reference.clone())),
        HealthCheckSource::AutoCreate(_) => Some(
            shared
                .cloned()
                .unwrap_or_else(|| MigComposer::health_check_address(config).self_link()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawAutoHealing, RawGroupConfig};

    #[test]
    fn test_existing_health_check_projected_as_external() {
        let config = RawGroupConfig::new("web", "proj")
            .zonal("us-central1-a")
            .with_template("tpl")
            .with_auto_healing(RawAutoHealing::existing("legacy-hc"))
            .build()
            .unwrap()
            .value;
        let outputs = MigOutputs::project(&config, None);

        assert_eq!(outputs.health_check, Some(Handle::external("legacy-hc")));
        assert!(outputs.autoscaler.is_none());
        assert_eq!(
            outputs.instance_group.expression(),
            "${google_compute_instance_group_manager.web.instance_group}"
        );
    }

    #[test]
    fn test_to_map_keeps_null_outputs() {
        let config = RawGroupConfig::new("web", "proj")
            .zonal("us-central1-a")
            .with_template("tpl")
            .build()
            .unwrap()
            .value;
        let map = MigOutputs::project(&config, None).to_map();
        assert_eq!(map.len(), 5);
        assert_eq!(map.get("health_check"), Some(&None));
    }
}
