//! Stack documents: a group, a balancer, or both.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gcpmod_core::{
    load_document, Handle, HealthCheckSource, Validated, ValidationError, ValidationErrors,
    Violations,
};
use gcpmod_ilb::{BalancerConfig, RawBalancerConfig};
use gcpmod_mig::{GroupConfig, MigComposer, RawGroupConfig};

use crate::error::StackResult;

pub const GROUP_SECTION: &str = "group";
pub const BALANCER_SECTION: &str = "balancer";

/// A config file as written by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    pub group: Option<RawGroupConfig>,
    pub balancer: Option<RawBalancerConfig>,
}

/// A stack whose sections all passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedStack {
    pub group: Option<GroupConfig>,
    pub balancer: Option<BalancerConfig>,
}

impl ValidatedStack {
    /// Whether the group and the balancer both ask for a new health check,
    /// in which case a single one is composed for both.
    pub fn shares_health_check(&self) -> bool {
        match (&self.group, &self.balancer) {
            (Some(group), Some(balancer)) => {
                group.health_check().is_auto_create() && balancer.health_check().is_auto_create()
            }
            _ => false,
        }
    }
}

impl StackConfig {
    pub fn group(group: RawGroupConfig) -> Self {
        Self {
            group: Some(group),
            balancer: None,
        }
    }

    pub fn balancer(balancer: RawBalancerConfig) -> Self {
        Self {
            group: None,
            balancer: Some(balancer),
        }
    }

    pub fn with_balancer(mut self, balancer: RawBalancerConfig) -> Self {
        self.balancer = Some(balancer);
        self
    }

    /// Load a stack document from a YAML, JSON or TOML file.
    pub fn from_file(path: &Path) -> StackResult<Self> {
        debug!("Loading stack config from {:?}", path);
        Ok(load_document(path)?)
    }

    /// Validate every section, reporting errors from all of them at once.
    ///
    /// Balancer backends without a `group` are bound to the stack's group.
    pub fn validate(&self) -> Result<Validated<ValidatedStack>, ValidationErrors> {
        let mut v = Violations::new();

        if self.group.is_none() && self.balancer.is_none() {
            v.push(ValidationError::MissingRequiredField {
                field: format!("{} | {}", GROUP_SECTION, BALANCER_SECTION),
            });
            return Err(v.into_errors());
        }

        let group = self
            .group
            .as_ref()
            .and_then(|raw| v.absorb(GROUP_SECTION, raw.build()));

        let balancer = self.balancer.as_ref().and_then(|raw| {
            let outcome = match (&group, &self.group) {
                (Some(group), _) => raw.build_with_group(&group_handle(group)),
                // The group's own errors are already recorded; still check the
                // balancer as if the group were there.
                (None, Some(_)) => raw.build_with_group(&Handle::external(GROUP_SECTION)),
                (None, None) => raw.build(),
            };
            v.absorb(BALANCER_SECTION, outcome)
        });

        if let (Some(group), Some(balancer)) = (&group, &balancer) {
            if let (HealthCheckSource::AutoCreate(own), HealthCheckSource::AutoCreate(theirs)) =
                (group.health_check(), balancer.health_check())
            {
                if own != theirs {
                    warn!("Balancer health check spec differs from the group's; sharing the group's");
                    v.warn(format!(
                        "{}.health_check_config differs from {}.auto_healing.health_check_config; \
                         the shared health check uses the group's",
                        BALANCER_SECTION, GROUP_SECTION
                    ));
                }
            }
        }

        if let (Some(group), Some(balancer)) = (&group, &balancer) {
            let bound = group_handle(group);
            let location = group.location();
            if balancer.backends().iter().any(|b| b.group == bound)
                && location.region() != balancer.region()
            {
                let (attribute, place) = location.attribute();
                v.push(ValidationError::ConflictingOptions {
                    fields: vec![
                        format!("{}.{}", GROUP_SECTION, attribute),
                        format!("{}.region", BALANCER_SECTION),
                    ],
                    reason: format!(
                        "backend group in {} is outside balancer region {}",
                        place,
                        balancer.region()
                    ),
                });
            }
        }

        v.finish(ValidatedStack { group, balancer })
    }
}

/// Instance group handle balancer backends bind to.
pub fn group_handle(group: &GroupConfig) -> Handle {
    MigComposer::manager_address(group).handle("instance_group")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcpmod_core::RawHealthCheckConfig;
    use gcpmod_ilb::RawBackend;
    use gcpmod_mig::RawAutoHealing;

    fn group() -> RawGroupConfig {
        RawGroupConfig::new("web", "proj")
            .zonal("us-central1-a")
            .with_template("tpl")
    }

    fn balancer() -> RawBalancerConfig {
        RawBalancerConfig::new("web-ilb", "proj", "us-central1")
            .with_backend(RawBackend::default())
            .with_ports(&[80])
    }

    fn check(protocol: &str) -> RawHealthCheckConfig {
        RawHealthCheckConfig {
            protocol: Some(protocol.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_stack_rejected() {
        let errors = StackConfig::default().validate().unwrap_err();
        assert!(errors.mentions("group | balancer"));
    }

    #[test]
    fn test_backends_bind_to_group() {
        let stack = StackConfig::group(group())
            .with_balancer(balancer())
            .validate()
            .unwrap()
            .value;
        let balancer = stack.balancer.unwrap();
        let backend = &balancer.backends()[0];
        assert_eq!(
            backend.group.expression(),
            "${google_compute_instance_group_manager.web.instance_group}"
        );
    }

    #[test]
    fn test_errors_from_both_sections_prefixed() {
        let mut bad_group = group();
        bad_group.target_size = Some(-1);
        let mut bad_balancer = balancer();
        bad_balancer.session_affinity = Some("STICKY".into());

        let errors = StackConfig::group(bad_group)
            .with_balancer(bad_balancer)
            .validate()
            .unwrap_err();
        assert!(errors.mentions("group.target_size"));
        assert!(errors.mentions("balancer.session_affinity"));
        assert!(!errors.mentions("balancer.backends[0].group"));
    }

    #[test]
    fn test_standalone_balancer_needs_groups() {
        let errors = StackConfig::balancer(balancer()).validate().unwrap_err();
        assert!(errors.mentions("balancer.backends[0].group"));
    }

    #[test]
    fn test_differing_health_check_specs_warn() {
        let stack = StackConfig::group(
            group().with_auto_healing(RawAutoHealing::auto_create(check("http"))),
        )
        .with_balancer(balancer().with_health_check_config(check("tcp")))
        .validate()
        .unwrap();

        assert!(stack.value.shares_health_check());
        assert!(stack
            .warnings
            .iter()
            .any(|w| w.starts_with("balancer.health_check_config differs")));
    }

    #[test]
    fn test_group_outside_balancer_region_rejected() {
        let elsewhere = RawGroupConfig::new("web", "proj")
            .zonal("europe-west1-b")
            .with_template("tpl");
        let errors = StackConfig::group(elsewhere)
            .with_balancer(balancer())
            .validate()
            .unwrap_err();
        assert!(errors.mentions("group.zone"));
        assert!(errors.mentions("balancer.region"));
    }

    #[test]
    fn test_regional_group_in_balancer_region_accepted() {
        let regional = RawGroupConfig::new("web", "proj")
            .regional("us-central1")
            .with_template("tpl");
        assert!(StackConfig::group(regional).with_balancer(balancer()).validate().is_ok());
    }

    #[test]
    fn test_stack_from_yaml_rejects_unknown_section() {
        let result: Result<StackConfig, _> = serde_yaml::from_str("network: {}");
        assert!(result.is_err());
    }
}
