//! Managed instance group validation.

use tracing::debug;

use gcpmod_core::{
    indexed, HealthCheckSource, Validated, ValidationError, ValidationErrors, Violations,
};

use crate::composer::HEALTH_CHECK_SUFFIX;
use crate::config::{RawAutoHealing, RawAutoscalerConfig, RawGroupConfig, RawUpdatePolicy};
use crate::model::{
    Allowance, AutoHealingPolicy, AutoscalerConfig, AutoscalerMode, GroupConfig, Location,
    MetricTargetType, NamedPort, ReplacementMethod, TargetType, UpdateAction, UpdatePolicy,
    UpdateType, UtilizationSignal, Version, VersionTarget,
};

const U32_RANGE: std::ops::RangeInclusive<i64> = 0..=u32::MAX as i64;

/// Validator for managed instance group configs.
pub struct GroupValidator;

impl GroupValidator {
    /// Validate a group config, reporting every violated rule.
    pub fn validate(raw: &RawGroupConfig) -> Result<Validated<GroupConfig>, ValidationErrors> {
        debug!("Validating group config {:?}", raw.name);
        let mut v = Violations::new();

        let name = v.require("name", raw.name.as_deref());
        let name_ok = name.map_or(false, |name| v.check_name("name", name));
        let project = v.require("project", raw.project.as_deref());
        let location = Self::validate_location(raw, &mut v);

        if let Some(base) = raw.base_instance_name.as_deref() {
            v.check_name("base_instance_name", base);
        }
        let base_instance_name = raw.base_instance_name.as_deref().or(name);

        let target_size = v
            .int_in(
                "target_size",
                raw.target_size,
                GroupConfig::DEFAULT_TARGET_SIZE.into(),
                U32_RANGE,
            )
            .map(|n| n as u32);

        let named_ports = Self::validate_named_ports(raw, &mut v);
        let versions = Self::validate_versions(raw, target_size, &mut v);

        let update_policy = match &raw.update_policy {
            Some(policy) => v
                .absorb("update_policy", Self::validate_update_policy(policy))
                .map(Some),
            None => Some(None),
        };

        let auto_healing = match &raw.auto_healing {
            Some(auto_healing) => {
                v.absorb("auto_healing", Self::validate_auto_healing(auto_healing))
            }
            None => Some(None),
        };
        if let (Some(name), true, Some(Some(policy))) = (name, name_ok, &auto_healing) {
            if policy.health_check.is_auto_create() {
                v.check_name("name", &format!("{}{}", name, HEALTH_CHECK_SUFFIX));
            }
        }

        let autoscaler = match &raw.autoscaler {
            Some(autoscaler) => {
                if raw.target_size.is_some() {
                    v.warn("target_size is ignored while an autoscaler manages the group size");
                }
                v.absorb(
                    "autoscaler",
                    Self::validate_autoscaler(autoscaler, name.unwrap_or("group")),
                )
                .map(Some)
            }
            None => Some(None),
        };

        let (
            Some(name),
            Some(project),
            Some(location),
            Some(base_instance_name),
            Some(target_size),
            Some(named_ports),
            Some(versions),
            Some(update_policy),
            Some(auto_healing),
            Some(autoscaler),
        ) = (
            name,
            project,
            location,
            base_instance_name,
            target_size,
            named_ports,
            versions,
            update_policy,
            auto_healing,
            autoscaler,
        )
        else {
            return Err(v.into_errors());
        };

        v.finish(GroupConfig {
            name: name.to_string(),
            project: project.to_string(),
            location,
            base_instance_name: base_instance_name.to_string(),
            instance_template: raw.instance_template.clone(),
            target_size,
            target_pools: raw.target_pools.clone(),
            named_ports,
            versions,
            update_policy,
            auto_healing,
            autoscaler,
            wait_for_instances: raw.wait_for_instances.unwrap_or(false),
        })
    }

    fn validate_location(raw: &RawGroupConfig, v: &mut Violations) -> Option<Location> {
        match (raw.region.as_deref(), raw.zone.as_deref()) {
            (Some(_), Some(_)) => {
                v.push(ValidationError::ConflictingOptions {
                    fields: vec!["region".into(), "zone".into()],
                    reason: "a group is either regional or zonal".into(),
                });
                None
            }
            (None, None) => {
                v.push(ValidationError::MissingRequiredField {
                    field: "region | zone".into(),
                });
                None
            }
            (None, Some(zone)) => {
                if raw.distribution_policy_zones.is_some() {
                    v.push(ValidationError::ConflictingOptions {
                        fields: vec!["zone".into(), "distribution_policy_zones".into()],
                        reason: "distribution zones apply to regional groups only".into(),
                    });
                    return None;
                }
                Some(Location::Zonal {
                    zone: zone.to_string(),
                })
            }
            (Some(region), None) => {
                let zones = raw.distribution_policy_zones.clone().unwrap_or_default();
                let prefix = format!("{}-", region);
                let mut ok = true;
                for (i, zone) in zones.iter().enumerate() {
                    ok &= v.check_range(
                        &indexed("distribution_policy_zones", i),
                        zone.starts_with(&prefix),
                        zone,
                        format!("zone within region {}", region),
                    );
                }
                ok.then(|| Location::Regional {
                    region: region.to_string(),
                    distribution_zones: zones,
                })
            }
        }
    }

    fn validate_named_ports(raw: &RawGroupConfig, v: &mut Violations) -> Option<Vec<NamedPort>> {
        let mut ports = Vec::with_capacity(raw.named_ports.len());
        let mut ok = true;

        for (i, port) in raw.named_ports.iter().enumerate() {
            let field = indexed("named_ports", i);
            let name = v.require(&format!("{}.name", field), port.name.as_deref());
            let number = v
                .require(&format!("{}.port", field), port.port.as_ref())
                .and_then(|n| v.int_in(&format!("{}.port", field), Some(*n), 0, 1..=65535));

            match (name, number) {
                (Some(name), Some(number)) if v.check_name(&format!("{}.name", field), name) => {
                    ports.push(NamedPort {
                        name: name.to_string(),
                        port: number as u16,
                    });
                }
                _ => ok = false,
            }
        }

        ok.then_some(ports)
    }

    fn validate_versions(
        raw: &RawGroupConfig,
        target_size: Option<u32>,
        v: &mut Violations,
    ) -> Option<Vec<Version>> {
        let Some(entries) = raw.versions.as_ref().filter(|m| !m.is_empty()) else {
            return v
                .require("instance_template", raw.instance_template.as_deref())
                .map(|_| Vec::new());
        };

        if raw.instance_template.is_some() {
            v.warn("instance_template is unused when versions are set");
        }

        let mut versions = Vec::with_capacity(entries.len());
        let mut ok = true;

        for (name, entry) in entries {
            let field = format!("versions.{}", name);
            let template = v.require(
                &format!("{}.instance_template", field),
                entry.instance_template.as_deref(),
            );
            let target_type = v.enum_or(
                &format!("{}.target_type", field),
                entry.target_type.as_deref(),
                TargetType::Fixed,
            );
            let size_field = format!("{}.target_size", field);
            let target = match (target_type, entry.target_size) {
                (_, None) => Some(VersionTarget::Remainder),
                (Some(TargetType::Fixed), Some(n)) => v
                    .int_in(&size_field, Some(n), 0, U32_RANGE)
                    .map(|n| VersionTarget::Fixed(n as u32)),
                (Some(TargetType::Percent), Some(n)) => v
                    .int_in(&size_field, Some(n), 0, 0..=100)
                    .map(|n| VersionTarget::Percent(n as u8)),
                (None, Some(_)) => None,
            };

            match (template, target) {
                (Some(template), Some(target)) => versions.push(Version {
                    name: name.clone(),
                    instance_template: template.to_string(),
                    target,
                }),
                _ => ok = false,
            }
        }

        let remainders: Vec<String> = versions
            .iter()
            .filter(|ver| ver.target == VersionTarget::Remainder)
            .map(|ver| format!("versions.{}.target_size", ver.name))
            .collect();
        if remainders.len() > 1 {
            ok = false;
            v.push(ValidationError::ConflictingOptions {
                fields: remainders,
                reason: "at most one version may omit target_size and take the remainder".into(),
            });
        }

        let fixed_total: u64 = versions
            .iter()
            .filter_map(|ver| match ver.target {
                VersionTarget::Fixed(n) => Some(u64::from(n)),
                _ => None,
            })
            .sum();
        if let Some(target_size) = target_size {
            ok &= v.check_range(
                "versions",
                fixed_total <= u64::from(target_size),
                fixed_total,
                format!("sum of fixed target sizes <= target_size ({})", target_size),
            );
        }

        if let ([sole], Some(target_size)) = (versions.as_slice(), target_size) {
            let covers_part = match sole.target {
                VersionTarget::Fixed(n) => n < target_size,
                VersionTarget::Percent(p) => p < 100,
                VersionTarget::Remainder => false,
            };
            if covers_part {
                v.warn(format!(
                    "versions.{}.target_size is ignored; a single version covers the whole group",
                    sole.name
                ));
            }
        }

        let percent_total: u32 = versions
            .iter()
            .filter_map(|ver| match ver.target {
                VersionTarget::Percent(p) => Some(u32::from(p)),
                _ => None,
            })
            .sum();
        ok &= v.check_range(
            "versions",
            percent_total <= 100,
            percent_total,
            "sum of percent target sizes <= 100",
        );

        ok.then_some(versions)
    }

    /// Validate a rolling update policy.
    pub fn validate_update_policy(
        raw: &RawUpdatePolicy,
    ) -> Result<Validated<UpdatePolicy>, ValidationErrors> {
        let mut v = Violations::new();

        let update_type = v
            .require("type", raw.update_type.as_deref())
            .and_then(|t| v.parse_enum::<UpdateType>("type", t));
        let minimal_action = v
            .require("minimal_action", raw.minimal_action.as_deref())
            .and_then(|a| v.parse_enum::<UpdateAction>("minimal_action", a));
        let most_disruptive = match raw.most_disruptive_allowed_action.as_deref() {
            Some(a) => v
                .parse_enum::<UpdateAction>("most_disruptive_allowed_action", a)
                .map(Some),
            None => Some(None),
        };
        let replacement_method = v.enum_or(
            "replacement_method",
            raw.replacement_method.as_deref(),
            ReplacementMethod::Substitute,
        );

        if let (Some(minimal), Some(Some(most))) = (minimal_action, most_disruptive) {
            v.check_range(
                "minimal_action",
                minimal <= most,
                minimal,
                format!("no more disruptive than most_disruptive_allowed_action ({})", most),
            );
        }

        let requested_surge =
            Self::allowance(&mut v, "max_surge", raw.max_surge_fixed, raw.max_surge_percent);
        let mut max_surge = requested_surge;
        let max_unavailable = Self::allowance(
            &mut v,
            "max_unavailable",
            raw.max_unavailable_fixed,
            raw.max_unavailable_percent,
        );

        if replacement_method == Some(ReplacementMethod::Recreate) {
            match requested_surge {
                Some(Some(surge)) if !surge.is_zero() => {
                    let surge_field = if raw.max_surge_fixed.is_some() {
                        "max_surge_fixed"
                    } else {
                        "max_surge_percent"
                    };
                    v.push(ValidationError::ConflictingOptions {
                        fields: vec!["replacement_method".into(), surge_field.into()],
                        reason: "RECREATE replaces instances in place and cannot surge".into(),
                    });
                }
                Some(None) => max_surge = Some(Some(Allowance::Fixed(0))),
                _ => {}
            }
        }

        let min_ready_sec = v.optional_int_in("min_ready_sec", raw.min_ready_sec, 0..=3600);

        let (
            Some(update_type),
            Some(minimal_action),
            Some(most_disruptive_allowed_action),
            Some(replacement_method),
            Some(max_surge),
            Some(max_unavailable),
            Some(min_ready_sec),
        ) = (
            update_type,
            minimal_action,
            most_disruptive,
            replacement_method,
            max_surge,
            max_unavailable,
            min_ready_sec,
        )
        else {
            return Err(v.into_errors());
        };

        v.finish(UpdatePolicy {
            update_type,
            minimal_action,
            most_disruptive_allowed_action,
            replacement_method,
            max_surge,
            max_unavailable,
            min_ready_sec: min_ready_sec.map(|n| n as u32),
        })
    }

    fn allowance(
        v: &mut Violations,
        prefix: &str,
        fixed: Option<i64>,
        percent: Option<i64>,
    ) -> Option<Option<Allowance>> {
        let fixed_field = format!("{}_fixed", prefix);
        let percent_field = format!("{}_percent", prefix);
        if !v.at_most_one(
            &[
                (fixed_field.as_str(), fixed.is_some()),
                (percent_field.as_str(), percent.is_some()),
            ],
            "an allowance is either a fixed count or a percentage",
        ) {
            return None;
        }

        match (fixed, percent) {
            (Some(n), _) => v
                .int_in(&fixed_field, Some(n), 0, U32_RANGE)
                .map(|n| Some(Allowance::Fixed(n as u32))),
            (None, Some(p)) => v
                .int_in(&percent_field, Some(p), 0, 0..=100)
                .map(|p| Some(Allowance::Percent(p as u8))),
            (None, None) => Some(None),
        }
    }

    /// Validate an auto-healing block. `Ok(None)` means no health check.
    pub fn validate_auto_healing(
        raw: &RawAutoHealing,
    ) -> Result<Validated<Option<AutoHealingPolicy>>, ValidationErrors> {
        let mut v = Violations::new();

        let source = HealthCheckSource::resolve(
            &mut v,
            raw.health_check.as_deref(),
            raw.health_check_config.as_ref(),
        );
        let initial_delay_sec = v.int_in(
            "initial_delay_sec",
            raw.initial_delay_sec,
            GroupConfig::DEFAULT_INITIAL_DELAY_SEC.into(),
            0..=3600,
        );

        let (Some(source), Some(initial_delay_sec)) = (source, initial_delay_sec) else {
            return Err(v.into_errors());
        };

        let policy = match source {
            HealthCheckSource::Absent => {
                if raw.initial_delay_sec.is_some() {
                    v.warn("initial_delay_sec has no effect without a health check");
                }
                None
            }
            health_check => Some(AutoHealingPolicy {
                health_check,
                initial_delay_sec: initial_delay_sec as u32,
            }),
        };

        v.finish(policy)
    }

    /// Validate an autoscaler block for the group named `group_name`.
    pub fn validate_autoscaler(
        raw: &RawAutoscalerConfig,
        group_name: &str,
    ) -> Result<Validated<AutoscalerConfig>, ValidationErrors> {
        let mut v = Violations::new();

        let name = raw
            .name
            .clone()
            .unwrap_or_else(|| format!("{}-autoscaler", group_name));
        v.check_name("name", &name);

        let min_replicas = v.int_in(
            "min_replicas",
            raw.min_replicas,
            AutoscalerConfig::DEFAULT_MIN_REPLICAS.into(),
            U32_RANGE,
        );
        let max_replicas = v.int_in(
            "max_replicas",
            raw.max_replicas,
            AutoscalerConfig::DEFAULT_MAX_REPLICAS.into(),
            1..=u32::MAX as i64,
        );
        if let (Some(min), Some(max)) = (min_replicas, max_replicas) {
            v.check_range(
                "min_replicas",
                min <= max,
                min,
                format!("min_replicas <= max_replicas ({})", max),
            );
        }
        let cooldown_period = v.int_in(
            "cooldown_period",
            raw.cooldown_period,
            AutoscalerConfig::DEFAULT_COOLDOWN_PERIOD.into(),
            U32_RANGE,
        );
        let mode = v.enum_or("mode", raw.mode.as_deref(), AutoscalerMode::On);
        let signal = Self::validate_signal(raw, &mut v);

        let (Some(min_replicas), Some(max_replicas), Some(cooldown_period), Some(mode), Some(signal)) =
            (min_replicas, max_replicas, cooldown_period, mode, signal)
        else {
            return Err(v.into_errors());
        };

        v.finish(AutoscalerConfig {
            name,
            min_replicas: min_replicas as u32,
            max_replicas: max_replicas as u32,
            cooldown_period: cooldown_period as u32,
            mode,
            signal,
        })
    }

    fn validate_signal(raw: &RawAutoscalerConfig, v: &mut Violations) -> Option<UtilizationSignal> {
        if !v.at_most_one(
            &[
                ("cpu_utilization_target", raw.cpu_utilization_target.is_some()),
                (
                    "load_balancing_utilization_target",
                    raw.load_balancing_utilization_target.is_some(),
                ),
                ("metric", raw.metric.is_some()),
            ],
            "an autoscaler follows exactly one utilization signal",
        ) {
            return None;
        }

        if let Some(target) = raw.cpu_utilization_target {
            return Self::utilization(v, "cpu_utilization_target", target)
                .map(|target| UtilizationSignal::Cpu { target });
        }
        if let Some(target) = raw.load_balancing_utilization_target {
            return Self::utilization(v, "load_balancing_utilization_target", target)
                .map(|target| UtilizationSignal::LoadBalancing { target });
        }
        if let Some(metric) = &raw.metric {
            let name = v.require("metric.name", metric.name.as_deref());
            let target = v.require("metric.target", metric.target.as_ref()).and_then(|t| {
                v.check_range("metric.target", *t > 0.0, t, "metric.target > 0")
                    .then_some(*t)
            });
            let target_type = v.enum_or(
                "metric.target_type",
                metric.target_type.as_deref(),
                MetricTargetType::Gauge,
            );
            return match (name, target, target_type) {
                (Some(name), Some(target), Some(target_type)) => Some(UtilizationSignal::Metric {
                    name: name.to_string(),
                    target,
                    target_type,
                }),
                _ => None,
            };
        }

        Some(UtilizationSignal::default())
    }

    fn utilization(v: &mut Violations, field: &str, target: f64) -> Option<f64> {
        v.check_range(field, target > 0.0 && target <= 1.0, target, "0 < target <= 1")
            .then_some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::HEALTH_CHECK_SUFFIX;
use crate::config::{RawAutoHealing, RawMetric, RawVersion};
    use gcpmod_core::RawHealthCheckConfig;

    fn base() -> RawGroupConfig {
        RawGroupConfig::new("web", "proj")
            .zonal("us-central1-a")
            .with_template("tpl-v1")
    }

    fn http_check() -> RawHealthCheckConfig {
        RawHealthCheckConfig {
            protocol: Some("http".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_group_defaults() {
        let config = base().build().unwrap().value;
        assert_eq!(config.target_size(), 1);
        assert_eq!(config.base_instance_name(), "web");
        assert!(config.versions().is_empty());
        assert!(config.autoscaler().is_none());
        assert!(!config.wait_for_instances());
    }

    #[test]
    fn test_region_and_zone_conflict() {
        let errors = base().regional("us-central1").build().unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::ConflictingOptions { fields, .. } if fields == &["region", "zone"]
        )));
    }

    #[test]
    fn test_missing_location() {
        let raw = RawGroupConfig::new("web", "proj").with_template("tpl");
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("region | zone"));
    }

    #[test]
    fn test_distribution_zones_outside_region() {
        let mut raw = RawGroupConfig::new("web", "proj")
            .regional("us-central1")
            .with_template("tpl");
        raw.distribution_policy_zones = Some(vec!["us-central1-a".into(), "europe-west1-b".into()]);
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("distribution_policy_zones[1]"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_template_required_without_versions() {
        let raw = RawGroupConfig::new("web", "proj").zonal("us-central1-a");
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("instance_template"));
    }

    #[test]
    fn test_fixed_versions_exceeding_target_size() {
        let raw = base()
            .with_target_size(3)
            .with_version("a", RawVersion::fixed("tpl-a", 2))
            .with_version("b", RawVersion::fixed("tpl-b", 2));
        let errors = raw.build().unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::RangeViolation { field, value, .. } if field == "versions" && value == "4"
        )));
    }

    #[test]
    fn test_bad_target_type() {
        let mut version = RawVersion::fixed("tpl-a", 1);
        version.target_type = Some("ratio".into());
        let errors = base().with_version("a", version).build().unwrap_err();
        assert!(errors.mentions("versions.a.target_type"));
    }

    #[test]
    fn test_two_remainder_versions_conflict() {
        let raw = base()
            .with_version("a", RawVersion::remainder("tpl-a"))
            .with_version("b", RawVersion::remainder("tpl-b"));
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("versions.a.target_size"));
    }

    #[test]
    fn test_versions_warn_about_unused_template() {
        let validated = base()
            .with_target_size(4)
            .with_version("stable", RawVersion::remainder("tpl-a"))
            .with_version("canary", RawVersion::percent("tpl-b", 25))
            .build()
            .unwrap();
        assert_eq!(validated.value.versions().len(), 2);
        assert!(validated.warnings.iter().any(|w| w.contains("instance_template")));
    }

    #[test]
    fn test_single_partial_version_warns() {
        let validated = base()
            .with_target_size(3)
            .with_version("only", RawVersion::fixed("tpl-a", 1))
            .build()
            .unwrap();
        assert!(validated
            .warnings
            .iter()
            .any(|w| w.starts_with("versions.only.target_size is ignored")));

        let validated = base()
            .with_target_size(3)
            .with_version("only", RawVersion::fixed("tpl-a", 3))
            .build()
            .unwrap();
        assert!(!validated.warnings.iter().any(|w| w.contains("versions.only")));
    }

    #[test]
    fn test_health_check_name_fits_name_limit() {
        let auto_healing = || RawAutoHealing::auto_create(http_check());

        // 60 + "-hc" is exactly 63 characters.
        let mut raw = base().with_auto_healing(auto_healing());
        raw.name = Some(format!("web{}", "a".repeat(57)));
        assert!(raw.build().is_ok());

        let long_name = format!("web{}", "a".repeat(59));
        let mut raw = base().with_auto_healing(auto_healing());
        raw.name = Some(long_name.clone());
        let errors = raw.build().unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidFormat { field, value, .. }
                if field == "name" && *value == format!("{}-hc", long_name)
        )));

        let mut raw = base();
        raw.name = Some(long_name);
        assert!(raw.build().is_ok());
    }

    #[test]
    fn test_update_policy_rules() {
        let policy = RawUpdatePolicy {
            update_type: Some("EVENTUALLY".into()),
            minimal_action: Some("REPLACE".into()),
            most_disruptive_allowed_action: Some("RESTART".into()),
            replacement_method: Some("RECREATE".into()),
            max_surge_fixed: Some(2),
            max_unavailable_fixed: Some(1),
            max_unavailable_percent: Some(10),
            min_ready_sec: Some(7200),
            ..Default::default()
        };
        let errors = GroupValidator::validate_update_policy(&policy).unwrap_err();
        assert!(errors.mentions("type"));
        assert!(errors.mentions("minimal_action"));
        assert!(errors.mentions("replacement_method"));
        assert!(errors.mentions("max_unavailable_fixed"));
        assert!(errors.mentions("min_ready_sec"));
    }

    #[test]
    fn test_recreate_defaults_surge_to_zero() {
        let policy = RawUpdatePolicy {
            update_type: Some("PROACTIVE".into()),
            minimal_action: Some("REPLACE".into()),
            replacement_method: Some("RECREATE".into()),
            ..Default::default()
        };
        let policy = GroupValidator::validate_update_policy(&policy).unwrap().value;
        assert_eq!(policy.max_surge, Some(Allowance::Fixed(0)));
    }

    #[test]
    fn test_update_policy_missing_required() {
        let errors = GroupValidator::validate_update_policy(&RawUpdatePolicy::default()).unwrap_err();
        assert!(errors.iter().all(|e| matches!(e, ValidationError::MissingRequiredField { .. })));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_autoscaler_signal_exclusivity() {
        let cases = [
            (RawAutoscalerConfig::replicas(1, 3), false),
            (RawAutoscalerConfig::replicas(1, 3).with_cpu_target(0.5), false),
            (RawAutoscalerConfig::replicas(1, 3).with_metric("m", 10.0), false),
            (
                RawAutoscalerConfig::replicas(1, 3)
                    .with_cpu_target(0.5)
                    .with_load_balancing_target(0.5),
                true,
            ),
            (
                RawAutoscalerConfig::replicas(1, 3)
                    .with_cpu_target(0.5)
                    .with_load_balancing_target(0.5)
                    .with_metric("m", 10.0),
                true,
            ),
            (
                RawAutoscalerConfig::replicas(1, 3)
                    .with_load_balancing_target(0.8)
                    .with_metric("m", 10.0),
                true,
            ),
        ];

        for (raw, should_conflict) in cases {
            let result = GroupValidator::validate_autoscaler(&raw, "web");
            assert_eq!(result.is_err(), should_conflict, "case {:?}", raw);
            if let Err(errors) = result {
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, ValidationError::ConflictingOptions { .. })));
            }
        }
    }

    #[test]
    fn test_autoscaler_defaults_to_cpu() {
        let config =
            GroupValidator::validate_autoscaler(&RawAutoscalerConfig::default(), "web").unwrap().value;
        assert_eq!(config.name(), "web-autoscaler");
        assert_eq!(config.min_replicas(), 1);
        assert_eq!(config.max_replicas(), 10);
        assert_eq!(config.cooldown_period(), 60);
        assert_eq!(config.signal(), &UtilizationSignal::Cpu { target: 0.6 });
    }

    #[test]
    fn test_autoscaler_ranges_all_reported() {
        let raw = RawAutoscalerConfig {
            min_replicas: Some(5),
            max_replicas: Some(2),
            cooldown_period: Some(-1),
            cpu_utilization_target: Some(1.5),
            mode: Some("SOMETIMES".into()),
            ..Default::default()
        };
        let errors = GroupValidator::validate_autoscaler(&raw, "web").unwrap_err();
        assert!(errors.mentions("min_replicas"));
        assert!(errors.mentions("cooldown_period"));
        assert!(errors.mentions("cpu_utilization_target"));
        assert!(errors.mentions("mode"));
    }

    #[test]
    fn test_metric_requires_name() {
        let raw = RawAutoscalerConfig {
            metric: Some(RawMetric {
                target: Some(5.0),
                target_type: Some("DELTA_PER_MINUTE".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let errors = GroupValidator::validate_autoscaler(&raw, "web").unwrap_err();
        assert!(errors.mentions("metric.name"));
    }

    #[test]
    fn test_auto_healing_conflict_reported_with_prefix() {
        let auto_healing = RawAutoHealing {
            health_check: Some("existing".into()),
            health_check_config: Some(http_check()),
            initial_delay_sec: None,
        };
        let errors = base().with_auto_healing(auto_healing).build().unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::ConflictingOptions { fields, .. }
                if fields == &["auto_healing.health_check", "auto_healing.health_check_config"]
        )));
    }

    #[test]
    fn test_auto_healing_without_health_check() {
        let config = base()
            .with_auto_healing(RawAutoHealing::default())
            .build()
            .unwrap()
            .value;
        assert!(config.auto_healing().is_none());
        assert_eq!(config.health_check(), &HealthCheckSource::Absent);
    }

    #[test]
    fn test_every_error_reported_at_once() {
        let raw = RawGroupConfig {
            name: Some("Web_Group".into()),
            target_size: Some(-2),
            autoscaler: Some(RawAutoscalerConfig::replicas(4, 2)),
            ..Default::default()
        };
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("name"));
        assert!(errors.mentions("project"));
        assert!(errors.mentions("region | zone"));
        assert!(errors.mentions("target_size"));
        assert!(errors.mentions("instance_template"));
        assert!(errors.mentions("autoscaler.min_replicas"));
    }
}
