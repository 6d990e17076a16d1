//! Internal load balancer validation.

use std::collections::HashMap;

use tracing::debug;

use gcpmod_core::{
    indexed, Handle, HealthCheckSource, Validated, ValidationError, ValidationErrors, Violations,
};

use crate::composer::{
    BACKEND_FIREWALL_SUFFIX, HEALTH_CHECK_FIREWALL_SUFFIX, HEALTH_CHECK_SUFFIX,
};
use crate::config::{RawBackend, RawBalancerConfig};
use crate::model::{
    Backend, BalancerConfig, BalancingMode, FirewallConfig, ForwardingRuleConfig, IpProtocol,
    PortSelection, SessionAffinity,
};

/// Validator for internal load balancer configs.
pub struct BalancerValidator;

impl BalancerValidator {
    /// Validate a balancer config, reporting every violated rule.
    ///
    /// `default_group` binds backends that omit `group`; without it such
    /// backends are a missing required field.
    pub fn validate(
        raw: &RawBalancerConfig,
        default_group: Option<&Handle>,
    ) -> Result<Validated<BalancerConfig>, ValidationErrors> {
        debug!("Validating balancer config {:?}", raw.name);
        let mut v = Violations::new();

        let name = v.require("name", raw.name.as_deref());
        let name_ok = name.map_or(false, |name| v.check_name("name", name));
        let project = v.require("project", raw.project.as_deref());
        let region = v.require("region", raw.region.as_deref());

        let backends = Self::validate_backends(&raw.backends, default_group, &mut v);
        let session_affinity = v.enum_or(
            "session_affinity",
            raw.session_affinity.as_deref(),
            SessionAffinity::None,
        );
        let connection_draining_timeout_sec = v.optional_int_in(
            "connection_draining_timeout_sec",
            raw.connection_draining_timeout_sec,
            0..=3600,
        );
        let log_sample_rate = match raw.log_sample_rate {
            Some(rate) => v
                .check_range("log_sample_rate", (0.0..=1.0).contains(&rate), rate, "0 <= log_sample_rate <= 1")
                .then_some(Some(rate)),
            None => Some(None),
        };
        let forwarding_rule = Self::validate_forwarding_rule(raw, &mut v);
        let health_check = HealthCheckSource::resolve(
            &mut v,
            raw.health_check.as_deref(),
            raw.health_check_config.as_ref(),
        );
        let firewall = Self::firewall(raw, health_check.as_ref(), &mut v);
        if let (Some(name), Some(health_check), true) = (name, health_check.as_ref(), name_ok) {
            Self::check_derived_names(name, health_check, &firewall, &mut v);
        }

        let (
            Some(name),
            Some(project),
            Some(region),
            Some(backends),
            Some(session_affinity),
            Some(connection_draining_timeout_sec),
            Some(log_sample_rate),
            Some(forwarding_rule),
            Some(health_check),
        ) = (
            name,
            project,
            region,
            backends,
            session_affinity,
            connection_draining_timeout_sec,
            log_sample_rate,
            forwarding_rule,
            health_check,
        )
        else {
            return Err(v.into_errors());
        };

        v.finish(BalancerConfig {
            name: name.to_string(),
            project: project.to_string(),
            region: region.to_string(),
            network: raw
                .network
                .clone()
                .unwrap_or_else(|| BalancerConfig::DEFAULT_NETWORK.to_string()),
            subnetwork: raw.subnetwork.clone(),
            backends,
            session_affinity,
            connection_draining_timeout_sec: connection_draining_timeout_sec.map(|n| n as u32),
            log_sample_rate,
            forwarding_rule,
            health_check,
            firewall,
            labels: raw.labels.clone(),
        })
    }

    fn validate_backends(
        raw: &[RawBackend],
        default_group: Option<&Handle>,
        v: &mut Violations,
    ) -> Option<Vec<Backend>> {
        if raw.is_empty() {
            v.check_range("backends", false, 0, "at least one backend");
            return None;
        }

        let mut backends = Vec::with_capacity(raw.len());
        let mut ok = true;

        for (i, backend) in raw.iter().enumerate() {
            let field = indexed("backends", i);
            let group = match (&backend.group, default_group) {
                (Some(group), _) => Some(Handle::external(group.clone())),
                (None, Some(bound)) => Some(bound.clone()),
                (None, None) => {
                    v.push(ValidationError::MissingRequiredField {
                        field: format!("{}.group", field),
                    });
                    None
                }
            };
            let balancing_mode = v.enum_or(
                &format!("{}.balancing_mode", field),
                backend.balancing_mode.as_deref(),
                BalancingMode::Connection,
            );

            match (group, balancing_mode) {
                (Some(group), Some(balancing_mode)) => backends.push(Backend {
                    group,
                    description: backend.description.clone(),
                    balancing_mode,
                    failover: backend.failover.unwrap_or(false),
                }),
                _ => ok = false,
            }
        }

        let mut seen: HashMap<&Handle, usize> = HashMap::new();
        for (i, backend) in backends.iter().enumerate() {
            if let Some(first) = seen.insert(&backend.group, i) {
                ok = false;
                v.push(ValidationError::ConflictingOptions {
                    fields: vec![
                        format!("{}.group", indexed("backends", first)),
                        format!("{}.group", indexed("backends", i)),
                    ],
                    reason: "an instance group can back the balancer only once".into(),
                });
            }
        }

        if ok && backends.iter().all(|b| b.failover) {
            v.check_range(
                "backends",
                false,
                backends.len(),
                "at least one non-failover backend",
            );
            return None;
        }

        ok.then_some(backends)
    }

    fn validate_forwarding_rule(
        raw: &RawBalancerConfig,
        v: &mut Violations,
    ) -> Option<ForwardingRuleConfig> {
        let ip_protocol = v.enum_or("ip_protocol", raw.ip_protocol.as_deref(), IpProtocol::Tcp);
        let all_ports = raw.all_ports.unwrap_or(false);

        let ports = match (&raw.ports, all_ports) {
            (Some(_), true) => {
                v.push(ValidationError::ConflictingOptions {
                    fields: vec!["ports".into(), "all_ports".into()],
                    reason: "a forwarding rule takes a port list or all ports, not both".into(),
                });
                None
            }
            (None, true) => Some(PortSelection::All),
            (None, false) => {
                v.push(ValidationError::MissingRequiredField {
                    field: "ports | all_ports".into(),
                });
                None
            }
            (Some(ports), false) => Self::validate_ports(ports, v),
        };

        let l3_with_ports = ip_protocol == Some(IpProtocol::L3Default) && raw.ports.is_some();
        if l3_with_ports {
            v.push(ValidationError::ConflictingOptions {
                fields: vec!["ip_protocol".into(), "ports".into()],
                reason: "L3_DEFAULT forwarding rules always cover all ports".into(),
            });
        }

        let label_ok = raw
            .service_label
            .as_deref()
            .map_or(true, |label| v.check_name("service_label", label));

        let (Some(ip_protocol), Some(ports), false, true) =
            (ip_protocol, ports, l3_with_ports, label_ok)
        else {
            return None;
        };

        Some(ForwardingRuleConfig {
            ip_address: raw.ip_address.clone(),
            ip_protocol,
            ports,
            global_access: raw.global_access.unwrap_or(false),
            service_label: raw.service_label.clone(),
        })
    }

    /// Resource names composed from the balancer name must be valid too.
    fn check_derived_names(
        name: &str,
        health_check: &HealthCheckSource,
        firewall: &FirewallConfig,
        v: &mut Violations,
    ) {
        let suffixes = [
            (health_check.is_auto_create(), HEALTH_CHECK_SUFFIX),
            (firewall.create_backend_firewall, BACKEND_FIREWALL_SUFFIX),
            (
                firewall.create_health_check_firewall && *health_check != HealthCheckSource::Absent,
                HEALTH_CHECK_FIREWALL_SUFFIX,
            ),
        ];
        for (_, suffix) in suffixes.iter().filter(|(composed, _)| *composed) {
            v.check_name("name", &format!("{}{}", name, suffix));
        }
    }

    fn validate_ports(ports: &[i64], v: &mut Violations) -> Option<PortSelection> {
        let count_ok = v.check_range(
            "ports",
            (1..=BalancerConfig::MAX_PORTS).contains(&ports.len()),
            ports.len(),
            format!("between 1 and {} ports", BalancerConfig::MAX_PORTS),
        );

        let mut parsed = Vec::with_capacity(ports.len());
        let mut ok = count_ok;
        for (i, port) in ports.iter().enumerate() {
            match v.int_in(&indexed("ports", i), Some(*port), 0, 1..=65535) {
                Some(port) => parsed.push(port as u16),
                None => ok = false,
            }
        }

        ok.then_some(PortSelection::List(parsed))
    }

    fn firewall(
        raw: &RawBalancerConfig,
        health_check: Option<&HealthCheckSource>,
        v: &mut Violations,
    ) -> FirewallConfig {
        let firewall = FirewallConfig {
            create_backend_firewall: raw.create_backend_firewall.unwrap_or(true),
            create_health_check_firewall: raw.create_health_check_firewall.unwrap_or(true),
            enable_logging: raw.firewall_enable_logging.unwrap_or(false),
            source_tags: raw.source_tags.clone(),
            source_ip_ranges: raw.source_ip_ranges.clone(),
            target_tags: raw.target_tags.clone(),
        };

        if firewall.create_backend_firewall
            && firewall.source_tags.is_empty()
            && firewall.source_ip_ranges.is_empty()
        {
            v.warn("backend firewall has no source_tags or source_ip_ranges and will admit any source");
        }
        if raw.create_health_check_firewall == Some(true)
            && health_check == Some(&HealthCheckSource::Absent)
        {
            v.warn("create_health_check_firewall has no effect without a health check");
        }

        firewall
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcpmod_core::{RawHealthCheckConfig, ResourceAddress, ResourceKind};

    fn base() -> RawBalancerConfig {
        RawBalancerConfig::new("ilb", "proj", "us-central1")
            .with_backend(RawBackend::group("projects/p/zones/a/instanceGroups/web"))
            .with_ports(&[80, 443])
    }

    #[test]
    fn test_minimal_balancer_defaults() {
        let config = base().build().unwrap().value;
        assert_eq!(config.network(), "default");
        assert_eq!(config.session_affinity(), SessionAffinity::None);
        assert_eq!(config.forwarding_rule().ip_protocol, IpProtocol::Tcp);
        assert_eq!(config.forwarding_rule().ports, PortSelection::List(vec![80, 443]));
        assert_eq!(config.backends()[0].balancing_mode, BalancingMode::Connection);
        assert_eq!(config.health_check(), &HealthCheckSource::Absent);
        assert!(config.firewall().create_backend_firewall);
    }

    #[test]
    fn test_invalid_balancing_mode() {
        let raw = RawBalancerConfig::new("ilb", "proj", "us-central1")
            .with_backend(RawBackend::group("g").with_balancing_mode("RATE"))
            .with_all_ports();
        let errors = raw.build().unwrap_err();
        match errors.iter().next() {
            Some(ValidationError::InvalidEnumValue {
                field,
                value,
                allowed,
            }) => {
                assert_eq!(field, "backends[0].balancing_mode");
                assert_eq!(value, "RATE");
                assert_eq!(allowed, &["CONNECTION", "UTILIZATION"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_ports_and_all_ports_conflict() {
        let errors = base().with_all_ports().build().unwrap_err();
        assert!(errors.mentions("all_ports"));
    }

    #[test]
    fn test_ports_required() {
        let mut raw = base();
        raw.ports = None;
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("ports | all_ports"));
    }

    #[test]
    fn test_too_many_ports_and_bad_port() {
        let mut raw = base();
        raw.ports = Some(vec![1, 2, 3, 4, 5, 0]);
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("ports"));
        assert!(errors.mentions("ports[5]"));
    }

    #[test]
    fn test_l3_default_requires_all_ports() {
        let mut raw = base();
        raw.ip_protocol = Some("L3_DEFAULT".into());
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("ip_protocol"));

        let mut raw = base();
        raw.ports = None;
        raw.all_ports = Some(true);
        raw.ip_protocol = Some("L3_DEFAULT".into());
        assert!(raw.build().is_ok());
    }

    #[test]
    fn test_l3_default_conflict_still_checks_service_label() {
        let mut raw = base();
        raw.ports = Some(vec![80]);
        raw.ip_protocol = Some("L3_DEFAULT".into());
        raw.service_label = Some("Bad_Label".into());
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("ip_protocol"));
        assert!(errors.mentions("service_label"));
    }

    #[test]
    fn test_derived_names_fit_name_limit() {
        let check = || RawHealthCheckConfig {
            protocol: Some("tcp".into()),
            ..Default::default()
        };

        // 56 + "-ilb-fw" is exactly 63 characters.
        let mut raw = base().with_health_check_config(check());
        raw.name = Some(format!("ilb{}", "a".repeat(53)));
        assert!(raw.build().is_ok());

        let long_name = format!("ilb{}", "a".repeat(59));
        let mut raw = base().with_health_check_config(check());
        raw.name = Some(long_name.clone());
        let errors = raw.build().unwrap_err();
        let rejected: Vec<&str> = errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::InvalidFormat { field, value, .. } if field == "name" => {
                    Some(value.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            rejected,
            vec![
                format!("{}-hc", long_name),
                format!("{}-ilb-fw", long_name),
                format!("{}-hc-fw", long_name),
            ]
        );

        // Nothing derived, so the 62-character name stands on its own.
        let mut raw = base();
        raw.name = Some(long_name);
        raw.create_backend_firewall = Some(false);
        assert!(raw.build().is_ok());
    }

    #[test]
    fn test_log_sample_rate_range() {
        for (rate, ok) in [(0.0, true), (0.5, true), (1.0, true), (1.01, false), (-0.1, false)] {
            let mut raw = base();
            raw.log_sample_rate = Some(rate);
            assert_eq!(raw.build().is_ok(), ok, "rate {}", rate);
        }
    }

    #[test]
    fn test_group_required_without_binding() {
        let raw = RawBalancerConfig::new("ilb", "proj", "us-central1")
            .with_backend(RawBackend::default())
            .with_all_ports();
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("backends[0].group"));

        let mig = ResourceAddress::new(ResourceKind::InstanceGroupManager, "web");
        let config = raw
            .build_with_group(&mig.handle("instance_group"))
            .unwrap()
            .value;
        assert!(config.backends()[0].group.is_composed());
    }

    #[test]
    fn test_all_failover_backends_rejected() {
        let raw = RawBalancerConfig::new("ilb", "proj", "us-central1")
            .with_backend(RawBackend::group("a").failover())
            .with_backend(RawBackend::group("b").failover())
            .with_all_ports();
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("backends"));
    }

    #[test]
    fn test_duplicate_backend_group() {
        let raw = RawBalancerConfig::new("ilb", "proj", "us-central1")
            .with_backend(RawBackend::group("a"))
            .with_backend(RawBackend::group("a").failover())
            .with_all_ports();
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("backends[1].group"));
    }

    #[test]
    fn test_health_check_conflict() {
        let raw = base()
            .with_existing_health_check("existing")
            .with_health_check_config(RawHealthCheckConfig {
                protocol: Some("tcp".into()),
                ..Default::default()
            });
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("health_check"));
        assert!(errors.mentions("health_check_config"));
    }

    #[test]
    fn test_no_backends() {
        let raw = RawBalancerConfig::new("ilb", "proj", "us-central1").with_all_ports();
        let errors = raw.build().unwrap_err();
        assert!(errors.mentions("backends"));
    }
}
