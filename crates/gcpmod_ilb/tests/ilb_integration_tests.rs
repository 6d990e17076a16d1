//! Integration tests for the ILB module.

use gcpmod_core::{Handle, ResourceKind, TerraformJson, ValidationError};
use gcpmod_ilb::{plan, IlbError, RawBalancerConfig};

fn from_yaml(yaml: &str) -> RawBalancerConfig {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_full_balancer_from_yaml() {
    let raw = from_yaml(
        r#"
name: api-ilb
project: my-project
region: us-central1
subnetwork: projects/my-project/regions/us-central1/subnetworks/private
backends:
  - group: projects/my-project/zones/us-central1-a/instanceGroups/api
    description: primary
  - group: projects/my-project/zones/us-central1-b/instanceGroups/api
    failover: true
ports: [80, 443]
global_access: true
health_check_config:
  type: http
  port: 80
  request_path: /healthz
source_ip_ranges: [10.0.0.0/8]
target_tags: [api]
"#,
    );

    let planned = plan(&raw).unwrap().value;
    assert_eq!(planned.composition.len(), 5);
    assert_eq!(planned.composition.of_kind(ResourceKind::HealthCheck).count(), 1);

    let rendered = TerraformJson::render_resources(&planned.composition).unwrap();
    let rule = &rendered["resource"]["google_compute_forwarding_rule"]["api-ilb"];
    assert_eq!(rule["allow_global_access"], true);
    assert_eq!(
        rule["depends_on"][0],
        "google_compute_region_backend_service.api-ilb"
    );

    let service = &rendered["resource"]["google_compute_region_backend_service"]["api-ilb"];
    assert_eq!(service["backend"][1]["failover"], true);
    assert_eq!(
        service["health_checks"][0],
        "${google_compute_health_check.api-ilb-hc.self_link}"
    );
}

#[test]
fn test_outputs_match_composition() {
    let cases = [
        r#"
name: ilb
project: p
region: us-east1
backends: [{group: g}]
all_ports: true
health_check_config: {type: tcp, port: 22}
"#,
        r#"
name: ilb
project: p
region: us-east1
backends: [{group: g}]
ports: [53]
ip_protocol: UDP
health_check: projects/p/global/healthChecks/dns
create_backend_firewall: false
"#,
        r#"
name: ilb
project: p
region: us-east1
backends: [{group: g}]
all_ports: true
"#,
    ];

    for yaml in cases {
        let planned = plan(&from_yaml(yaml)).unwrap().value;
        for (name, handle) in planned.outputs.to_map() {
            match handle {
                Some(Handle::Composed { address, .. }) => assert!(
                    planned.composition.contains(&address),
                    "output {} points at undeclared {}",
                    name,
                    address
                ),
                Some(Handle::External(reference)) => {
                    assert_eq!(name, "health_check");
                    assert_eq!(reference, "projects/p/global/healthChecks/dns");
                }
                None => {}
            }
        }
    }
}

#[test]
fn test_invalid_balancer_reports_every_problem() {
    let raw = from_yaml(
        r#"
name: Bad_Name
region: us-central1
backends:
  - balancing_mode: RATE
    failover: true
ports: [80, 70000]
all_ports: true
log_sample_rate: 2.0
session_affinity: STICKY
health_check: existing
health_check_config:
  type: grpc
"#,
    );

    let errors = match plan(&raw) {
        Err(IlbError::Invalid(errors)) => errors,
        other => panic!("expected validation failure, got {:?}", other.map(|p| p.warnings)),
    };

    for field in [
        "name",
        "project",
        "backends[0].group",
        "backends[0].balancing_mode",
        "all_ports",
        "log_sample_rate",
        "session_affinity",
        "health_check",
        "health_check_config.type",
    ] {
        assert!(errors.mentions(field), "missing error for {}: {}", field, errors);
    }
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::InvalidEnumValue { field, .. } if field == "session_affinity")));
}

#[test]
fn test_unknown_field_rejected() {
    let result: Result<RawBalancerConfig, _> = serde_yaml::from_str(
        r#"
name: ilb
load_balancing_scheme: EXTERNAL
"#,
    );
    assert!(result.is_err());
}
