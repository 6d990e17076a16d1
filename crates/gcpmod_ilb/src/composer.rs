//! Resource composition for internal load balancers.
//!
//! The backend service follows its health check and groups; the forwarding
//! rule follows the backend service. Firewall rules stand alone.

use serde_json::{json, Value};
use tracing::{debug, info};

use gcpmod_core::{
    compose_health_check, Composition, Handle, HealthCheckConfig, HealthCheckPort,
    HealthCheckSource, ResourceAddress, ResourceDecl, ResourceKind,
};

use crate::error::IlbResult;
use crate::model::{BalancerConfig, PortSelection};
use crate::projector::{self, IlbOutputs};

/// Source ranges of Google Cloud health check probes.
pub const HEALTH_CHECK_SOURCE_RANGES: [&str; 2] = ["130.211.0.0/22", "35.191.0.0/16"];

const LOAD_BALANCING_SCHEME: &str = "INTERNAL";

pub(crate) const HEALTH_CHECK_SUFFIX: &str = "-hc";
pub(crate) const BACKEND_FIREWALL_SUFFIX: &str = "-ilb-fw";
pub(crate) const HEALTH_CHECK_FIREWALL_SUFFIX: &str = "-hc-fw";

/// Everything composed for one balancer.
#[derive(Debug, Clone)]
pub struct IlbPlan {
    pub composition: Composition,
    pub outputs: IlbOutputs,
}

/// Composer for a validated [`BalancerConfig`].
pub struct IlbComposer<'a> {
    config: &'a BalancerConfig,
    shared_health_check: Option<Handle>,
    shared_spec: Option<&'a HealthCheckConfig>,
}

impl<'a> IlbComposer<'a> {
    pub fn new(config: &'a BalancerConfig) -> Self {
        Self {
            config,
            shared_health_check: None,
            shared_spec: None,
        }
    }

    /// Reference `handle` instead of declaring the balancer's own health check.
    ///
    /// `spec` describes the referenced check when it is known; the health check
    /// firewall opens its port rather than the balancer's own.
    pub fn with_health_check(mut self, handle: Handle, spec: Option<&'a HealthCheckConfig>) -> Self {
        self.shared_health_check = Some(handle);
        self.shared_spec = spec;
        self
    }

    /// The spec of the check the balancer's backends are probed with.
    fn effective_spec(&self) -> Option<&'a HealthCheckConfig> {
        match (&self.shared_health_check, self.config.health_check()) {
            (Some(_), _) => self.shared_spec,
            (None, HealthCheckSource::AutoCreate(spec)) => Some(spec),
            (None, _) => None,
        }
    }

    pub fn health_check_address(config: &BalancerConfig) -> ResourceAddress {
        ResourceAddress::new(ResourceKind::HealthCheck, format!("{}{}", config.name(), HEALTH_CHECK_SUFFIX))
    }

    pub fn backend_service_address(config: &BalancerConfig) -> ResourceAddress {
        ResourceAddress::new(ResourceKind::RegionBackendService, config.name())
    }

    pub fn forwarding_rule_address(config: &BalancerConfig) -> ResourceAddress {
        ResourceAddress::new(ResourceKind::ForwardingRule, config.name())
    }

    pub fn backend_firewall_address(config: &BalancerConfig) -> Option<ResourceAddress> {
        config
            .firewall()
            .create_backend_firewall
            .then(|| ResourceAddress::new(ResourceKind::Firewall, format!("{}{}", config.name(), BACKEND_FIREWALL_SUFFIX)))
    }

    /// Only declared when the balancer has a health check.
    pub fn health_check_firewall_address(config: &BalancerConfig) -> Option<ResourceAddress> {
        let wanted = config.firewall().create_health_check_firewall
            && config.health_check() != &HealthCheckSource::Absent;
        wanted.then(|| ResourceAddress::new(ResourceKind::Firewall, format!("{}{}", config.name(), HEALTH_CHECK_FIREWALL_SUFFIX)))
    }

    /// Compose every resource the balancer needs.
    pub fn compose(&self) -> IlbResult<IlbPlan> {
        let config = self.config;
        info!("Composing internal load balancer {}", config.name());

        let mut composition = Composition::new();

        if let (HealthCheckSource::AutoCreate(spec), None) =
            (config.health_check(), &self.shared_health_check)
        {
            let address = Self::health_check_address(config);
            composition.add(compose_health_check(&address.name, config.project(), spec))?;
        }
        let health_check =
            projector::health_check_handle(config, self.shared_health_check.as_ref());

        let backend_service = Self::backend_service_address(config);
        let mut service_decl = ResourceDecl::new(
            backend_service.clone(),
            backend_service_attributes(config, health_check.as_ref()),
        );
        if let Some(handle) = &health_check {
            service_decl = service_decl.depends_on_handle(handle);
        }
        for backend in config.backends() {
            service_decl = service_decl.depends_on_handle(&backend.group);
        }
        composition.add(service_decl)?;

        composition.add(
            ResourceDecl::new(
                Self::forwarding_rule_address(config),
                forwarding_rule_attributes(config, &backend_service),
            )
            .depends_on(&backend_service),
        )?;

        if let Some(address) = Self::backend_firewall_address(config) {
            let attrs = backend_firewall_attributes(config, &address.name);
            composition.add(ResourceDecl::new(address, attrs))?;
        }
        if let Some(address) = Self::health_check_firewall_address(config) {
            let attrs = health_check_firewall_attributes(config, self.effective_spec(), &address.name);
            composition.add(ResourceDecl::new(address, attrs))?;
        }

        debug!(
            "Composed {} resources for balancer {}",
            composition.len(),
            config.name()
        );

        Ok(IlbPlan {
            composition,
            outputs: IlbOutputs::project(config, self.shared_health_check.as_ref()),
        })
    }
}

fn backend_service_attributes(config: &BalancerConfig, health_check: Option<&Handle>) -> Value {
    let protocol = config.forwarding_rule().ip_protocol;
    let backends: Vec<Value> = config
        .backends()
        .iter()
        .map(|backend| {
            let mut block = json!({
                "group": backend.group,
                "balancing_mode": backend.balancing_mode.to_string(),
                "failover": backend.failover,
            });
            if let Some(description) = &backend.description {
                block["description"] = json!(description);
            }
            block
        })
        .collect();

    let mut attrs = json!({
        "name": config.name(),
        "project": config.project(),
        "region": config.region(),
        "network": config.network(),
        "load_balancing_scheme": LOAD_BALANCING_SCHEME,
        "protocol": protocol.backend_protocol(),
        "session_affinity": config.session_affinity().to_string(),
        "backend": backends,
    });

    if let Some(timeout) = config.connection_draining_timeout_sec() {
        attrs["connection_draining_timeout_sec"] = json!(timeout);
    }
    if let Some(handle) = health_check {
        attrs["health_checks"] = json!([handle]);
    }
    attrs["log_config"] = match config.log_sample_rate() {
        Some(rate) => json!({ "enable": true, "sample_rate": rate }),
        None => json!({ "enable": false }),
    };

    attrs
}

fn forwarding_rule_attributes(config: &BalancerConfig, backend_service: &ResourceAddress) -> Value {
    let rule = config.forwarding_rule();
    let mut attrs = json!({
        "name": config.name(),
        "project": config.project(),
        "region": config.region(),
        "network": config.network(),
        "load_balancing_scheme": LOAD_BALANCING_SCHEME,
        "backend_service": backend_service.self_link(),
        "ip_protocol": rule.ip_protocol.to_string(),
        "allow_global_access": rule.global_access,
    });

    match &rule.ports {
        PortSelection::All => attrs["all_ports"] = json!(true),
        PortSelection::List(ports) => {
            attrs["ports"] = json!(ports.iter().map(u16::to_string).collect::<Vec<_>>())
        }
    }
    if let Some(subnetwork) = config.subnetwork() {
        attrs["subnetwork"] = json!(subnetwork);
    }
    if let Some(address) = &rule.ip_address {
        attrs["ip_address"] = json!(address);
    }
    if let Some(label) = &rule.service_label {
        attrs["service_label"] = json!(label);
    }
    if !config.labels().is_empty() {
        attrs["labels"] = json!(config.labels());
    }

    attrs
}

fn firewall_base(config: &BalancerConfig, name: &str) -> Value {
    let firewall = config.firewall();
    let mut attrs = json!({
        "name": name,
        "project": config.project(),
        "network": config.network(),
        "direction": "INGRESS",
    });
    if !firewall.target_tags.is_empty() {
        attrs["target_tags"] = json!(firewall.target_tags);
    }
    if firewall.enable_logging {
        attrs["log_config"] = json!({ "metadata": "INCLUDE_ALL_METADATA" });
    }
    attrs
}

fn backend_firewall_attributes(config: &BalancerConfig, name: &str) -> Value {
    let firewall = config.firewall();
    let rule = config.forwarding_rule();
    let mut attrs = firewall_base(config, name);

    let mut allow = json!({ "protocol": rule.ip_protocol.firewall_protocol() });
    if let PortSelection::List(ports) = &rule.ports {
        allow["ports"] = json!(ports.iter().map(u16::to_string).collect::<Vec<_>>());
    }
    attrs["allow"] = json!([allow]);

    if !firewall.source_tags.is_empty() {
        attrs["source_tags"] = json!(firewall.source_tags);
    }
    if !firewall.source_ip_ranges.is_empty() || firewall.source_tags.is_empty() {
        let ranges = if firewall.source_ip_ranges.is_empty() {
            vec!["0.0.0.0/0".to_string()]
        } else {
            firewall.source_ip_ranges.clone()
        };
        attrs["source_ranges"] = json!(ranges);
    }

    attrs
}

fn health_check_firewall_attributes(
    config: &BalancerConfig,
    spec: Option<&HealthCheckConfig>,
    name: &str,
) -> Value {
    let mut attrs = firewall_base(config, name);

    let mut allow = json!({ "protocol": "tcp" });
    if let Some(HealthCheckPort::Fixed(port)) = spec.map(|spec| &spec.port) {
        allow["ports"] = json!([port.to_string()]);
    }
    attrs["allow"] = json!([allow]);
    attrs["source_ranges"] = json!(HEALTH_CHECK_SOURCE_RANGES);

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawBackend, RawBalancerConfig};
    use gcpmod_core::{HealthProtocol, RawHealthCheckConfig};

    fn balancer() -> RawBalancerConfig {
        RawBalancerConfig::new("ilb", "proj", "us-central1")
            .with_backend(RawBackend::group("projects/proj/zones/us-central1-a/instanceGroups/web"))
            .with_ports(&[8080])
    }

    fn tcp_check() -> RawHealthCheckConfig {
        RawHealthCheckConfig {
            protocol: Some("tcp".into()),
            port: Some(8080),
            ..Default::default()
        }
    }

    #[test]
    fn test_dependency_order() {
        let config = balancer()
            .with_health_check_config(tcp_check())
            .build()
            .unwrap()
            .value;
        let plan = IlbComposer::new(&config).compose().unwrap();

        let order: Vec<String> = plan
            .composition
            .ordered()
            .unwrap()
            .iter()
            .map(|d| d.address.to_string())
            .collect();
        assert_eq!(order.len(), 5);

        let position = |address: &str| order.iter().position(|a| a == address).unwrap();
        assert!(
            position("google_compute_health_check.ilb-hc")
                < position("google_compute_region_backend_service.ilb")
        );
        assert!(
            position("google_compute_region_backend_service.ilb")
                < position("google_compute_forwarding_rule.ilb")
        );
        assert!(order.contains(&"google_compute_firewall.ilb-ilb-fw".to_string()));
        assert!(order.contains(&"google_compute_firewall.ilb-hc-fw".to_string()));
    }

    #[test]
    fn test_backend_service_attributes() {
        let mut raw = balancer().with_existing_health_check("projects/proj/global/healthChecks/hc");
        raw.log_sample_rate = Some(0.5);
        raw.session_affinity = Some("CLIENT_IP".into());
        let config = raw.build().unwrap().value;
        let plan = IlbComposer::new(&config).compose().unwrap();
        let service = plan
            .composition
            .get(&IlbComposer::backend_service_address(&config))
            .unwrap();

        assert_eq!(service.attributes["load_balancing_scheme"], "INTERNAL");
        assert_eq!(service.attributes["protocol"], "TCP");
        assert_eq!(service.attributes["session_affinity"], "CLIENT_IP");
        assert_eq!(
            service.attributes["health_checks"][0],
            "projects/proj/global/healthChecks/hc"
        );
        assert_eq!(service.attributes["log_config"]["sample_rate"], 0.5);
        assert_eq!(service.attributes["backend"][0]["balancing_mode"], "CONNECTION");
        assert!(service.depends_on.is_empty());
    }

    #[test]
    fn test_forwarding_rule_references_backend_service() {
        let config = balancer().build().unwrap().value;
        let plan = IlbComposer::new(&config).compose().unwrap();
        let rule = plan
            .composition
            .get(&IlbComposer::forwarding_rule_address(&config))
            .unwrap();

        assert_eq!(
            rule.attributes["backend_service"],
            "${google_compute_region_backend_service.ilb.self_link}"
        );
        assert_eq!(rule.attributes["ports"], json!(["8080"]));
        assert!(rule.attributes.get("all_ports").is_none());
        assert_eq!(rule.depends_on, vec![IlbComposer::backend_service_address(&config)]);
    }

    #[test]
    fn test_no_health_check_firewall_without_health_check() {
        let config = balancer().build().unwrap().value;
        let plan = IlbComposer::new(&config).compose().unwrap();

        assert_eq!(plan.composition.of_kind(ResourceKind::HealthCheck).count(), 0);
        assert_eq!(plan.composition.of_kind(ResourceKind::Firewall).count(), 1);
        assert!(plan.outputs.health_check_firewall.is_none());
    }

    #[test]
    fn test_health_check_firewall_uses_probe_ranges() {
        let config = balancer()
            .with_health_check_config(tcp_check())
            .build()
            .unwrap()
            .value;
        let plan = IlbComposer::new(&config).compose().unwrap();
        let address = IlbComposer::health_check_firewall_address(&config).unwrap();
        let firewall = plan.composition.get(&address).unwrap();

        assert_eq!(
            firewall.attributes["source_ranges"],
            json!(["130.211.0.0/22", "35.191.0.0/16"])
        );
        assert_eq!(firewall.attributes["allow"][0]["ports"], json!(["8080"]));
    }

    #[test]
    fn test_shared_health_check_not_declared() {
        let config = balancer()
            .with_health_check_config(tcp_check())
            .build()
            .unwrap()
            .value;
        let shared = ResourceAddress::new(ResourceKind::HealthCheck, "web-hc");
        let plan = IlbComposer::new(&config)
            .with_health_check(shared.self_link(), None)
            .compose()
            .unwrap();

        assert_eq!(plan.composition.of_kind(ResourceKind::HealthCheck).count(), 0);
        let service = plan
            .composition
            .get(&IlbComposer::backend_service_address(&config))
            .unwrap();
        assert_eq!(service.depends_on, vec![shared.clone()]);
        assert_eq!(plan.outputs.health_check, Some(shared.self_link()));

        // Unknown port on the shared check: the firewall allows all of tcp.
        let address = IlbComposer::health_check_firewall_address(&config).unwrap();
        let firewall = plan.composition.get(&address).unwrap();
        assert!(firewall.attributes["allow"][0].get("ports").is_none());
    }

    #[test]
    fn test_health_check_firewall_follows_shared_check() {
        let config = balancer()
            .with_health_check_config(tcp_check())
            .build()
            .unwrap()
            .value;
        let shared_spec = HealthCheckConfig::new(HealthProtocol::Http).with_port(80);
        let shared = ResourceAddress::new(ResourceKind::HealthCheck, "web-hc");
        let plan = IlbComposer::new(&config)
            .with_health_check(shared.self_link(), Some(&shared_spec))
            .compose()
            .unwrap();

        let address = IlbComposer::health_check_firewall_address(&config).unwrap();
        let firewall = plan.composition.get(&address).unwrap();
        assert_eq!(firewall.attributes["allow"][0]["ports"], json!(["80"]));
    }

    #[test]
    fn test_firewalls_disabled() {
        let mut raw = balancer().with_health_check_config(tcp_check());
        raw.create_backend_firewall = Some(false);
        raw.create_health_check_firewall = Some(false);
        let config = raw.build().unwrap().value;
        let plan = IlbComposer::new(&config).compose().unwrap();

        assert_eq!(plan.composition.of_kind(ResourceKind::Firewall).count(), 0);
        assert_eq!(plan.composition.len(), 3);
    }
}
