//! Validated internal load balancer model.

use std::collections::BTreeMap;

use gcpmod_core::{config_enum, Handle, HealthCheckSource};

config_enum! {
    pub enum BalancingMode {
        Connection => "CONNECTION",
        Utilization => "UTILIZATION",
    }
}

config_enum! {
    pub enum SessionAffinity {
        None => "NONE",
        ClientIp => "CLIENT_IP",
        ClientIpProto => "CLIENT_IP_PROTO",
        ClientIpPortProto => "CLIENT_IP_PORT_PROTO",
    }
}

config_enum! {
    pub enum IpProtocol {
        Tcp => "TCP",
        Udp => "UDP",
        L3Default => "L3_DEFAULT",
    }
}

impl IpProtocol {
    /// Backend service protocol matching this forwarding protocol.
    pub fn backend_protocol(&self) -> &'static str {
        match self {
            IpProtocol::Tcp => "TCP",
            IpProtocol::Udp => "UDP",
            IpProtocol::L3Default => "UNSPECIFIED",
        }
    }

    /// Firewall `allow.protocol` value.
    pub fn firewall_protocol(&self) -> &'static str {
        match self {
            IpProtocol::Tcp => "tcp",
            IpProtocol::Udp => "udp",
            IpProtocol::L3Default => "all",
        }
    }
}

/// A group of instances behind the balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub group: Handle,
    pub description: Option<String>,
    pub balancing_mode: BalancingMode,
    pub failover: bool,
}

/// Ports the forwarding rule accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelection {
    All,
    /// One to five ports.
    List(Vec<u16>),
}

/// Frontend entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingRuleConfig {
    /// Ephemeral when absent.
    pub ip_address: Option<String>,
    pub ip_protocol: IpProtocol,
    pub ports: PortSelection,
    pub global_access: bool,
    pub service_label: Option<String>,
}

/// Firewall rules created next to the balancer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FirewallConfig {
    pub create_backend_firewall: bool,
    pub create_health_check_firewall: bool,
    pub enable_logging: bool,
    pub source_tags: Vec<String>,
    pub source_ip_ranges: Vec<String>,
    pub target_tags: Vec<String>,
}

/// Desired state of an internal load balancer.
#[derive(Debug, Clone, PartialEq)]
pub struct BalancerConfig {
    pub(crate) name: String,
    pub(crate) project: String,
    pub(crate) region: String,
    pub(crate) network: String,
    pub(crate) subnetwork: Option<String>,
    pub(crate) backends: Vec<Backend>,
    pub(crate) session_affinity: SessionAffinity,
    pub(crate) connection_draining_timeout_sec: Option<u32>,
    pub(crate) log_sample_rate: Option<f64>,
    pub(crate) forwarding_rule: ForwardingRuleConfig,
    pub(crate) health_check: HealthCheckSource,
    pub(crate) firewall: FirewallConfig,
    pub(crate) labels: BTreeMap<String, String>,
}

impl BalancerConfig {
    pub const DEFAULT_NETWORK: &'static str = "default";
    pub const MAX_PORTS: usize = 5;

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn subnetwork(&self) -> Option<&str> {
        self.subnetwork.as_deref()
    }

    /// At least one, and at least one that is not a failover backend.
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    pub fn session_affinity(&self) -> SessionAffinity {
        self.session_affinity
    }

    pub fn connection_draining_timeout_sec(&self) -> Option<u32> {
        self.connection_draining_timeout_sec
    }

    /// In `[0, 1]` when set; request logging is enabled iff set.
    pub fn log_sample_rate(&self) -> Option<f64> {
        self.log_sample_rate
    }

    pub fn forwarding_rule(&self) -> &ForwardingRuleConfig {
        &self.forwarding_rule
    }

    pub fn health_check(&self) -> &HealthCheckSource {
        &self.health_check
    }

    pub fn firewall(&self) -> &FirewallConfig {
        &self.firewall
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
}
