//! Health checks shared by the instance-group and load-balancer modules.
//!
//! Both modules accept the same pair of fields: `health_check`, a reference to
//! a health check that already exists, and `health_check_config`, a spec for
//! one this module should create. Setting both is a conflict; setting neither
//! means no health check.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config_enum;
use crate::error::{ValidationError, ValidationErrors};
use crate::resource::{ResourceAddress, ResourceDecl, ResourceKind};
use crate::violations::{Validated, Violations};

config_enum! {
    /// Probe protocol.
    pub enum HealthProtocol {
        Http => "http",
        Https => "https",
        Tcp => "tcp",
        Ssl => "ssl",
        Http2 => "http2",
    }
}

impl HealthProtocol {
    /// Protocols that speak HTTP and accept a request path and host.
    pub fn is_http_family(&self) -> bool {
        matches!(self, HealthProtocol::Http | HealthProtocol::Https | HealthProtocol::Http2)
    }

    /// Name of the provider block carrying the protocol parameters.
    pub fn block_name(&self) -> &'static str {
        match self {
            HealthProtocol::Http => "http_health_check",
            HealthProtocol::Https => "https_health_check",
            HealthProtocol::Tcp => "tcp_health_check",
            HealthProtocol::Ssl => "ssl_health_check",
            HealthProtocol::Http2 => "http2_health_check",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            HealthProtocol::Http | HealthProtocol::Tcp => 80,
            HealthProtocol::Https | HealthProtocol::Ssl | HealthProtocol::Http2 => 443,
        }
    }
}

config_enum! {
    pub enum ProxyHeader {
        None => "NONE",
        ProxyV1 => "PROXY_V1",
    }
}

/// Health check spec as written in a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawHealthCheckConfig {
    #[serde(rename = "type")]
    pub protocol: Option<String>,
    pub port: Option<i64>,
    pub port_name: Option<String>,
    pub request_path: Option<String>,
    pub host: Option<String>,
    pub request: Option<String>,
    pub response: Option<String>,
    pub proxy_header: Option<String>,
    pub check_interval_sec: Option<i64>,
    pub timeout_sec: Option<i64>,
    pub healthy_threshold: Option<i64>,
    pub unhealthy_threshold: Option<i64>,
    pub enable_logging: Option<bool>,
}

/// Port a health check probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckPort {
    Fixed(u16),
    Named(String),
}

/// Validated health check spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckConfig {
    pub protocol: HealthProtocol,
    /// Defaults to the protocol's well-known port.
    pub port: HealthCheckPort,
    /// HTTP family only. Defaults to `/`.
    pub request_path: Option<String>,
    /// HTTP family only.
    pub host: Option<String>,
    /// TCP/SSL only.
    pub request: Option<String>,
    /// TCP/SSL only.
    pub response: Option<String>,
    pub proxy_header: ProxyHeader,
    pub check_interval_sec: u32,
    /// Never longer than `check_interval_sec`.
    pub timeout_sec: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
    pub enable_logging: bool,
}

impl HealthCheckConfig {
    pub const DEFAULT_CHECK_INTERVAL_SEC: u32 = 5;
    pub const DEFAULT_TIMEOUT_SEC: u32 = 5;
    pub const DEFAULT_THRESHOLD: u32 = 2;

    /// Health check with default timings for `protocol`.
    pub fn new(protocol: HealthProtocol) -> Self {
        Self {
            protocol,
            port: HealthCheckPort::Fixed(protocol.default_port()),
            request_path: protocol.is_http_family().then(|| "/".to_string()),
            host: None,
            request: None,
            response: None,
            proxy_header: ProxyHeader::None,
            check_interval_sec: Self::DEFAULT_CHECK_INTERVAL_SEC,
            timeout_sec: Self::DEFAULT_TIMEOUT_SEC,
            healthy_threshold: Self::DEFAULT_THRESHOLD,
            unhealthy_threshold: Self::DEFAULT_THRESHOLD,
            enable_logging: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = HealthCheckPort::Fixed(port);
        self
    }

    pub fn with_request_path(mut self, path: impl Into<String>) -> Self {
        self.request_path = Some(path.into());
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Provider attributes for a health check resource named `name`.
    pub fn to_attributes(&self, name: &str, project: &str) -> Value {
        let mut block = Map::new();
        match &self.port {
            HealthCheckPort::Fixed(port) => {
                block.insert("port".into(), json!(port));
                block.insert("port_specification".into(), json!("USE_FIXED_PORT"));
            }
            HealthCheckPort::Named(port_name) => {
                block.insert("port_name".into(), json!(port_name));
                block.insert("port_specification".into(), json!("USE_NAMED_PORT"));
            }
        }
        let optional = [
            ("request_path", &self.request_path),
            ("host", &self.host),
            ("request", &self.request),
            ("response", &self.response),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                block.insert(key.into(), json!(value));
            }
        }
        block.insert("proxy_header".into(), json!(self.proxy_header.to_string()));

        let mut attributes = json!({
            "name": name,
            "project": project,
            "check_interval_sec": self.check_interval_sec,
            "timeout_sec": self.timeout_sec,
            "healthy_threshold": self.healthy_threshold,
            "unhealthy_threshold": self.unhealthy_threshold,
            "log_config": { "enable": self.enable_logging },
        });
        if let Value::Object(map) = &mut attributes {
            map.insert(self.protocol.block_name().into(), Value::Object(block));
        }
        attributes
    }
}

impl RawHealthCheckConfig {
    /// Validate into a [`HealthCheckConfig`], reporting every problem.
    pub fn validate(&self) -> Result<Validated<HealthCheckConfig>, ValidationErrors> {
        let mut v = Violations::new();

        let protocol = v
            .require("type", self.protocol.as_deref())
            .and_then(|p| v.parse_enum::<HealthProtocol>("type", p));

        v.at_most_one(
            &[
                ("port", self.port.is_some()),
                ("port_name", self.port_name.is_some()),
            ],
            "a health check probes either a fixed port or a named port",
        );
        let port = match (self.port, &self.port_name) {
            (Some(port), None) => match u16::try_from(port).ok().filter(|p| *p > 0) {
                Some(port) => Some(HealthCheckPort::Fixed(port)),
                None => {
                    v.check_range("port", false, port, "1 <= port <= 65535");
                    None
                }
            },
            (None, Some(name)) => v
                .check_name("port_name", name)
                .then(|| HealthCheckPort::Named(name.clone())),
            (None, None) => protocol.map(|p| HealthCheckPort::Fixed(p.default_port())),
            (Some(_), Some(_)) => None,
        };

        let proxy_header = v.enum_or(
            "proxy_header",
            self.proxy_header.as_deref(),
            ProxyHeader::None,
        );

        let check_interval_sec = v.int_in(
            "check_interval_sec",
            self.check_interval_sec,
            HealthCheckConfig::DEFAULT_CHECK_INTERVAL_SEC.into(),
            1..=300,
        );
        let timeout_sec = v.int_in(
            "timeout_sec",
            self.timeout_sec,
            HealthCheckConfig::DEFAULT_TIMEOUT_SEC.into(),
            1..=300,
        );
        let healthy_threshold = v.int_in(
            "healthy_threshold",
            self.healthy_threshold,
            HealthCheckConfig::DEFAULT_THRESHOLD.into(),
            1..=10,
        );
        let unhealthy_threshold = v.int_in(
            "unhealthy_threshold",
            self.unhealthy_threshold,
            HealthCheckConfig::DEFAULT_THRESHOLD.into(),
            1..=10,
        );
        if let (Some(timeout), Some(interval)) = (timeout_sec, check_interval_sec) {
            v.check_range(
                "timeout_sec",
                timeout <= interval,
                timeout,
                format!("timeout_sec <= check_interval_sec ({})", interval),
            );
        }

        let (
            Some(protocol),
            Some(port),
            Some(proxy_header),
            Some(check_interval_sec),
            Some(timeout_sec),
            Some(healthy_threshold),
            Some(unhealthy_threshold),
        ) = (
            protocol,
            port,
            proxy_header,
            check_interval_sec,
            timeout_sec,
            healthy_threshold,
            unhealthy_threshold,
        )
        else {
            return Err(v.into_errors());
        };

        let mut config = HealthCheckConfig {
            protocol,
            port,
            request_path: None,
            host: None,
            request: None,
            response: None,
            proxy_header,
            check_interval_sec: check_interval_sec as u32,
            timeout_sec: timeout_sec as u32,
            healthy_threshold: healthy_threshold as u32,
            unhealthy_threshold: unhealthy_threshold as u32,
            enable_logging: self.enable_logging.unwrap_or(false),
        };

        if protocol.is_http_family() {
            config.request_path = Some(self.request_path.clone().unwrap_or_else(|| "/".into()));
            config.host = self.host.clone();
            for (field, value) in [("request", &self.request), ("response", &self.response)] {
                if value.is_some() {
                    v.warn(format!("{} is ignored for {} health checks", field, protocol));
                }
            }
        } else {
            config.request = self.request.clone();
            config.response = self.response.clone();
            for (field, value) in [("request_path", &self.request_path), ("host", &self.host)] {
                if value.is_some() {
                    v.warn(format!("{} is ignored for {} health checks", field, protocol));
                }
            }
        }

        v.finish(config)
    }
}

/// Where a module's health check comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckSource {
    /// No health check.
    Absent,
    /// Self-link or name of a health check managed elsewhere.
    Existing(String),
    /// Create a health check from this spec.
    AutoCreate(HealthCheckConfig),
}

impl HealthCheckSource {
    pub const EXISTING_FIELD: &'static str = "health_check";
    pub const CONFIG_FIELD: &'static str = "health_check_config";

    /// Resolve the `health_check` / `health_check_config` pair.
    ///
    /// Returns `None` when a violation was recorded.
    pub fn resolve(
        v: &mut Violations,
        existing: Option<&str>,
        config: Option<&RawHealthCheckConfig>,
    ) -> Option<Self> {
        match (existing, config) {
            (Some(_), Some(config)) => {
                v.push(ValidationError::ConflictingOptions {
                    fields: vec![Self::EXISTING_FIELD.into(), Self::CONFIG_FIELD.into()],
                    reason: "reference an existing health check or request a new one, not both"
                        .into(),
                });
                // Still surface problems inside the requested config.
                v.absorb(Self::CONFIG_FIELD, config.validate());
                None
            }
            (Some(reference), None) => {
                if reference.trim().is_empty() {
                    v.push(ValidationError::InvalidFormat {
                        field: Self::EXISTING_FIELD.into(),
                        value: reference.into(),
                        expected: "health check name or self-link".into(),
                    });
                    return None;
                }
                Some(HealthCheckSource::Existing(reference.to_string()))
            }
            (None, Some(config)) => v
                .absorb(Self::CONFIG_FIELD, config.validate())
                .map(HealthCheckSource::AutoCreate),
            (None, None) => Some(HealthCheckSource::Absent),
        }
    }

    pub fn is_auto_create(&self) -> bool {
        matches!(self, HealthCheckSource::AutoCreate(_))
    }
}

/// Declare a health check resource.
pub fn compose_health_check(name: &str, project: &str, config: &HealthCheckConfig) -> ResourceDecl {
    ResourceDecl::new(
        ResourceAddress::new(ResourceKind::HealthCheck, name),
        config.to_attributes(name, project),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(protocol: &str) -> RawHealthCheckConfig {
        RawHealthCheckConfig {
            protocol: Some(protocol.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = raw("http").validate().unwrap().value;
        assert_eq!(config, HealthCheckConfig::new(HealthProtocol::Http));
        assert_eq!(config.request_path.as_deref(), Some("/"));
        assert_eq!(config.port, HealthCheckPort::Fixed(80));
    }

    #[test]
    fn test_unknown_protocol() {
        let errors = raw("icmp").validate().unwrap_err();
        match errors.iter().next() {
            Some(ValidationError::InvalidEnumValue { field, allowed, .. }) => {
                assert_eq!(field, "type");
                assert_eq!(allowed.len(), 5);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_longer_than_interval_rejected() {
        let mut config = raw("tcp");
        config.check_interval_sec = Some(5);
        config.timeout_sec = Some(10);
        let errors = config.validate().unwrap_err();
        assert!(errors.mentions("timeout_sec"));
    }

    #[test]
    fn test_collects_multiple_errors() {
        let config = RawHealthCheckConfig {
            protocol: None,
            port: Some(70000),
            healthy_threshold: Some(0),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.mentions("type"));
        assert!(errors.mentions("port"));
        assert!(errors.mentions("healthy_threshold"));
    }

    #[test]
    fn test_inapplicable_fields_dropped_with_warning() {
        let mut config = raw("tcp");
        config.request_path = Some("/healthz".into());
        let validated = config.validate().unwrap();
        assert!(validated.value.request_path.is_none());
        assert_eq!(validated.warnings.len(), 1);
    }

    #[test]
    fn test_source_conflict() {
        let mut v = Violations::new();
        let source = HealthCheckSource::resolve(&mut v, Some("existing"), Some(&raw("http")));
        assert!(source.is_none());
        assert!(matches!(
            v.errors()[0],
            ValidationError::ConflictingOptions { .. }
        ));
    }

    #[test]
    fn test_source_absent_is_valid() {
        let mut v = Violations::new();
        assert_eq!(
            HealthCheckSource::resolve(&mut v, None, None),
            Some(HealthCheckSource::Absent)
        );
        assert!(v.is_empty());
    }

    #[test]
    fn test_attributes_use_protocol_block() {
        let config = HealthCheckConfig::new(HealthProtocol::Tcp).with_port(8080);
        let decl = compose_health_check("web-hc", "proj", &config);
        assert_eq!(decl.attributes["tcp_health_check"]["port"], 8080);
        assert_eq!(decl.attributes["log_config"]["enable"], false);
        assert!(decl.attributes.get("http_health_check").is_none());
    }
}
