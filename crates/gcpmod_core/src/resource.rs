//! Resource declarations and the handles that refer to them.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Provider resource types gcpmod can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    HealthCheck,
    InstanceGroupManager,
    RegionInstanceGroupManager,
    Autoscaler,
    RegionAutoscaler,
    RegionBackendService,
    ForwardingRule,
    Firewall,
}

impl ResourceKind {
    /// Get the Terraform resource type name.
    pub fn terraform_type(&self) -> &'static str {
        match self {
            ResourceKind::HealthCheck => "google_compute_health_check",
            ResourceKind::InstanceGroupManager => "google_compute_instance_group_manager",
            ResourceKind::RegionInstanceGroupManager => {
                "google_compute_region_instance_group_manager"
            }
            ResourceKind::Autoscaler => "google_compute_autoscaler",
            ResourceKind::RegionAutoscaler => "google_compute_region_autoscaler",
            ResourceKind::RegionBackendService => "google_compute_region_backend_service",
            ResourceKind::ForwardingRule => "google_compute_forwarding_rule",
            ResourceKind::Firewall => "google_compute_firewall",
        }
    }

    pub fn from_terraform_type(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|k| k.terraform_type() == s)
    }

    pub fn all() -> Vec<Self> {
        vec![
            ResourceKind::HealthCheck,
            ResourceKind::InstanceGroupManager,
            ResourceKind::RegionInstanceGroupManager,
            ResourceKind::Autoscaler,
            ResourceKind::RegionAutoscaler,
            ResourceKind::RegionBackendService,
            ResourceKind::ForwardingRule,
            ResourceKind::Firewall,
        ]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.terraform_type())
    }
}

/// Address of a declared resource: its type plus its local label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceAddress {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceAddress {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Handle to an attribute of this resource.
    pub fn handle(&self, attribute: impl Into<String>) -> Handle {
        Handle::Composed {
            address: self.clone(),
            attribute: attribute.into(),
        }
    }

    pub fn self_link(&self) -> Handle {
        self.handle("self_link")
    }

    pub fn id(&self) -> Handle {
        self.handle("id")
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind.terraform_type(), self.name)
    }
}

impl Serialize for ResourceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Opaque reference to a resource, either one composed here or one that
/// already exists outside this module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Handle {
    Composed {
        address: ResourceAddress,
        attribute: String,
    },
    External(String),
}

impl Handle {
    pub fn external(reference: impl Into<String>) -> Self {
        Handle::External(reference.into())
    }

    /// Terraform expression for this handle.
    pub fn expression(&self) -> String {
        match self {
            Handle::Composed { address, attribute } => format!("${{{}.{}}}", address, attribute),
            Handle::External(reference) => reference.clone(),
        }
    }

    pub fn is_composed(&self) -> bool {
        matches!(self, Handle::Composed { .. })
    }

    pub fn address(&self) -> Option<&ResourceAddress> {
        match self {
            Handle::Composed { address, .. } => Some(address),
            Handle::External(_) => None,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.expression())
    }
}

/// A single resource declaration handed to the provisioning engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDecl {
    pub address: ResourceAddress,
    pub attributes: Value,
    pub depends_on: Vec<ResourceAddress>,
}

impl ResourceDecl {
    pub fn new(address: ResourceAddress, attributes: Value) -> Self {
        Self {
            address,
            attributes,
            depends_on: Vec::new(),
        }
    }

    /// Declare an ordering dependency on another resource.
    pub fn depends_on(mut self, address: &ResourceAddress) -> Self {
        if !self.depends_on.contains(address) {
            self.depends_on.push(address.clone());
        }
        self
    }

    /// Add a dependency when `handle` points at a composed resource.
    pub fn depends_on_handle(self, handle: &Handle) -> Self {
        match handle.address() {
            Some(address) => self.depends_on(address),
            None => self,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.address.kind
    }
}
