//! Validated managed instance group model.
//!
//! Values of these types only come out of the validator, so every invariant
//! listed on a type holds for any instance a caller can observe.

use gcpmod_core::{config_enum, HealthCheckSource};

/// Scheduling domain of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Zonal {
        zone: String,
    },
    Regional {
        region: String,
        /// Empty means the provider picks the zones.
        distribution_zones: Vec<String>,
    },
}

impl Location {
    pub fn is_regional(&self) -> bool {
        matches!(self, Location::Regional { .. })
    }

    /// Provider attribute carrying the location (`zone` or `region`).
    pub fn attribute(&self) -> (&'static str, &str) {
        match self {
            Location::Zonal { zone } => ("zone", zone),
            Location::Regional { region, .. } => ("region", region),
        }
    }

    /// Region the group lives in; a zone's region is its name without the
    /// trailing zone letter.
    pub fn region(&self) -> &str {
        match self {
            Location::Zonal { zone } => zone
                .rsplit_once('-')
                .map_or(zone.as_str(), |(region, _)| region),
            Location::Regional { region, .. } => region,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPort {
    pub name: String,
    pub port: u16,
}

config_enum! {
    /// How a version's `target_size` is expressed.
    pub enum TargetType {
        Fixed => "fixed",
        Percent => "percent",
    }
}

/// Share of the group a version receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionTarget {
    Fixed(u32),
    Percent(u8),
    /// Whatever the other versions leave over.
    Remainder,
}

/// One instance template and its allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub name: String,
    pub instance_template: String,
    pub target: VersionTarget,
}

config_enum! {
    pub enum UpdateType {
        Proactive => "PROACTIVE",
        Opportunistic => "OPPORTUNISTIC",
    }
}

config_enum! {
    /// Update actions, ordered from least to most disruptive.
    pub enum UpdateAction {
        None => "NONE",
        Refresh => "REFRESH",
        Restart => "RESTART",
        Replace => "REPLACE",
    }
}

config_enum! {
    pub enum ReplacementMethod {
        Substitute => "SUBSTITUTE",
        Recreate => "RECREATE",
    }
}

/// Surge or unavailability allowance during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowance {
    Fixed(u32),
    Percent(u8),
}

impl Allowance {
    pub fn is_zero(&self) -> bool {
        matches!(self, Allowance::Fixed(0) | Allowance::Percent(0))
    }
}

/// Rolling update policy.
///
/// `minimal_action <= most_disruptive_allowed_action`, and a `Recreate`
/// replacement never surges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePolicy {
    pub update_type: UpdateType,
    pub minimal_action: UpdateAction,
    pub most_disruptive_allowed_action: Option<UpdateAction>,
    pub replacement_method: ReplacementMethod,
    pub max_surge: Option<Allowance>,
    pub max_unavailable: Option<Allowance>,
    pub min_ready_sec: Option<u32>,
}

/// Recreate instances that fail their health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoHealingPolicy {
    /// Never [`HealthCheckSource::Absent`].
    pub health_check: HealthCheckSource,
    pub initial_delay_sec: u32,
}

config_enum! {
    pub enum AutoscalerMode {
        On => "ON",
        Off => "OFF",
        OnlyUp => "ONLY_UP",
    }
}

config_enum! {
    pub enum MetricTargetType {
        Gauge => "GAUGE",
        DeltaPerSecond => "DELTA_PER_SECOND",
        DeltaPerMinute => "DELTA_PER_MINUTE",
    }
}

/// The single signal an autoscaler follows.
#[derive(Debug, Clone, PartialEq)]
pub enum UtilizationSignal {
    Cpu {
        target: f64,
    },
    LoadBalancing {
        target: f64,
    },
    Metric {
        name: String,
        target: f64,
        target_type: MetricTargetType,
    },
}

impl UtilizationSignal {
    /// Provider default when no signal is configured.
    pub const DEFAULT_CPU_TARGET: f64 = 0.6;
}

impl Default for UtilizationSignal {
    fn default() -> Self {
        UtilizationSignal::Cpu {
            target: Self::DEFAULT_CPU_TARGET,
        }
    }
}

/// Autoscaling policy. `min_replicas <= max_replicas`.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoscalerConfig {
    pub(crate) name: String,
    pub(crate) min_replicas: u32,
    pub(crate) max_replicas: u32,
    pub(crate) cooldown_period: u32,
    pub(crate) mode: AutoscalerMode,
    pub(crate) signal: UtilizationSignal,
}

impl AutoscalerConfig {
    pub const DEFAULT_MIN_REPLICAS: u32 = 1;
    pub const DEFAULT_MAX_REPLICAS: u32 = 10;
    pub const DEFAULT_COOLDOWN_PERIOD: u32 = 60;

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_replicas(&self) -> u32 {
        self.min_replicas
    }

    pub fn max_replicas(&self) -> u32 {
        self.max_replicas
    }

    pub fn cooldown_period(&self) -> u32 {
        self.cooldown_period
    }

    pub fn mode(&self) -> AutoscalerMode {
        self.mode
    }

    pub fn signal(&self) -> &UtilizationSignal {
        &self.signal
    }
}

/// Desired state of a managed instance group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupConfig {
    pub(crate) name: String,
    pub(crate) project: String,
    pub(crate) location: Location,
    pub(crate) base_instance_name: String,
    pub(crate) instance_template: Option<String>,
    pub(crate) target_size: u32,
    pub(crate) target_pools: Vec<String>,
    pub(crate) named_ports: Vec<NamedPort>,
    pub(crate) versions: Vec<Version>,
    pub(crate) update_policy: Option<UpdatePolicy>,
    pub(crate) auto_healing: Option<AutoHealingPolicy>,
    pub(crate) autoscaler: Option<AutoscalerConfig>,
    pub(crate) wait_for_instances: bool,
}

impl GroupConfig {
    pub const DEFAULT_TARGET_SIZE: u32 = 1;
    pub const DEFAULT_INITIAL_DELAY_SEC: u32 = 300;

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn base_instance_name(&self) -> &str {
        &self.base_instance_name
    }

    /// Template used when no explicit versions are configured.
    pub fn instance_template(&self) -> Option<&str> {
        self.instance_template.as_deref()
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    pub fn target_pools(&self) -> &[String] {
        &self.target_pools
    }

    pub fn named_ports(&self) -> &[NamedPort] {
        &self.named_ports
    }

    /// Explicit versions. Empty when the group runs a single template.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn update_policy(&self) -> Option<&UpdatePolicy> {
        self.update_policy.as_ref()
    }

    pub fn auto_healing(&self) -> Option<&AutoHealingPolicy> {
        self.auto_healing.as_ref()
    }

    pub fn autoscaler(&self) -> Option<&AutoscalerConfig> {
        self.autoscaler.as_ref()
    }

    /// Passed through to the provider.
    pub fn wait_for_instances(&self) -> bool {
        self.wait_for_instances
    }

    /// Health check requested by the auto-healing policy.
    pub fn health_check(&self) -> &HealthCheckSource {
        const ABSENT: &HealthCheckSource = &HealthCheckSource::Absent;
        self.auto_healing
            .as_ref()
            .map(|p| &p.health_check)
            .unwrap_or(ABSENT)
    }
}
