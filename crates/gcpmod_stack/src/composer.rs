//! Joint composition of a group and the balancer in front of it.

use tracing::{debug, info};

use gcpmod_core::{Composition, HealthCheckSource, OutputMap};
use gcpmod_ilb::IlbComposer;
use gcpmod_mig::MigComposer;

use crate::config::{StackConfig, ValidatedStack, BALANCER_SECTION, GROUP_SECTION};
use crate::error::StackResult;

/// Everything composed for a stack.
#[derive(Debug, Clone)]
pub struct StackPlan {
    pub composition: Composition,
    /// Outputs keyed `group_<name>` and `balancer_<name>`.
    pub outputs: OutputMap,
    pub warnings: Vec<String>,
}

/// Compose a validated stack.
///
/// When both sections auto-create a health check, the group's is declared
/// and the balancer references it.
pub fn compose(stack: &ValidatedStack) -> StackResult<StackPlan> {
    let mut composition = Composition::new();
    let mut outputs = OutputMap::new();
    let mut shared = None;

    if let Some(group) = &stack.group {
        let plan = MigComposer::new(group).compose()?;
        if stack.shares_health_check() {
            let spec = match group.health_check() {
                HealthCheckSource::AutoCreate(spec) => Some(spec),
                _ => None,
            };
            shared = plan.outputs.health_check.clone().map(|handle| (handle, spec));
        }
        composition.merge(plan.composition)?;
        extend_outputs(&mut outputs, GROUP_SECTION, plan.outputs.to_map());
    }

    if let Some(balancer) = &stack.balancer {
        let mut composer = IlbComposer::new(balancer);
        if let Some((handle, spec)) = shared {
            info!("Sharing health check {} with balancer {}", handle, balancer.name());
            composer = composer.with_health_check(handle, spec);
        }
        let plan = composer.compose()?;
        composition.merge(plan.composition)?;
        extend_outputs(&mut outputs, BALANCER_SECTION, plan.outputs.to_map());
    }

    // Surface dangling references and cycles before anything is rendered.
    let ordered = composition.ordered()?.len();
    debug!("Stack composes {} resources", ordered);

    Ok(StackPlan {
        composition,
        outputs,
        warnings: Vec::new(),
    })
}

/// Validate and compose a stack document.
pub fn plan(config: &StackConfig) -> StackResult<StackPlan> {
    let validated = config.validate()?;
    let mut plan = compose(&validated.value)?;
    plan.warnings = validated.warnings;
    Ok(plan)
}

fn extend_outputs(outputs: &mut OutputMap, section: &str, section_outputs: OutputMap) {
    outputs.extend(
        section_outputs
            .into_iter()
            .map(|(name, handle)| (format!("{}_{}", section, name), handle)),
    );
}
