//! Container policies derived from the parsed mount list.

use std::fmt;

use appmount_common::config::CompilerConfig;
use appmount_common::error::{MountError, Result};
use appmount_common::types::{AppSpec, ComponentSpec, MountFlags, ReplicationFlag, RestartPolicy};

use crate::parser::ast::{ParsedContainerData, ParsedMount};

/// Restart policy for a component's container.
///
/// A `g`-flagged component never restarts on its own: its lifecycle is
/// driven by the external primary/standby coordinator.
pub fn restart_policy(flags: &MountFlags, owner: &str, config: &CompilerConfig) -> RestartPolicy {
    if flags.contains(ReplicationFlag::G) {
        RestartPolicy::No
    } else if config.is_allowed_owner(owner) {
        RestartPolicy::Always
    } else {
        RestartPolicy::UnlessStopped
    }
}

/// Returns true if the primary mount carries `flag`.
pub fn has_mount_flag(parsed: &ParsedContainerData, flag: ReplicationFlag) -> bool {
    parsed.primary().flags().contains(flag)
}

/// Mounts the replication subsystem must additionally configure.
pub fn syncthing_mounts(parsed: &ParsedContainerData) -> Vec<&ParsedMount> {
    parsed
        .all_mounts()
        .filter(|m| !m.flags().is_empty())
        .collect()
}

/// Non-fatal finding from [`validate_mount_configuration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountWarning {
    /// Container path of the mount the warning is about.
    pub container_path: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for MountWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.container_path, self.message)
    }
}

/// Re-checks component references and reports replication of file mounts.
///
/// Every component reference must come with the full application
/// specification and an index inside it. A replicated component that also
/// mounts single files yields one warning per file mount; those are logged
/// and returned but never fail the call.
///
/// # Errors
///
/// Returns an error if a component reference cannot be resolved.
pub fn validate_mount_configuration(
    parsed: &ParsedContainerData,
    app_spec: Option<&AppSpec>,
    component: Option<&ComponentSpec>,
) -> Result<Vec<MountWarning>> {
    let component_name = component.map_or("", |c| c.name.as_str());

    for index in parsed.all_mounts().filter_map(ParsedMount::component_index) {
        let app = app_spec.ok_or(MountError::MissingAppSpec { referenced: index })?;
        let count = app.component_count();
        if index >= count {
            return Err(MountError::ReferenceOutOfRange { index, count });
        }
    }

    let flags = parsed.primary().flags();
    if flags.is_empty() {
        return Ok(Vec::new());
    }

    let warnings: Vec<MountWarning> = parsed
        .all_mounts()
        .filter(|m| m.is_file())
        .map(|m| MountWarning {
            container_path: m.container_path.clone(),
            message: format!("replication flags \"{flags}\" combined with a file mount"),
        })
        .collect();
    for warning in &warnings {
        tracing::warn!(component = component_name, %warning, "replicated file mount");
    }
    Ok(warnings)
}
