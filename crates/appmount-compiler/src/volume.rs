//! Host-path resolution and bind-mount emission.
//!
//! Turns a parsed mount list into the mount specifications the container
//! runtime receives, resolving component references against the composed
//! application they belong to.

use std::path::Path;

use appmount_common::config::CompilerConfig;
use appmount_common::constants::{BIND_MOUNT_TYPE, BIND_PROPAGATION};
use appmount_common::error::{MountError, Result};
use appmount_common::types::{AppSpec, ComponentSpec, component_identifier};
use serde::{Deserialize, Serialize};

use crate::parser::ast::{ParsedContainerData, ParsedMount};

/// Platform naming convention applied to component identifiers before they
/// become host directory names.
pub trait PlatformNaming {
    /// Maps a component identifier to its platform-wide name.
    fn platform_id(&self, identifier: &str) -> String;
}

impl<F> PlatformNaming for F
where
    F: Fn(&str) -> String,
{
    fn platform_id(&self, identifier: &str) -> String {
        self(identifier)
    }
}

/// Prepends a fixed prefix unless the identifier already carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixNaming {
    prefix: String,
}

impl PrefixNaming {
    /// Creates a naming transform with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Creates the naming transform described by `config`.
    #[must_use]
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.name_prefix.clone())
    }
}

impl PlatformNaming for PrefixNaming {
    fn platform_id(&self, identifier: &str) -> String {
        if identifier.starts_with(&self.prefix) {
            identifier.to_owned()
        } else {
            format!("{}{identifier}", self.prefix)
        }
    }
}

/// Output representation requested by the runtime driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MountMode {
    /// Structured bind mounts.
    #[default]
    Modern,
    /// `"<host>:<container>"` strings.
    Legacy,
}

impl MountMode {
    /// Selects the mode from a "use modern mounts" switch.
    #[must_use]
    pub const fn from_modern(modern: bool) -> Self {
        if modern { Self::Modern } else { Self::Legacy }
    }
}

/// Propagation options of a bind mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BindOptions {
    /// Mount propagation mode.
    pub propagation: String,
}

/// A structured bind mount in the runtime's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BindMount {
    /// Always `bind`.
    #[serde(rename = "Type")]
    pub mount_type: String,
    /// Host path.
    pub source: String,
    /// Container path.
    pub target: String,
    /// Always false.
    pub read_only: bool,
    /// Always `rprivate` propagation.
    pub bind_options: BindOptions,
}

impl BindMount {
    /// Creates a read-write, privately propagated bind mount.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            mount_type: BIND_MOUNT_TYPE.to_owned(),
            source: source.into(),
            target: target.into(),
            read_only: false,
            bind_options: BindOptions {
                propagation: BIND_PROPAGATION.to_owned(),
            },
        }
    }
}

/// One mount specification handed to the container runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MountSpec {
    /// Structured bind mount.
    Bind(BindMount),
    /// `"<host>:<container>"` string.
    Legacy(String),
}

impl MountSpec {
    /// The structured mount, if this spec is one.
    #[must_use]
    pub const fn as_bind(&self) -> Option<&BindMount> {
        match self {
            Self::Bind(bind) => Some(bind),
            Self::Legacy(_) => None,
        }
    }

    /// The legacy string, if this spec is one.
    #[must_use]
    pub fn as_legacy(&self) -> Option<&str> {
        match self {
            Self::Legacy(bind) => Some(bind),
            Self::Bind(_) => None,
        }
    }
}

/// The component being compiled and the application it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct VolumeContext<'a> {
    /// `"<component>_<app>"`, or the application name for single-component apps.
    pub identifier: &'a str,
    /// Application name.
    pub app_name: &'a str,
    /// Full application specification. Required when any mount references a component.
    pub app_spec: Option<&'a AppSpec>,
    /// The compiled component's own specification, used to find its index.
    pub component: Option<&'a ComponentSpec>,
}

impl<'a> VolumeContext<'a> {
    /// Context for a component of a composed application.
    #[must_use]
    pub fn composed(
        identifier: &'a str,
        app_spec: &'a AppSpec,
        component: &'a ComponentSpec,
    ) -> Self {
        Self {
            identifier,
            app_name: app_spec.name.as_str(),
            app_spec: Some(app_spec),
            component: Some(component),
        }
    }

    /// Context for a component compiled without application information.
    #[must_use]
    pub const fn standalone(identifier: &'a str, app_name: &'a str) -> Self {
        Self {
            identifier,
            app_name,
            app_spec: None,
            component: None,
        }
    }

    /// Index of the compiled component in the compose list, when it can be determined.
    ///
    /// Uses the component specification if present, otherwise strips the
    /// `_<app>` suffix from the identifier.
    pub fn current_index(&self) -> Option<usize> {
        let app = self.app_spec?;
        if !app.is_composed() {
            return None;
        }
        let name = match self.component {
            Some(component) => component.name.as_str(),
            None => self
                .identifier
                .strip_suffix(self.app_name)?
                .strip_suffix('_')?,
        };
        app.component_index(name)
    }
}

/// Checks a component reference and returns the referenced component's identifier.
///
/// For composed applications the index must be inside the compose list and,
/// when the current index is known, strictly lower than it. Every reference
/// therefore points at an earlier component, so references never form a
/// cycle and declaration order is a valid creation order. Legacy applications
/// may only reference index 0, which is themselves.
///
/// # Errors
///
/// Returns an error if the index is out of range or violates the ordering rule.
pub fn validate_and_get_component_identifier(
    ref_index: usize,
    current_index: Option<usize>,
    app_spec: &AppSpec,
    app_name: &str,
) -> Result<String> {
    if !app_spec.is_composed() {
        if ref_index != 0 {
            return Err(MountError::LegacyReference { index: ref_index });
        }
        return Ok(app_name.to_owned());
    }

    let component = app_spec
        .compose
        .get(ref_index)
        .ok_or(MountError::ReferenceOutOfRange {
            index: ref_index,
            count: app_spec.compose.len(),
        })?;
    if let Some(current) = current_index {
        if current <= ref_index {
            return Err(MountError::ReferenceOrder {
                current,
                referenced: ref_index,
            });
        }
    }
    Ok(component_identifier(&component.name, app_name))
}

fn host_path(
    apps_root: &Path,
    naming: &dyn PlatformNaming,
    identifier: &str,
    subdir: &str,
) -> String {
    apps_root
        .join(naming.platform_id(identifier))
        .join(subdir)
        .to_string_lossy()
        .into_owned()
}

fn owning_identifier(
    mount: &ParsedMount,
    ctx: &VolumeContext<'_>,
    current_index: Option<usize>,
) -> Result<String> {
    match mount.component_index() {
        None => Ok(ctx.identifier.to_owned()),
        Some(ref_index) => {
            let Some(app) = ctx.app_spec else {
                return Err(MountError::MissingAppSpec {
                    referenced: ref_index,
                });
            };
            validate_and_get_component_identifier(ref_index, current_index, app, ctx.app_name)
        }
    }
}

/// Resolves every parsed mount to a host path and emits it in `mode`'s form,
/// preserving token order.
///
/// # Errors
///
/// Returns an error if a component reference is present without the full
/// application specification, or if a referenced index is invalid.
pub fn construct_volumes(
    parsed: &ParsedContainerData,
    ctx: &VolumeContext<'_>,
    apps_root: &Path,
    naming: &dyn PlatformNaming,
    mode: MountMode,
) -> Result<Vec<MountSpec>> {
    tracing::info!(
        identifier = %ctx.identifier,
        mounts = parsed.len(),
        ?mode,
        "constructing volumes"
    );
    let current_index = ctx.current_index();

    parsed
        .all_mounts()
        .map(|mount| -> Result<MountSpec> {
            let owner = owning_identifier(mount, ctx, current_index)?;
            let source = host_path(apps_root, naming, &owner, &mount.subdir);
            tracing::debug!(
                source = %source,
                target = %mount.container_path,
                kind = ?mount.mount_type(),
                "resolved mount"
            );
            Ok(match mode {
                MountMode::Modern => {
                    MountSpec::Bind(BindMount::new(source, mount.container_path.clone()))
                }
                MountMode::Legacy => {
                    MountSpec::Legacy(format!("{source}:{}", mount.container_path))
                }
            })
        })
        .collect()
}

/// Renders mount specifications as the JSON array the runtime API accepts.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn mounts_to_json(mounts: &[MountSpec]) -> Result<String> {
    Ok(serde_json::to_string(mounts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_container_data;

    const ROOT: &str = "/var/lib/apps";

    fn three_component_app() -> AppSpec {
        AppSpec {
            name: "app1".into(),
            version: 8,
            compose: vec![
                ComponentSpec::new("db", "/data"),
                ComponentSpec::new("api", "/srv|0:/db"),
                ComponentSpec::new("web", "/www|c:1:uploads:/uploads"),
            ],
            ..AppSpec::default()
        }
    }

    fn naming() -> PrefixNaming {
        PrefixNaming::new("flux")
    }

    #[test]
    fn prefix_naming_is_idempotent() {
        let naming = naming();
        assert_eq!(naming.platform_id("web_app1"), "fluxweb_app1");
        assert_eq!(naming.platform_id("fluxweb_app1"), "fluxweb_app1");
    }

    #[test]
    fn closures_act_as_naming() {
        let upper = |id: &str| id.to_uppercase();
        assert_eq!(upper.platform_id("abc"), "ABC");
    }

    #[test]
    fn primary_mount_modern_form() {
        let parsed = parse_container_data("/data").expect("parse");
        let ctx = VolumeContext::standalone("web_app1", "app1");
        let mounts =
            construct_volumes(&parsed, &ctx, Path::new(ROOT), &naming(), MountMode::Modern)
                .expect("construct");
        assert_eq!(mounts.len(), 1);
        let bind = mounts[0].as_bind().expect("bind mount");
        assert_eq!(bind.source, "/var/lib/apps/fluxweb_app1/appdata");
        assert_eq!(bind.target, "/data");
        assert_eq!(bind.mount_type, "bind");
        assert!(!bind.read_only);
        assert_eq!(bind.bind_options.propagation, "rprivate");
    }

    #[test]
    fn legacy_form_joins_with_colon() {
        let parsed = parse_container_data("/data|m:logs:/var/log").expect("parse");
        let ctx = VolumeContext::standalone("app1", "app1");
        let mounts =
            construct_volumes(&parsed, &ctx, Path::new(ROOT), &naming(), MountMode::Legacy)
                .expect("construct");
        assert_eq!(
            mounts[0].as_legacy(),
            Some("/var/lib/apps/fluxapp1/appdata:/data")
        );
        assert_eq!(
            mounts[1].as_legacy(),
            Some("/var/lib/apps/fluxapp1/logs:/var/log")
        );
    }

    #[test]
    fn component_reference_resolves_to_referenced_component() {
        let app = three_component_app();
        let component = &app.compose[2];
        let parsed = parse_container_data(&component.container_data).expect("parse");
        let ctx = VolumeContext::composed("web_app1", &app, component);
        let mounts =
            construct_volumes(&parsed, &ctx, Path::new(ROOT), &naming(), MountMode::Modern)
                .expect("construct");
        let sources: Vec<_> = mounts
            .iter()
            .filter_map(MountSpec::as_bind)
            .map(|b| b.source.as_str())
            .collect();
        assert_eq!(
            sources,
            vec![
                "/var/lib/apps/fluxweb_app1/appdata",
                "/var/lib/apps/fluxapi_app1/uploads"
            ]
        );
    }

    #[test]
    fn forward_reference_is_rejected() {
        let app = three_component_app();
        let parsed = parse_container_data("/data|1:/api").expect("parse");
        let ctx = VolumeContext::composed("db_app1", &app, &app.compose[0]);
        let err = construct_volumes(&parsed, &ctx, Path::new(ROOT), &naming(), MountMode::Modern)
            .unwrap_err();
        assert!(
            matches!(err, MountError::ReferenceOrder { current: 0, referenced: 1 }),
            "got: {err}"
        );
    }

    #[test]
    fn self_reference_is_rejected_in_composed_app() {
        let app = three_component_app();
        let parsed = parse_container_data("/srv|c:1:cache:/cache").expect("parse");
        let ctx = VolumeContext::composed("api_app1", &app, &app.compose[1]);
        assert!(
            construct_volumes(&parsed, &ctx, Path::new(ROOT), &naming(), MountMode::Modern)
                .is_err()
        );
    }

    #[test]
    fn current_index_falls_back_to_identifier() {
        let app = three_component_app();
        let ctx = VolumeContext {
            identifier: "web_app1",
            app_name: "app1",
            app_spec: Some(&app),
            component: None,
        };
        assert_eq!(ctx.current_index(), Some(2));
    }

    #[test]
    fn missing_app_spec_is_rejected() {
        let parsed = parse_container_data("/data|0:/shared").expect("parse");
        let ctx = VolumeContext::standalone("web_app1", "app1");
        let err = construct_volumes(&parsed, &ctx, Path::new(ROOT), &naming(), MountMode::Modern)
            .unwrap_err();
        assert!(matches!(err, MountError::MissingAppSpec { referenced: 0 }), "got: {err}");
    }

    #[test]
    fn out_of_range_reference_is_rejected() {
        let app = three_component_app();
        let err = validate_and_get_component_identifier(3, None, &app, "app1").unwrap_err();
        assert!(
            matches!(err, MountError::ReferenceOutOfRange { index: 3, count: 3 }),
            "got: {err}"
        );
    }

    #[test]
    fn unknown_current_index_skips_ordering_rule() {
        let app = three_component_app();
        let id = validate_and_get_component_identifier(2, None, &app, "app1").expect("resolve");
        assert_eq!(id, "web_app1");
        assert_eq!(app.component_identifier(2), Some(id));
    }

    #[test]
    fn legacy_app_allows_only_self_reference() {
        let app = AppSpec {
            name: "solo".into(),
            version: 3,
            container_data: Some("/data|0:/mirror".into()),
            ..AppSpec::default()
        };
        assert_eq!(
            validate_and_get_component_identifier(0, None, &app, "solo").expect("self"),
            "solo"
        );
        let err = validate_and_get_component_identifier(1, None, &app, "solo").unwrap_err();
        assert!(matches!(err, MountError::LegacyReference { index: 1 }), "got: {err}");
    }

    #[test]
    fn mount_json_uses_runtime_field_names() {
        let json = mounts_to_json(&[
            MountSpec::Bind(BindMount::new("/host", "/data")),
            MountSpec::Legacy("/host:/data".into()),
        ])
        .expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value[0]["Type"], "bind");
        assert_eq!(value[0]["Source"], "/host");
        assert_eq!(value[0]["Target"], "/data");
        assert_eq!(value[0]["ReadOnly"], false);
        assert_eq!(value[0]["BindOptions"]["Propagation"], "rprivate");
        assert_eq!(value[1], "/host:/data");
    }

    #[test]
    fn mount_mode_from_switch() {
        assert_eq!(MountMode::from_modern(true), MountMode::Modern);
        assert_eq!(MountMode::from_modern(false), MountMode::Legacy);
        assert_eq!(MountMode::default(), MountMode::Modern);
    }
}
