//! Configured entry point: containerData in, runtime mount specifications out.

use appmount_common::config::CompilerConfig;
use appmount_common::error::Result;
use appmount_common::types::RestartPolicy;

use crate::parser::ast::ParsedContainerData;
use crate::parser::parse_container_data;
use crate::policy;
use crate::volume::{self, MountMode, MountSpec, PlatformNaming, PrefixNaming, VolumeContext};

/// Mount compiler bound to a configuration and a naming transform.
///
/// Holds no mutable state; one instance can serve concurrent compilations.
#[derive(Debug, Clone)]
pub struct MountCompiler<N = PrefixNaming> {
    config: CompilerConfig,
    naming: N,
}

impl MountCompiler<PrefixNaming> {
    /// Creates a compiler that names host directories with the configured prefix.
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        let naming = PrefixNaming::from_config(&config);
        Self { config, naming }
    }
}

impl<N: PlatformNaming> MountCompiler<N> {
    /// Creates a compiler with a caller-supplied naming transform.
    #[must_use]
    pub const fn with_naming(config: CompilerConfig, naming: N) -> Self {
        Self { config, naming }
    }

    /// The active configuration.
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Parses `container_data` and resolves it to mount specifications in the
    /// configured output form.
    ///
    /// # Errors
    ///
    /// Returns the first parse, path-safety, or reference error encountered.
    pub fn compile(&self, container_data: &str, ctx: &VolumeContext<'_>) -> Result<Vec<MountSpec>> {
        let parsed = parse_container_data(container_data)?;
        self.construct(&parsed, ctx, MountMode::from_modern(self.config.modern_mounts))
    }

    /// Resolves an already parsed mount list in the requested form.
    ///
    /// # Errors
    ///
    /// Returns an error if a component reference cannot be resolved.
    pub fn construct(
        &self,
        parsed: &ParsedContainerData,
        ctx: &VolumeContext<'_>,
        mode: MountMode,
    ) -> Result<Vec<MountSpec>> {
        volume::construct_volumes(parsed, ctx, &self.config.apps_root, &self.naming, mode)
    }

    /// Restart policy for the component owning `parsed`.
    pub fn restart_policy(&self, parsed: &ParsedContainerData, owner: &str) -> RestartPolicy {
        policy::restart_policy(parsed.primary().flags(), owner, &self.config)
    }
}
