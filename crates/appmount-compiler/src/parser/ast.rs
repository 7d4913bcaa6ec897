//! Abstract Syntax Tree for parsed containerData strings.

use appmount_common::constants::PRIMARY_SUBDIR;
use appmount_common::error::{MountError, Result};
use appmount_common::types::MountFlags;
use base64::Engine as _;

/// Closed set of mount kinds, without per-kind payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountType {
    /// The component's own `appdata` directory.
    Primary,
    /// A named directory of the component.
    Directory,
    /// A named file of the component.
    File,
    /// Another component's `appdata` directory.
    ComponentPrimary,
    /// A named directory of another component.
    ComponentDirectory,
    /// A named file of another component.
    ComponentFile,
}

impl MountType {
    /// Returns true for mounts backed by the current component's own host paths.
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Primary | Self::Directory | Self::File)
    }

    /// Returns true for mounts that borrow another component's host path.
    #[must_use]
    pub const fn is_component_reference(self) -> bool {
        !self.is_local()
    }

    /// Returns true for single-file mounts.
    #[must_use]
    pub const fn is_file(self) -> bool {
        matches!(self, Self::File | Self::ComponentFile)
    }
}

/// Per-kind payload of a parsed mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountKind {
    /// First token. Carries the replication flags.
    Primary {
        /// Replication markers.
        flags: MountFlags,
    },
    /// `m:<subdir>:<path>`.
    Directory,
    /// `f:<filename>:<path>[:<base64>]`.
    File {
        /// Base64 seed content, if any.
        content: Option<String>,
    },
    /// `<index>:<path>`.
    ComponentPrimary {
        /// Referenced component position in the compose list.
        component_index: usize,
    },
    /// `c:<index>:<subdir>:<path>`.
    ComponentDirectory {
        /// Referenced component position in the compose list.
        component_index: usize,
    },
    /// `cf:<index>:<filename>:<path>`.
    ComponentFile {
        /// Referenced component position in the compose list.
        component_index: usize,
    },
}

/// One parsed mount token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMount {
    /// Kind and kind-specific payload.
    pub kind: MountKind,
    /// Directory or filename under the owning component's data root.
    /// Always `appdata` for primary and component-primary mounts.
    pub subdir: String,
    /// Absolute path inside the container.
    pub container_path: String,
}

static NO_FLAGS: MountFlags = MountFlags::new();

impl ParsedMount {
    pub(crate) fn primary(flags: MountFlags, container_path: &str) -> Self {
        Self {
            kind: MountKind::Primary { flags },
            subdir: PRIMARY_SUBDIR.to_owned(),
            container_path: container_path.to_owned(),
        }
    }

    /// Returns the payload-free mount type.
    #[must_use]
    pub const fn mount_type(&self) -> MountType {
        match self.kind {
            MountKind::Primary { .. } => MountType::Primary,
            MountKind::Directory => MountType::Directory,
            MountKind::File { .. } => MountType::File,
            MountKind::ComponentPrimary { .. } => MountType::ComponentPrimary,
            MountKind::ComponentDirectory { .. } => MountType::ComponentDirectory,
            MountKind::ComponentFile { .. } => MountType::ComponentFile,
        }
    }

    /// Returns true for single-file mounts.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        self.mount_type().is_file()
    }

    /// Replication flags. Empty for every mount but the primary.
    #[must_use]
    pub fn flags(&self) -> &MountFlags {
        match &self.kind {
            MountKind::Primary { flags } => flags,
            _ => &NO_FLAGS,
        }
    }

    /// Base64 seed content of a local file mount.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            MountKind::File { content } => content.as_deref(),
            _ => None,
        }
    }

    /// Referenced component index for component-reference mounts.
    #[must_use]
    pub const fn component_index(&self) -> Option<usize> {
        match self.kind {
            MountKind::ComponentPrimary { component_index }
            | MountKind::ComponentDirectory { component_index }
            | MountKind::ComponentFile { component_index } => Some(component_index),
            _ => None,
        }
    }
}

/// Root of a parsed containerData string.
///
/// Built once per compilation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContainerData {
    primary: ParsedMount,
    additional: Vec<ParsedMount>,
}

impl ParsedContainerData {
    pub(crate) const fn new(primary: ParsedMount, additional: Vec<ParsedMount>) -> Self {
        Self {
            primary,
            additional,
        }
    }

    /// The first token's mount.
    #[must_use]
    pub const fn primary(&self) -> &ParsedMount {
        &self.primary
    }

    /// Mounts from the second token onwards.
    #[must_use]
    pub fn additional(&self) -> &[ParsedMount] {
        &self.additional
    }

    /// All mounts in token order, primary first.
    pub fn all_mounts(&self) -> impl Iterator<Item = &ParsedMount> {
        std::iter::once(&self.primary).chain(&self.additional)
    }

    /// Number of mounts, primary included.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.additional.len()
    }

    /// Always false: a parsed containerData has at least the primary mount.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// A host path that must exist before the container is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredPath {
    /// Directory or filename under the component's data root.
    pub name: String,
    /// Whether a file (rather than a directory) must be created.
    pub is_file: bool,
    /// Base64 seed content. `None` means an empty file.
    pub content: Option<String>,
}

impl RequiredPath {
    /// Decodes the seed content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid base64. Parsed content has
    /// already been validated, so this only fails for hand-built values.
    pub fn decoded_content(&self) -> Result<Option<Vec<u8>>> {
        self.content
            .as_deref()
            .map(|encoded| {
                CONTENT_ENGINE
                    .decode(encoded)
                    .map_err(|e| MountError::Content {
                        index: 0,
                        reason: format!("\"{}\": {e}", self.name),
                    })
            })
            .transpose()
    }
}

/// Standard alphabet, padding optional, as accepted on the wire.
pub(crate) const CONTENT_ENGINE: base64::engine::GeneralPurpose =
    base64::engine::GeneralPurpose::new(
        &base64::alphabet::STANDARD,
        base64::engine::GeneralPurposeConfig::new()
            .with_decode_padding_mode(base64::engine::DecodePaddingMode::Indifferent)
            .with_decode_allow_trailing_bits(true),
    );
