//! Unified error types for the appmount workspace.
//!
//! Every failure is deterministic and input-dependent: retrying a call with
//! the same containerData and application specification yields the same error.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum MountError {
    /// A token does not match any known grammar rule or has the wrong arity.
    #[error("mount syntax error in token {index} (\"{token}\"): {reason}")]
    Syntax {
        /// Zero-based position of the token in the containerData string.
        index: usize,
        /// Raw token text.
        token: String,
        /// Description of the violation.
        reason: String,
    },

    /// A container path or subdirectory/filename failed a safety check.
    #[error("unsafe path in token {index} (\"{token}\"): {reason}")]
    UnsafePath {
        /// Zero-based position of the token in the containerData string.
        index: usize,
        /// Raw token text.
        token: String,
        /// Description of the violation.
        reason: String,
    },

    /// Seed content of a file mount is malformed or too large.
    #[error("invalid file content in token {index}: {reason}")]
    Content {
        /// Zero-based position of the token in the containerData string.
        index: usize,
        /// Description of the violation.
        reason: String,
    },

    /// Two mounts target the same path inside the container.
    #[error("duplicate container path in token {index}: \"{path}\"")]
    DuplicateContainerPath {
        /// Position of the token that repeats the path.
        index: usize,
        /// The repeated container path.
        path: String,
    },

    /// Two local mounts share the same subdirectory or filename.
    #[error("duplicate local subdirectory or filename in token {index}: \"{name}\"")]
    DuplicateLocalName {
        /// Position of the token that repeats the name.
        index: usize,
        /// The repeated name.
        name: String,
    },

    /// A component reference was used without the full application specification.
    #[error(
        "component reference to index {referenced} requires the full application specification"
    )]
    MissingAppSpec {
        /// Referenced component index.
        referenced: usize,
    },

    /// A component reference points past the end of the compose list.
    #[error("component reference index {index} out of range (application has {count} components)")]
    ReferenceOutOfRange {
        /// Referenced component index.
        index: usize,
        /// Number of components in the composed application.
        count: usize,
    },

    /// A component references itself or a component declared after it.
    #[error(
        "component {current} cannot reference component {referenced}: only components declared earlier may be referenced"
    )]
    ReferenceOrder {
        /// Index of the component being compiled.
        current: usize,
        /// Referenced component index.
        referenced: usize,
    },

    /// A single-component application referenced anything but itself.
    #[error("legacy application may only reference component 0, got {index}")]
    LegacyReference {
        /// Referenced component index.
        index: usize,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// YAML configuration could not be parsed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MountError>;
