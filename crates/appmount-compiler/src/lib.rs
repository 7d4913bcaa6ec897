//! # appmount-compiler
//!
//! Compiler for the containerData mount language.
//!
//! Handles:
//! - **Parser**: Tokenization, per-token grammar rules, and validation of containerData strings.
//! - **Volume**: Host-path resolution and emission of runtime bind mounts.
//! - **Graph**: Cross-component reference graph and creation order.
//! - **Policy**: Restart policy and replication helpers derived from the mount list.
//! - **Compiler**: Configured entry point tying the stages together.

pub mod compiler;
pub mod graph;
pub mod parser;
pub mod policy;
pub mod volume;

pub use compiler::MountCompiler;
pub use parser::parse_container_data;
pub use volume::{MountMode, MountSpec, PlatformNaming, VolumeContext, construct_volumes};
