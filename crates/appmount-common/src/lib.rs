//! # appmount-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the appmount workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and performs no mount compilation itself.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
