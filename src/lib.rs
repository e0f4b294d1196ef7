//! keel - per-target property resolution for native build generators
//!
//! This crate provides the library behind the `keel` command: a configured
//! project model, a generator expression evaluator and the resolution
//! engine that answers usage requirement, link and output queries for
//! every target and configuration.

pub mod core;
pub mod generator;
pub mod genex;
pub mod manifest;
pub mod util;

/// Test utilities for keel unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides project builders and an engine wired to a collecting sink.
#[cfg(test)]
pub mod test_support;

pub use core::{ConfigId, PolicyMap, Project, Target, TargetId, TargetKind};
pub use generator::{Engine, LinkGraph};
pub use manifest::Manifest;
