//! Core data structures for keel.
//!
//! This module contains the configured project model the resolvers read:
//! - Configuration identifiers and compatibility policies
//! - Typed target properties and raw property entries
//! - Targets, source files and the project registry

pub mod config_id;
pub mod entry;
pub mod policy;
pub mod project;
pub mod property;
pub mod source;
pub mod target;

pub use config_id::ConfigId;
pub use entry::{EntryKind, PropertyEntry, PropertyEntryStore, Provenance};
pub use policy::{PolicyId, PolicyMap, PolicyOracle, PolicyStatus};
pub use project::{Project, ProjectError, ProjectSettings};
pub use property::{Prop, PropertyMap, PropertyValue, ValueType};
pub use source::{classify_source, CustomCommand, SourceFile, SourceKind};
pub use target::{Artifact, LinkLibraryType, Target, TargetId, TargetKind};
