//! Test utilities for keel unit tests.
//!
//! Builders for in-memory projects and an engine wired to a shared
//! [`CollectingSink`] so tests can inspect what was reported.
//!
//! # Example
//!
//! ```rust,ignore
//! use keel::test_support::TestProject;
//!
//! let t = TestProject::new()
//!     .target(Target::executable("app").link("core"))
//!     .target(Target::static_library("core"))
//!     .build();
//! let app = t.id("app");
//! assert_eq!(t.engine.link_implementation(app, &ConfigId::none()).libraries.len(), 1);
//! ```

pub mod fixtures;

use std::rc::Rc;

use crate::core::{PolicyId, PolicyMap, PolicyStatus, Project, ProjectSettings, SourceFile, Target, TargetId};
use crate::generator::Engine;
use crate::util::{CollectingSink, Config, Diagnostic};

pub use fixtures::*;

/// Builder for a project resolved by a fresh engine.
#[derive(Debug, Default)]
pub struct TestProject {
    settings: ProjectSettings,
    targets: Vec<Target>,
    aliases: Vec<(String, String)>,
    sources: Vec<SourceFile>,
    policies: PolicyMap,
    config: Config,
}

impl TestProject {
    pub fn new() -> Self {
        let settings = ProjectSettings {
            name: "test".to_string(),
            source_dir: "/src".into(),
            binary_dir: "/build".into(),
            ..Default::default()
        };
        TestProject {
            settings,
            ..Default::default()
        }
    }

    pub fn configurations(mut self, configs: &[&str]) -> Self {
        self.settings.configurations = configs.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn settings(mut self, f: impl FnOnce(&mut ProjectSettings)) -> Self {
        f(&mut self.settings);
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.aliases.push((alias.to_string(), target.to_string()));
        self
    }

    pub fn source(mut self, source: SourceFile) -> Self {
        self.sources.push(source);
        self
    }

    pub fn policy(mut self, id: PolicyId, status: PolicyStatus) -> Self {
        self.policies.set(id, status);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Register everything and create the engine.
    ///
    /// Panics on duplicate names, which is a broken test.
    pub fn build(self) -> TestEngine {
        let mut project = Project::new(self.settings);
        for target in self.targets {
            project.add_target(target).unwrap();
        }
        for (alias, target) in &self.aliases {
            project.add_alias(alias, target).unwrap();
        }
        for source in self.sources {
            project.add_source(source);
        }

        let sink = Rc::new(CollectingSink::new());
        let engine = Engine::new(project, self.policies, Rc::clone(&sink)).with_config(self.config);
        TestEngine { engine, sink }
    }
}

/// An engine plus the sink it reports to.
#[derive(Debug)]
pub struct TestEngine {
    pub engine: Engine,
    pub sink: Rc<CollectingSink>,
}

impl TestEngine {
    /// Id of a target that must exist.
    pub fn id(&self, name: &str) -> TargetId {
        self.engine
            .find_target(name)
            .unwrap_or_else(|| panic!("no target named `{}`", name))
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.sink.diagnostics()
    }

    pub fn errors(&self) -> Vec<String> {
        self.sink
            .diagnostics()
            .into_iter()
            .filter(|d| d.is_error())
            .map(|d| d.message)
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.sink
            .diagnostics()
            .into_iter()
            .filter(|d| d.severity == crate::util::Severity::Warning)
            .map(|d| d.message)
            .collect()
    }
}
