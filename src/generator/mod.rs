//! Per-target, per-configuration resolution.
//!
//! The [`Engine`] owns a configured [`Project`] and answers every query the
//! file-emission layer asks: usage requirements, link implementation and
//! interface, closures, compatible interface properties, traced
//! dependencies and output locations. Each answer is computed on first
//! request and memoized in the target's [`TargetCache`]; repeated queries
//! return the same `Rc`.
//!
//! Fatal conditions never unwind. They are reported to the diagnostic sink
//! and the query yields an empty value, which is cached like any other.

pub mod cache;
pub mod closure;
pub mod compat;
pub mod errors;
pub mod graph;
pub mod link_iface;
pub mod link_impl;
pub mod output;
pub mod properties;
pub mod trace;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::source::classify_source;
use crate::core::{
    ConfigId, PolicyId, PolicyOracle, PolicyStatus, Project, Prop, SourceKind, Target, TargetId,
    TargetKind,
};
use crate::genex::{EvalContext, Evaluation, ExpressionEvaluator, ExpressionHost, GenexEvaluator};
use crate::util::config::Config;
use crate::util::diagnostic::{Backtrace, Diagnostic, DiagnosticSink, Severity};
use crate::util::InternedString;

pub use cache::{CacheSlot, HeadMap, HeadSensitive, TargetCache};
pub use closure::LinkClosure;
pub use compat::{CompatibleInterfaces, CompatibleKind};
pub use errors::{Fatal, GraphError};
pub use graph::LinkGraph;
pub use link_iface::LinkInterface;
pub use link_impl::{LinkImplementation, LinkImplementationLibraries, LinkItem};
pub use trace::TraceSummary;

/// The resolution engine.
pub struct Engine {
    project: Project,
    policies: Box<dyn PolicyOracle>,
    sink: Box<dyn DiagnosticSink>,
    evaluator: Box<dyn ExpressionEvaluator>,
    config: Config,
    caches: Vec<TargetCache>,
}

impl Engine {
    /// Create an engine over a configured project.
    pub fn new(
        project: Project,
        policies: impl PolicyOracle + 'static,
        sink: impl DiagnosticSink + 'static,
    ) -> Self {
        let caches = (0..project.len()).map(|_| TargetCache::default()).collect();
        Engine {
            project,
            policies: Box::new(policies),
            sink: Box::new(sink),
            evaluator: Box::new(GenexEvaluator),
            config: Config::default(),
            caches,
        }
    }

    /// Use language tables and debug settings from `config`.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replace the expression evaluator.
    pub fn with_evaluator(mut self, evaluator: impl ExpressionEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn target(&self, id: TargetId) -> &Target {
        self.project.target(id)
    }

    pub fn find_target(&self, name: &str) -> Option<TargetId> {
        self.project.find_target(name)
    }

    pub(crate) fn cache(&self, id: TargetId) -> &TargetCache {
        &self.caches[id.index()]
    }

    pub(crate) fn cache_mut(&mut self, id: TargetId) -> &mut TargetCache {
        &mut self.caches[id.index()]
    }

    pub(crate) fn policy(&self, id: PolicyId) -> PolicyStatus {
        self.policies.status(id)
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }

    /// Report a fatal error.
    pub(crate) fn fail(&self, err: GraphError, backtrace: &Backtrace) -> Fatal {
        self.report(err.to_diagnostic(Severity::Error, backtrace));
        Fatal
    }

    /// Report a policy-gated violation. Returns `Err` when it is fatal.
    pub(crate) fn policy_violation(
        &self,
        policy: PolicyId,
        err: GraphError,
        backtrace: &Backtrace,
    ) -> Result<(), Fatal> {
        match self.policy(policy).violation_severity() {
            None => Ok(()),
            Some(Severity::Error) => Err(self.fail(err, backtrace)),
            Some(severity) => {
                self.report(
                    err.to_diagnostic(severity, backtrace)
                        .with_context(policy.warning_context()),
                );
                Ok(())
            }
        }
    }

    pub(crate) fn evaluate(&self, fragment: &str, ctx: &EvalContext<'_>) -> Evaluation {
        self.evaluator.evaluate(self, fragment, ctx)
    }

    /// Language of a source file, from its metadata or its extension.
    pub fn source_language(&self, path: &Path) -> Option<String> {
        if let Some(source) = self.project.source(path) {
            if let Some(lang) = source.language {
                return Some(lang.to_string());
            }
        }
        let ext = crate::core::source::extension_of(path)?;
        self.config
            .languages
            .language_for_extension(&ext)
            .map(str::to_string)
    }

    /// Classify a source of `id`.
    pub fn source_kind(&self, id: TargetId, path: &Path) -> SourceKind {
        let resources: Vec<PathBuf> = self
            .target(id)
            .properties
            .get_list(Prop::Resource, None)
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let language = self.source_language(path);
        let fallback;
        let source = match self.project.source(path) {
            Some(source) => source,
            None => {
                fallback = crate::core::SourceFile::new(path);
                &fallback
            }
        };
        classify_source(source, language.as_deref(), &resources)
    }

    /// Sources of `id` for `config` that classify as `kind`.
    pub fn sources_of_kind(&self, id: TargetId, config: &ConfigId, kind: SourceKind) -> Vec<PathBuf> {
        self.sources(id, config)
            .iter()
            .filter(|path| self.source_kind(id, path) == kind)
            .cloned()
            .collect()
    }

    /// Languages compiled directly into `id`, sorted.
    pub fn languages(&self, id: TargetId, config: &ConfigId) -> Rc<Vec<String>> {
        if let Some(hit) = self.cache(id).languages.borrow().get(config) {
            return Rc::clone(hit);
        }

        let sources = self.sources(id, config);
        let mut languages = BTreeSet::new();
        for path in sources.iter() {
            let kind = self.source_kind(id, path);
            if !matches!(kind, SourceKind::Compilable | SourceKind::CustomCommand) {
                continue;
            }
            if let Some(lang) = self.source_language(path) {
                languages.insert(lang);
            }
        }

        let languages = Rc::new(languages.into_iter().collect::<Vec<_>>());
        self.cache(id)
            .languages
            .borrow_mut()
            .insert(*config, Rc::clone(&languages));
        languages
    }

    /// Resolve every configuration of every target once, for diagnostics.
    pub fn check_all(&self) {
        for config in self.project.configurations() {
            for id in self.project.target_ids() {
                let target = self.target(id);
                if target.imported {
                    continue;
                }
                self.include_directories(id, &config, None);
                self.compile_options(id, &config, None);
                self.compile_features(id, &config, None);
                self.compile_definitions(id, &config, None);
                if target.kind == TargetKind::InterfaceLibrary {
                    continue;
                }
                self.link_implementation(id, &config);
                self.link_interface(id, &config, id);
                if target.kind.is_executable_like() {
                    self.link_closure(id, &config);
                    self.check_property_compatibility(id, &config);
                }
            }
        }
    }
}

impl ExpressionHost for Engine {
    fn find_target(&self, name: &str) -> Option<TargetId> {
        self.project.find_target(name)
    }

    fn target_name(&self, id: TargetId) -> InternedString {
        self.target(id).name
    }

    fn target_kind(&self, id: TargetId) -> TargetKind {
        self.target(id).kind
    }

    fn raw_property(&self, id: TargetId, prop: Prop, config: &ConfigId) -> Option<String> {
        let target = self.target(id);
        if let Some(kind) = crate::core::EntryKind::from_prop(prop) {
            return target.entries.raw_value(kind);
        }
        target
            .properties
            .lookup(prop, Some(config))
            .map(|value| value.as_string())
    }

    fn usage_interface_libraries(&self, id: TargetId, config: &ConfigId, head: TargetId) -> Vec<TargetId> {
        self.link_interface_libraries(id, config, head, true)
            .libraries
            .iter()
            .filter_map(|item| item.target)
            .collect()
    }

    fn compatible_value(&self, id: TargetId, name: &str, config: &ConfigId) -> Option<String> {
        self.compatible_value(id, name, config)
    }

    fn linker_language(&self, id: TargetId, config: &ConfigId) -> String {
        self.link_closure(id, config).linker_language.clone()
    }

    fn target_file(&self, id: TargetId, config: &ConfigId) -> Option<PathBuf> {
        let target = self.target(id);
        let artifact = target
            .kind
            .artifact(self.project.settings.is_dll_platform(), false);
        let path = self.full_path(id, config, artifact);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("project", &self.project.settings.name)
            .field("targets", &self.project.len())
            .finish()
    }
}
