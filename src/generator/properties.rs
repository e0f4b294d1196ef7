//! Usage requirement resolution.
//!
//! A usage requirement of a target is the concatenation of its direct
//! entries and, for every direct link dependency that is a target, one
//! synthesized `$<TARGET_PROPERTY:dep,INTERFACE_...>` entry. Values are
//! deduplicated first-seen across both, so a direct value always wins over
//! an inherited duplicate.

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::entry::{EntryKind, PropertyEntry, Provenance};
use crate::core::property::is_off;
use crate::core::{ConfigId, PolicyId, PolicyStatus, Prop, TargetId, TargetKind};
use crate::genex::{DagChecker, EvalContext};
use crate::util::diagnostic::{Diagnostic, Severity};
use crate::util::InternedString;

use super::errors::{Fatal, GraphError};
use super::Engine;

static FRAMEWORK_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*/)?([^/]+)\.framework/(Versions/[^/]+/)?([^/]+)$")
        .expect("framework path pattern is valid")
});

/// The directory holding a framework, for `/x/Foo.framework/Foo` style paths.
pub fn framework_directory(path: &str) -> Option<String> {
    let caps = FRAMEWORK_PATH.captures(path)?;
    if caps.get(2)?.as_str() != caps.get(4)?.as_str() {
        return None;
    }
    let parent = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    Some(parent.trim_end_matches('/').to_string())
}

/// Absolute on any platform keel describes: `/x`, `\x` or `C:/x`.
pub fn is_full_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    match bytes {
        [b'/', ..] | [b'\\', ..] => true,
        [drive, b':', b'/' | b'\\', ..] => drive.is_ascii_alphabetic(),
        _ => false,
    }
}

/// One evaluated entry and whether its value depended on the context.
struct Contribution {
    values: Vec<String>,
    context_sensitive: bool,
    provenance: Provenance,
}

impl Engine {
    pub fn include_directories(&self, id: TargetId, config: &ConfigId, language: Option<&str>) -> Rc<Vec<String>> {
        self.usage_requirement(id, EntryKind::IncludeDirectories, config, language)
    }

    pub fn compile_options(&self, id: TargetId, config: &ConfigId, language: Option<&str>) -> Rc<Vec<String>> {
        self.usage_requirement(id, EntryKind::CompileOptions, config, language)
    }

    pub fn compile_features(&self, id: TargetId, config: &ConfigId, language: Option<&str>) -> Rc<Vec<String>> {
        self.usage_requirement(id, EntryKind::CompileFeatures, config, language)
    }

    pub fn compile_definitions(&self, id: TargetId, config: &ConfigId, language: Option<&str>) -> Rc<Vec<String>> {
        self.usage_requirement(id, EntryKind::CompileDefinitions, config, language)
    }

    /// Resolve one list-valued usage requirement.
    pub fn usage_requirement(
        &self,
        id: TargetId,
        kind: EntryKind,
        config: &ConfigId,
        language: Option<&str>,
    ) -> Rc<Vec<String>> {
        let key = (kind, *config, language.map(InternedString::new));
        if let Some(hit) = self.cache(id).usage.borrow().get(&key) {
            return Rc::clone(hit);
        }

        tracing::debug!(
            "resolving {} of `{}` for config `{}`",
            kind.label(),
            self.target(id).name,
            config
        );
        let (values, _) = self.collect(id, kind, config, language);
        let values = Rc::new(values);
        self.cache(id).usage.borrow_mut().insert(key, Rc::clone(&values));
        values
    }

    /// Source files of `id` for `config`, as absolute paths.
    pub fn sources(&self, id: TargetId, config: &ConfigId) -> Rc<Vec<PathBuf>> {
        let cache = self.cache(id);
        if let Some(frozen) = cache.frozen_sources.borrow().as_ref() {
            return Rc::clone(frozen);
        }
        if let Some(hit) = cache.sources.borrow().get(config) {
            return Rc::clone(hit);
        }

        let target = self.target(id);
        let (values, context_sensitive) = if target.kind == TargetKind::InterfaceLibrary {
            (Vec::new(), false)
        } else {
            self.collect(id, EntryKind::Sources, config, None)
        };
        let sources: Vec<PathBuf> = values.into_iter().map(PathBuf::from).collect();
        let sources = Rc::new(sources);

        if !context_sensitive {
            tracing::debug!("sources of `{}` do not depend on the configuration", target.name);
            *cache.frozen_sources.borrow_mut() = Some(Rc::clone(&sources));
        }
        cache.sources.borrow_mut().insert(*config, Rc::clone(&sources));
        sources
    }

    /// Sources shared by every configuration.
    ///
    /// Reports an error and returns `None` when two configurations disagree.
    pub fn config_common_sources(&self, id: TargetId) -> Option<Rc<Vec<PathBuf>>> {
        let configs = self.project.configurations();
        let (first, rest) = configs.split_first()?;
        let common = self.sources(id, first);
        for config in rest {
            let other = self.sources(id, config);
            if *other != *common {
                let target = self.target(id);
                self.fail(
                    GraphError::VaryingSources {
                        target: target.name.to_string(),
                        first: first.to_string(),
                        second: config.to_string(),
                    },
                    &target.backtrace,
                );
                return None;
            }
        }
        Some(common)
    }

    /// Entries inherited from the direct link dependencies of `id`.
    fn inherited_entries(&self, id: TargetId, kind: EntryKind, config: &ConfigId) -> Vec<PropertyEntry> {
        let libraries = self.link_implementation_libraries(id, config, id);
        let interface = kind.prop().interface();
        let apple = self.project.settings.is_apple();

        let mut entries = Vec::new();
        for item in &libraries.libraries {
            match item.target {
                Some(dep) => {
                    let dep_target = self.target(dep);
                    entries.push(PropertyEntry::inherited(
                        format!("$<TARGET_PROPERTY:{},{}>", dep_target.name, interface.name()),
                        item.backtrace.clone(),
                        dep,
                        dep_target.imported,
                        item.from_genex,
                    ));
                }
                None if kind == EntryKind::IncludeDirectories && apple => {
                    if let Some(dir) = framework_directory(&item.name) {
                        entries.push(PropertyEntry::direct(dir, item.backtrace.clone()));
                    }
                }
                None => {}
            }
        }
        entries
    }

    /// Evaluate and merge every entry of one property.
    ///
    /// Returns the values and whether any contributing entry depended on the
    /// evaluation context.
    fn collect(
        &self,
        id: TargetId,
        kind: EntryKind,
        config: &ConfigId,
        language: Option<&str>,
    ) -> (Vec<String>, bool) {
        let target = self.target(id);
        let mut entries: Vec<PropertyEntry> = target.entries.entries(kind).to_vec();

        if kind == EntryKind::CompileDefinitions {
            if let Some(entry) = self.legacy_config_definitions(id, config) {
                entries.push(entry);
            }
        }
        entries.extend(self.inherited_entries(id, kind, config));

        let root = DagChecker::root(id, kind.prop());
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        let mut context_sensitive = false;

        for entry in &entries {
            let ctx = EvalContext::new(*config, id, id, &entry.backtrace)
                .with_dag(&root)
                .with_language(language);
            let evaluation = self.evaluate(&entry.text, &ctx);

            let mut contribution = Contribution {
                values: evaluation.values,
                context_sensitive: evaluation.context_sensitive,
                provenance: entry.provenance,
            };

            let checked = match kind {
                EntryKind::IncludeDirectories => self.check_include_directories(id, entry, &mut contribution),
                EntryKind::Sources => self.check_sources(id, entry, &mut contribution),
                _ => Ok(()),
            };
            if checked.is_err() {
                break;
            }

            if !contribution.provenance.is_inherited() || !contribution.values.is_empty() {
                context_sensitive |= contribution.context_sensitive;
            }

            let mut added = Vec::new();
            for value in contribution.values {
                if seen.insert(value.clone()) {
                    added.push(value.clone());
                    values.push(value);
                }
            }
            self.debug_report(id, kind, entry, &added);
        }

        (values, context_sensitive)
    }

    /// The per-configuration `COMPILE_DEFINITIONS` value, as one entry.
    fn legacy_config_definitions(&self, id: TargetId, config: &ConfigId) -> Option<PropertyEntry> {
        let target = self.target(id);
        let value = target
            .properties
            .get_config(Prop::CompileDefinitions, config)?
            .as_string();

        let policy = PolicyId::ConfigCompileDefinitions;
        match self.policy(policy) {
            status if !status.is_legacy() => None,
            status => {
                if status.violation_severity().is_some() {
                    self.report(
                        Diagnostic::warning(format!(
                            "Target \"{}\" uses per-configuration COMPILE_DEFINITIONS for config \"{}\".",
                            target.name, config
                        ))
                        .with_code("keel::usage::config_compile_definitions")
                        .with_context(policy.warning_context())
                        .with_backtrace(target.backtrace.clone()),
                    );
                }
                Some(PropertyEntry::direct(value, target.backtrace.clone()))
            }
        }
    }

    /// `Err` stops collecting further entries, after either an error or a
    /// downgraded warning was reported.
    fn check_include_directories(
        &self,
        id: TargetId,
        entry: &PropertyEntry,
        contribution: &mut Contribution,
    ) -> Result<(), Fatal> {
        let target = self.target(id);
        for value in &mut contribution.values {
            if let Provenance::Inherited {
                from,
                imported: true,
                from_genex,
            } = entry.provenance
            {
                if !std::path::Path::new(value.as_str()).exists() {
                    let err = GraphError::MissingImportedInclude {
                        dependency: self.target(from).name.to_string(),
                        path: value.clone(),
                    };
                    let policy = PolicyId::ImportedIncludeExistence;
                    return Err(match self.policy(policy) {
                        status if from_genex && status.is_legacy() => {
                            let mut warning = err.to_diagnostic(Severity::Warning, &entry.backtrace);
                            if status == PolicyStatus::Warn {
                                warning = warning.with_context(policy.warning_context());
                            }
                            self.report(warning);
                            Fatal
                        }
                        _ => self.fail(err, &entry.backtrace),
                    });
                }
            }

            if !is_full_path(value) {
                match entry.provenance.dependency() {
                    Some(from) => {
                        return Err(self.fail(
                            GraphError::RelativeInterfacePath {
                                dependency: self.target(from).name.to_string(),
                                property: Prop::InterfaceIncludeDirectories.name().to_string(),
                                path: value.clone(),
                            },
                            &entry.backtrace,
                        ));
                    }
                    None => self.policy_violation(
                        PolicyId::RelativeIncludeDirectories,
                        GraphError::RelativePath {
                            target: target.name.to_string(),
                            what: "include directories",
                            path: value.clone(),
                        },
                        &entry.backtrace,
                    )?,
                }
            }

            if !is_off(value) {
                *value = value.replace('\\', "/");
            }
        }
        Ok(())
    }

    fn check_sources(&self, id: TargetId, entry: &PropertyEntry, contribution: &mut Contribution) -> Result<(), Fatal> {
        let target = self.target(id);
        for value in &mut contribution.values {
            if is_full_path(value) {
                continue;
            }
            if let Some(from) = entry.provenance.dependency() {
                return Err(self.fail(
                    GraphError::RelativeInterfacePath {
                        dependency: self.target(from).name.to_string(),
                        property: Prop::InterfaceSources.name().to_string(),
                        path: value.clone(),
                    },
                    &entry.backtrace,
                ));
            }
            *value = target.source_dir.join(value.as_str()).to_string_lossy().into_owned();
        }
        Ok(())
    }

    /// Log what an entry contributed when the property is being traced.
    fn debug_report(&self, id: TargetId, kind: EntryKind, entry: &PropertyEntry, added: &[String]) {
        let prop = kind.prop();
        if !self.config.debug.traces(prop.name()) {
            return;
        }

        let fresh: Vec<&String> = {
            let mut logged = self.cache(id).debug_logged.borrow_mut();
            let logged = logged.entry(kind).or_default();
            added.iter().filter(|v| logged.insert((*v).clone())).collect()
        };
        if fresh.is_empty() {
            return;
        }

        let target = self.target(id);
        let origin = match entry.provenance.dependency() {
            Some(dep) => format!(" from target \"{}\"", self.target(dep).name),
            None => String::new(),
        };
        let lines: String = fresh.iter().map(|v| format!("   * {}\n", v)).collect();
        self.report(
            Diagnostic::note(format!(
                "Used {} for target {}{}:\n\n{}",
                kind.label(),
                target.name,
                origin,
                lines
            ))
            .with_backtrace(entry.backtrace.clone()),
        );
    }
}
