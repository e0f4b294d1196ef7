//! Transitive link closures and linker language selection.

use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

use serde::Serialize;

use crate::core::{ConfigId, PolicyId, Prop, TargetId};

use super::cache::CacheSlot;
use super::errors::{Fatal, GraphError};
use super::link_impl::LinkItem;
use super::Engine;

/// Languages reachable through a target's link closure and the language
/// whose linker drives the final link.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkClosure {
    /// Sorted, deduplicated
    pub languages: Vec<String>,
    /// Empty when no linker could be chosen
    pub linker_language: String,
}

/// Collects languages over the link interfaces of a closure.
struct LanguageCollector<'e> {
    engine: &'e Engine,
    owner: TargetId,
    config: ConfigId,
    languages: BTreeSet<String>,
    visited: HashSet<TargetId>,
}

impl LanguageCollector<'_> {
    fn visit(&mut self, item: &LinkItem) -> Result<(), Fatal> {
        let Some(dep) = item.target else {
            if item.name.contains("::") {
                self.engine.policy_violation(
                    PolicyId::AliasTargetMissing,
                    GraphError::MissingAliasTarget {
                        target: self.engine.target(self.owner).name.to_string(),
                        item: item.name.clone(),
                    },
                    &item.backtrace,
                )?;
            }
            return Ok(());
        };
        if !self.visited.insert(dep) {
            return Ok(());
        }

        let iface = self.engine.link_interface(dep, &self.config, self.owner);
        if !iface.exists {
            return Ok(());
        }
        self.languages.extend(iface.languages.iter().cloned());
        for lib in &iface.libraries {
            self.visit(lib)?;
        }
        Ok(())
    }
}

/// Picks the language with the highest linker preference.
struct LinkerSelector {
    preference: i32,
    preferred: BTreeSet<String>,
}

impl LinkerSelector {
    fn new() -> Self {
        LinkerSelector {
            preference: 0,
            preferred: BTreeSet::new(),
        }
    }

    fn consider(&mut self, language: &str, preference: i32) {
        if preference > self.preference {
            self.preference = preference;
            self.preferred.clear();
        }
        if preference == self.preference {
            self.preferred.insert(language.to_string());
        }
    }
}

impl Engine {
    /// Targets reached from the link implementation of `id` through
    /// usage-requirement link interfaces, in depth-first preorder.
    pub fn link_implementation_closure(&self, id: TargetId, config: &ConfigId) -> Rc<Vec<TargetId>> {
        if let Some(hit) = self.cache(id).impl_closure.borrow().get(config) {
            return Rc::clone(hit);
        }
        // Asked for while the link implementation itself is being computed.
        if self.link_implementation_in_progress(id, config) {
            return Rc::new(Vec::new());
        }

        let implementation = self.link_implementation_libraries(id, config, id);
        let mut emitted = HashSet::new();
        let mut closure = Vec::new();
        for item in &implementation.libraries {
            if let Some(dep) = item.target {
                self.closure_visit(dep, config, id, &mut emitted, &mut closure);
            }
        }

        let closure = Rc::new(closure);
        self.cache(id)
            .impl_closure
            .borrow_mut()
            .insert(*config, Rc::clone(&closure));
        closure
    }

    fn closure_visit(
        &self,
        dep: TargetId,
        config: &ConfigId,
        head: TargetId,
        emitted: &mut HashSet<TargetId>,
        closure: &mut Vec<TargetId>,
    ) {
        if !emitted.insert(dep) {
            return;
        }
        closure.push(dep);

        let iface = self.link_interface_libraries(dep, config, head, true);
        for item in &iface.libraries {
            if let Some(next) = item.target {
                self.closure_visit(next, config, head, emitted, closure);
            }
        }
    }

    /// Link languages and linker language of `id`.
    pub fn link_closure(&self, id: TargetId, config: &ConfigId) -> Rc<LinkClosure> {
        let slot = self.cache(id).link_closure.borrow().get(config).cloned();
        match slot {
            Some(CacheSlot::Done(hit)) => return hit,
            Some(CacheSlot::InProgress) => return Rc::new(LinkClosure::default()),
            None => {}
        }
        self.cache(id)
            .link_closure
            .borrow_mut()
            .insert(*config, CacheSlot::InProgress);

        tracing::debug!("computing link closure of `{}` for `{}`", self.target(id).name, config);
        let closure = Rc::new(self.compute_link_closure(id, config).unwrap_or_default());

        self.cache(id)
            .link_closure
            .borrow_mut()
            .insert(*config, CacheSlot::Done(Rc::clone(&closure)));
        closure
    }

    fn compute_link_closure(&self, id: TargetId, config: &ConfigId) -> Result<LinkClosure, Fatal> {
        let implementation = self.link_implementation(id, config);

        let mut collector = LanguageCollector {
            engine: self,
            owner: id,
            config: *config,
            languages: implementation.languages.iter().cloned().collect(),
            visited: HashSet::new(),
        };
        for item in &implementation.libraries {
            collector.visit(item)?;
        }
        let languages = collector.languages;

        let target = self.target(id);
        let linker_language = if target.properties.get_bool(Prop::HasCxx, Some(config)) {
            "CXX".to_string()
        } else if let Some(language) = target.properties.get_string(Prop::LinkerLanguage, Some(config)) {
            language
        } else {
            self.select_linker_language(id, &implementation.languages, &languages)?
        };

        Ok(LinkClosure {
            languages: languages.into_iter().collect(),
            linker_language,
        })
    }

    /// Vote on the linker language.
    ///
    /// Languages compiled into the target always take part; languages
    /// reached through dependencies only when their preference propagates.
    fn select_linker_language(
        &self,
        id: TargetId,
        direct: &[String],
        closure: &BTreeSet<String>,
    ) -> Result<String, Fatal> {
        let table = &self.config.languages;
        let mut selector = LinkerSelector::new();
        for language in direct {
            selector.consider(language, table.preference(language).unwrap_or(0));
        }
        for language in closure {
            if table.preference_propagates(language) {
                selector.consider(language, table.preference(language).unwrap_or(0));
            }
        }

        let mut candidates = selector.preferred.into_iter();
        match (candidates.next(), candidates.next()) {
            (None, _) => Ok(String::new()),
            (Some(only), None) => Ok(only),
            (Some(first), Some(second)) => {
                let target = self.target(id);
                let languages = [first, second].into_iter().chain(candidates).collect();
                Err(self.fail(
                    GraphError::AmbiguousLinkerLanguage {
                        target: target.name.to_string(),
                        preference: selector.preference,
                        languages,
                    },
                    &target.backtrace,
                ))
            }
        }
    }
}
