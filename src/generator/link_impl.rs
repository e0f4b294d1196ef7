//! Link implementation: the libraries a target links against directly.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde::Serialize;

use crate::core::property::expand_list;
use crate::core::{ConfigId, EntryKind, LinkLibraryType, PolicyId, Prop, TargetId, TargetKind};
use crate::genex::{has_genex, DagChecker, EvalContext, ExpressionHost};
use crate::util::diagnostic::Backtrace;

use super::cache::{CacheSlot, HeadSensitive};
use super::errors::{Fatal, GraphError};
use super::Engine;

/// One item on a link line.
///
/// Two items are equal when they resolve to the same target, or when neither
/// resolves and the names match.
#[derive(Debug, Clone, Serialize)]
pub struct LinkItem {
    pub name: String,
    pub target: Option<TargetId>,
    #[serde(skip)]
    pub backtrace: Backtrace,
    /// The item came out of a generator expression
    #[serde(skip)]
    pub from_genex: bool,
}

impl LinkItem {
    pub fn new(name: impl Into<String>, target: Option<TargetId>, backtrace: Backtrace) -> Self {
        LinkItem {
            name: name.into(),
            target,
            backtrace,
            from_genex: false,
        }
    }
}

impl PartialEq for LinkItem {
    fn eq(&self, other: &Self) -> bool {
        match (self.target, other.target) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.name == other.name,
            _ => false,
        }
    }
}

impl Eq for LinkItem {}

impl Hash for LinkItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.target {
            Some(id) => id.hash(state),
            None => self.name.hash(state),
        }
    }
}

/// Direct link libraries for one (configuration, head).
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkImplementationLibraries {
    pub libraries: Vec<LinkItem>,
    /// Typed legacy entries that belong to the other build type
    pub wrong_config_libraries: Vec<LinkItem>,
    pub head_sensitive: bool,
}

impl HeadSensitive for LinkImplementationLibraries {
    fn head_sensitive(&self) -> bool {
        self.head_sensitive
    }
}

/// Link implementation of a target as seen from itself.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkImplementation {
    pub libraries: Vec<LinkItem>,
    pub wrong_config_libraries: Vec<LinkItem>,
    /// Languages compiled into the target
    pub languages: Vec<String>,
}

impl Engine {
    /// Direct link libraries of `id` for `config`, evaluated for `head`.
    pub fn link_implementation_libraries(
        &self,
        id: TargetId,
        config: &ConfigId,
        head: TargetId,
    ) -> Rc<LinkImplementationLibraries> {
        let cache = self.cache(id);
        let slot = cache
            .link_impl_libs
            .borrow()
            .get(config)
            .and_then(|map| map.get(head));
        match slot {
            Some(CacheSlot::Done(hit)) => return hit,
            // Re-entered while evaluating its own link libraries.
            Some(CacheSlot::InProgress) => return Rc::new(LinkImplementationLibraries::default()),
            None => {}
        }

        cache
            .link_impl_libs
            .borrow_mut()
            .entry(*config)
            .or_default()
            .set(head, CacheSlot::InProgress);

        let libraries = Rc::new(self.compute_link_implementation_libraries(id, config, head));

        cache
            .link_impl_libs
            .borrow_mut()
            .entry(*config)
            .or_default()
            .set(head, CacheSlot::Done(Rc::clone(&libraries)));
        libraries
    }

    /// Whether the link libraries of `id` as seen by itself are being computed.
    pub(crate) fn link_implementation_in_progress(&self, id: TargetId, config: &ConfigId) -> bool {
        matches!(
            self.cache(id)
                .link_impl_libs
                .borrow()
                .get(config)
                .and_then(|map| map.get(id)),
            Some(CacheSlot::InProgress)
        )
    }

    /// Link implementation of `id` for `config`, with its own languages.
    pub fn link_implementation(&self, id: TargetId, config: &ConfigId) -> Rc<LinkImplementation> {
        if let Some(hit) = self.cache(id).link_impl.borrow().get(config) {
            return Rc::clone(hit);
        }

        let libraries = self.link_implementation_libraries(id, config, id);
        let languages = self.languages(id, config);
        let implementation = Rc::new(LinkImplementation {
            libraries: libraries.libraries.clone(),
            wrong_config_libraries: libraries.wrong_config_libraries.clone(),
            languages: languages.as_ref().clone(),
        });

        self.cache(id)
            .link_impl
            .borrow_mut()
            .insert(*config, Rc::clone(&implementation));
        implementation
    }

    fn compute_link_implementation_libraries(
        &self,
        id: TargetId,
        config: &ConfigId,
        head: TargetId,
    ) -> LinkImplementationLibraries {
        let target = self.target(id);
        let mut result = LinkImplementationLibraries::default();
        if target.imported {
            return result;
        }

        tracing::debug!("computing link implementation of `{}` for `{}`", target.name, config);

        if self.collect_link_libraries(id, config, head, &mut result).is_err() {
            result.libraries.clear();
            return result;
        }

        let debug = self.project.is_debug_config(config);
        for (name, ty) in &target.legacy_link_libraries {
            if name.as_str() == target.name.as_str() {
                continue;
            }
            let Ok(resolved) = self.find_target_to_link(id, name, &target.backtrace) else {
                result.libraries.clear();
                return result;
            };
            let item = LinkItem::new(name.clone(), resolved, target.backtrace.clone());
            let matches = match ty {
                LinkLibraryType::General => true,
                LinkLibraryType::Debug => debug,
                LinkLibraryType::Optimized => !debug,
            };
            if matches {
                result.libraries.push(item);
            } else {
                result.wrong_config_libraries.push(item);
            }
        }

        result
    }

    fn collect_link_libraries(
        &self,
        id: TargetId,
        config: &ConfigId,
        head: TargetId,
        result: &mut LinkImplementationLibraries,
    ) -> Result<(), Fatal> {
        let target = self.target(id);
        let root = DagChecker::root(id, Prop::LinkLibraries);

        for entry in target.entries.entries(EntryKind::LinkLibraries) {
            let ctx = EvalContext::new(*config, head, id, &entry.backtrace).with_dag(&root);
            let evaluation = self.evaluate(&entry.text, &ctx);
            result.head_sensitive |= evaluation.head_sensitive;
            let from_genex = has_genex(&entry.text);

            for property in &evaluation.seen_properties {
                let prop = Prop::from_name(property);
                if self.raw_property(id, prop, config).is_none() {
                    self.cache(id)
                        .implied_null
                        .borrow_mut()
                        .insert(property.clone());
                }
            }

            for raw in &evaluation.values {
                let name = self.check_link_item_whitespace(id, raw, &entry.backtrace)?;
                if name.is_empty() {
                    continue;
                }

                let resolved = self.find_target_to_link(id, &name, &entry.backtrace)?;
                if name == target.name.as_str() || resolved == Some(id) {
                    self.policy_violation(
                        PolicyId::SelfLink,
                        GraphError::SelfLink {
                            target: target.name.to_string(),
                        },
                        &entry.backtrace,
                    )?;
                    continue;
                }

                result.libraries.push(LinkItem {
                    name,
                    target: resolved,
                    backtrace: entry.backtrace.clone(),
                    from_genex,
                });
            }
        }
        Ok(())
    }

    /// Resolve a link item name to a linkable target.
    ///
    /// Executables that do not export symbols resolve to nothing so an
    /// external library of the same name can still be linked.
    pub(crate) fn find_target_to_link(
        &self,
        id: TargetId,
        name: &str,
        backtrace: &Backtrace,
    ) -> Result<Option<TargetId>, Fatal> {
        let Some(found) = self.project.find_target(name) else {
            return Ok(None);
        };
        let target = self.target(found);
        match target.kind {
            TargetKind::Executable if !target.is_executable_with_exports() => Ok(None),
            TargetKind::ObjectLibrary => Err(self.fail(
                GraphError::LinksToObjectLibrary {
                    target: self.target(id).name.to_string(),
                    library: target.name.to_string(),
                },
                backtrace,
            )),
            _ => Ok(Some(found)),
        }
    }

    fn check_link_item_whitespace(&self, id: TargetId, item: &str, backtrace: &Backtrace) -> Result<String, Fatal> {
        let trimmed = item.trim_matches([' ', '\t', '\r', '\n']);
        if trimmed.len() != item.len() {
            self.policy_violation(
                PolicyId::LinkItemWhitespace,
                GraphError::WhitespaceLinkItem {
                    target: self.target(id).name.to_string(),
                    item: item.to_string(),
                },
                backtrace,
            )?;
        }
        Ok(trimmed.to_string())
    }

    /// Evaluate a link-library valued property into items.
    ///
    /// Returns the items and whether the evaluation depended on `head`.
    pub(crate) fn expand_link_items(
        &self,
        id: TargetId,
        prop: Prop,
        value: &str,
        config: &ConfigId,
        head: TargetId,
        usage_requirements_only: bool,
    ) -> (Vec<LinkItem>, bool) {
        let target = self.target(id);
        let root = DagChecker::root(id, prop);
        let ctx = EvalContext::new(*config, head, id, &target.backtrace)
            .with_dag(&root)
            .usage_requirements_only(usage_requirements_only);
        let evaluation = self.evaluate(value, &ctx);
        let from_genex = has_genex(value);

        let items = self.lookup_link_items(id, &evaluation.values, from_genex);
        (items, evaluation.head_sensitive)
    }

    /// Resolve already-evaluated names, skipping the target itself.
    pub(crate) fn lookup_link_items(&self, id: TargetId, names: &[String], from_genex: bool) -> Vec<LinkItem> {
        let target = self.target(id);
        let mut items = Vec::new();
        for name in names {
            if name.is_empty() || name.as_str() == target.name.as_str() {
                continue;
            }
            // Object libraries are only diagnosed among a target's own link
            // libraries; interfaces naming one leave it out silently.
            let object_library = self
                .project
                .find_target(name)
                .is_some_and(|found| self.target(found).kind == TargetKind::ObjectLibrary);
            if object_library {
                continue;
            }
            let Ok(resolved) = self.find_target_to_link(id, name, &target.backtrace) else {
                continue;
            };
            let mut item = LinkItem::new(name.clone(), resolved, target.backtrace.clone());
            item.from_genex = from_genex;
            items.push(item);
        }
        items
    }

    /// Split a plain list value into resolved items.
    pub(crate) fn lookup_link_list(&self, id: TargetId, value: &str) -> Vec<LinkItem> {
        self.lookup_link_items(id, &expand_list(value), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_link_item_identity() {
        let a = LinkItem::new("core", Some(TargetId(1)), Backtrace::empty());
        let alias = LinkItem::new("ns::core", Some(TargetId(1)), Backtrace::empty());
        let external = LinkItem::new("core", None, Backtrace::empty());

        assert_eq!(a, alias);
        assert_ne!(a, external);
        assert_eq!(external, LinkItem::new("core", None, Backtrace::empty()));

        let set: HashSet<LinkItem> = [a, alias, external].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
