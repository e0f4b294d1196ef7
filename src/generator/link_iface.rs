//! Link interface: what dependents of a target must link to.

use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;

use crate::core::{ConfigId, PolicyId, PolicyStatus, Prop, TargetId, TargetKind};
use crate::util::diagnostic::Severity;

use super::cache::{CacheSlot, HeadMap, HeadSensitive};
use super::errors::GraphError;
use super::link_impl::LinkItem;
use super::Engine;

/// The link interface of a target for one (configuration, head).
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkInterface {
    /// Whether the target has a link interface at all
    pub exists: bool,
    pub libraries: Vec<LinkItem>,
    /// Shared libraries needed at runtime but not part of the interface
    pub shared_deps: Vec<LinkItem>,
    /// How many times a cycle of static libraries is repeated
    pub multiplicity: u32,
    /// Language runtimes dependents must link
    pub languages: Vec<String>,
    /// The interface came from an explicit property
    pub explicit: bool,
    /// The link implementation doubles as the interface
    pub implementation_is_interface: bool,
    pub wrong_config_libraries: Vec<LinkItem>,
    pub head_sensitive: bool,
}

impl HeadSensitive for LinkInterface {
    fn head_sensitive(&self) -> bool {
        self.head_sensitive
    }
}

impl LinkInterface {
    fn absent() -> Self {
        LinkInterface {
            multiplicity: 1,
            ..Default::default()
        }
    }
}

impl Engine {
    /// The complete link interface of `id` as seen by `head`.
    pub fn link_interface(&self, id: TargetId, config: &ConfigId, head: TargetId) -> Rc<LinkInterface> {
        self.cached_link_interface(id, config, head, false)
    }

    /// The link interface, with `$<LINK_ONLY:...>` dropped when
    /// `usage_requirements_only` is set.
    ///
    /// Usage-only evaluations stop at the libraries and are cached apart.
    pub fn link_interface_libraries(
        &self,
        id: TargetId,
        config: &ConfigId,
        head: TargetId,
        usage_requirements_only: bool,
    ) -> Rc<LinkInterface> {
        self.cached_link_interface(id, config, head, usage_requirements_only)
    }

    fn cached_link_interface(
        &self,
        id: TargetId,
        config: &ConfigId,
        head: TargetId,
        usage_only: bool,
    ) -> Rc<LinkInterface> {
        let cache = self.cache(id);
        let slots = if usage_only {
            &cache.link_iface_usage
        } else {
            &cache.link_iface
        };

        let slot = slots.borrow().get(config).and_then(|map| map.get(head));
        match slot {
            Some(CacheSlot::Done(hit)) => return hit,
            Some(CacheSlot::InProgress) => return Rc::new(LinkInterface::absent()),
            None => {}
        }

        slots
            .borrow_mut()
            .entry(*config)
            .or_insert_with(HeadMap::default)
            .set(head, CacheSlot::InProgress);

        tracing::debug!(
            "computing link interface of `{}` for `{}`{}",
            self.target(id).name,
            config,
            if usage_only { " (usage requirements)" } else { "" }
        );
        let iface = Rc::new(self.compute_link_interface(id, config, head, usage_only));

        slots
            .borrow_mut()
            .entry(*config)
            .or_insert_with(HeadMap::default)
            .set(head, CacheSlot::Done(Rc::clone(&iface)));
        iface
    }

    fn compute_link_interface(
        &self,
        id: TargetId,
        config: &ConfigId,
        head: TargetId,
        usage_only: bool,
    ) -> LinkInterface {
        let target = self.target(id);
        let mut iface = LinkInterface::absent();

        if target.imported {
            self.imported_link_interface(id, config, head, usage_only, &mut iface);
            return iface;
        }

        if target.kind == TargetKind::Executable && !target.is_executable_with_exports() {
            return iface;
        }

        let status = self.policy(PolicyId::LinkInterfaceProperty);
        let explicit = self.explicit_link_interface(id, config, status);

        if explicit.is_none() && matches!(target.kind, TargetKind::Executable | TargetKind::ModuleLibrary) {
            return iface;
        }

        iface.exists = true;
        iface.explicit = !status.is_legacy() || explicit.is_some();

        match explicit {
            Some((prop, value)) => {
                let (libraries, head_sensitive) =
                    self.expand_link_items(id, prop, &value, config, head, usage_only);
                iface.libraries = libraries;
                iface.head_sensitive = head_sensitive;
            }
            None if status.is_legacy() => {
                let implementation = self.link_implementation_libraries(id, config, head);
                iface.libraries = implementation.libraries.clone();
                iface.wrong_config_libraries = implementation.wrong_config_libraries.clone();
                iface.head_sensitive = implementation.head_sensitive;
                iface.implementation_is_interface = true;

                if status == PolicyStatus::Warn && !usage_only {
                    self.check_implied_interface(id, config, head, &iface.libraries);
                }
            }
            None => {}
        }

        if usage_only {
            return iface;
        }

        if iface.explicit
            && matches!(
                target.kind,
                TargetKind::StaticLibrary | TargetKind::SharedLibrary | TargetKind::InterfaceLibrary
            )
        {
            iface.shared_deps = self.runtime_shared_deps(id, config, &iface.libraries);
        }

        if target.kind.link_language_propagates() {
            iface.languages = self.link_implementation(id, config).languages.clone();
        }

        if target.kind == TargetKind::StaticLibrary {
            iface.multiplicity = parse_multiplicity(
                target
                    .properties
                    .lookup(Prop::LinkInterfaceMultiplicity, Some(config))
                    .map(|v| v.as_string())
                    .as_deref(),
            );
        }

        iface
    }

    /// The explicitly set interface property and its raw value.
    fn explicit_link_interface(
        &self,
        id: TargetId,
        config: &ConfigId,
        status: PolicyStatus,
    ) -> Option<(Prop, String)> {
        let target = self.target(id);

        if !status.is_legacy() {
            let value = target.properties.get(Prop::InterfaceLinkLibraries)?.as_string();
            return Some((Prop::InterfaceLinkLibraries, value));
        }

        if target.kind != TargetKind::SharedLibrary && !target.is_executable_with_exports() {
            return None;
        }

        let value = target
            .properties
            .lookup(Prop::LinkInterfaceLibraries, Some(config))?
            .as_string();

        if status == PolicyStatus::Warn && !self.cache(id).interface_mismatch_warned.get() {
            if let Some(current) = target.properties.get(Prop::InterfaceLinkLibraries) {
                if current.as_string() != value {
                    self.warn_interface_mismatch(id, Prop::LinkInterfaceLibraries.name());
                }
            }
        }

        Some((Prop::LinkInterfaceLibraries, value))
    }

    /// Under the legacy rule the implementation is the interface; say so when
    /// `INTERFACE_LINK_LIBRARIES` would have produced something else. An
    /// unset property counts as an empty list.
    fn check_implied_interface(&self, id: TargetId, config: &ConfigId, head: TargetId, libraries: &[LinkItem]) {
        if self.cache(id).interface_mismatch_warned.get() {
            return;
        }
        let preferred = match self.target(id).properties.get(Prop::InterfaceLinkLibraries) {
            Some(value) => {
                self.expand_link_items(id, Prop::InterfaceLinkLibraries, &value.as_string(), config, head, false)
                    .0
            }
            None => Vec::new(),
        };
        if preferred.as_slice() != libraries {
            self.warn_interface_mismatch(id, Prop::LinkLibraries.name());
        }
    }

    fn warn_interface_mismatch(&self, id: TargetId, legacy: &str) {
        let target = self.target(id);
        self.cache(id).interface_mismatch_warned.set(true);
        let policy = PolicyId::LinkInterfaceProperty;
        self.report(
            GraphError::ConflictingLinkInterface {
                target: target.name.to_string(),
                legacy: legacy.to_string(),
            }
            .to_diagnostic(Severity::Warning, &target.backtrace)
            .with_context(policy.warning_context()),
        );
    }

    /// Implementation libraries outside the interface that are shared
    /// libraries, needed at runtime by dependents.
    fn runtime_shared_deps(&self, id: TargetId, config: &ConfigId, interface: &[LinkItem]) -> Vec<LinkItem> {
        if self.target(id).kind == TargetKind::InterfaceLibrary {
            return Vec::new();
        }

        let mut emitted: HashSet<LinkItem> = interface.iter().cloned().collect();
        let implementation = self.link_implementation(id, config);
        implementation
            .libraries
            .iter()
            .filter(|item| emitted.insert((*item).clone()))
            .filter(|item| {
                item.target
                    .is_some_and(|dep| self.target(dep).kind == TargetKind::SharedLibrary)
            })
            .cloned()
            .collect()
    }

    fn imported_link_interface(
        &self,
        id: TargetId,
        config: &ConfigId,
        head: TargetId,
        usage_only: bool,
        iface: &mut LinkInterface,
    ) {
        let target = self.target(id);
        if target.kind != TargetKind::InterfaceLibrary && !target.has_import_location() {
            return;
        }
        iface.exists = true;
        iface.explicit = true;

        // INTERFACE_LINK_LIBRARIES wins; libraries fall back to the
        // per-configuration, then generic, imported property.
        let properties = &target.properties;
        let source = properties
            .get(Prop::InterfaceLinkLibraries)
            .map(|v| (Prop::InterfaceLinkLibraries, v))
            .or_else(|| {
                (target.kind != TargetKind::InterfaceLibrary)
                    .then(|| properties.lookup(Prop::ImportedLinkInterfaceLibraries, Some(config)))
                    .flatten()
                    .map(|v| (Prop::ImportedLinkInterfaceLibraries, v))
            });

        if let Some((prop, value)) = source {
            let (libraries, head_sensitive) =
                self.expand_link_items(id, prop, &value.as_string(), config, head, usage_only);
            iface.libraries = libraries;
            iface.head_sensitive = head_sensitive;
        }

        if usage_only {
            return;
        }

        if let Some(deps) = properties.lookup(Prop::ImportedLinkDependentLibraries, Some(config)) {
            iface.shared_deps = self.lookup_link_list(id, &deps.as_string());
        }
        iface.languages = properties.get_list(Prop::ImportedLinkInterfaceLanguages, Some(config));
        iface.multiplicity = parse_multiplicity(
            properties
                .lookup(Prop::ImportedLinkInterfaceMultiplicity, Some(config))
                .map(|v| v.as_string())
                .as_deref(),
        );
    }
}

/// Repetition count for static library cycles: leading decimal digits,
/// 1 when unset or unparseable.
fn parse_multiplicity(value: Option<&str>) -> u32 {
    let Some(value) = value else {
        return 1;
    };
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiplicity() {
        assert_eq!(parse_multiplicity(None), 1);
        assert_eq!(parse_multiplicity(Some("3")), 3);
        assert_eq!(parse_multiplicity(Some(" 2x")), 2);
        assert_eq!(parse_multiplicity(Some("many")), 1);
        assert_eq!(parse_multiplicity(Some("0")), 0);
    }

    #[test]
    fn test_absent_interface() {
        let iface = LinkInterface::absent();
        assert!(!iface.exists);
        assert!(iface.libraries.is_empty());
        assert_eq!(iface.multiplicity, 1);
    }
}
