//! Compatible interface properties.
//!
//! A dependency may declare, through one of the `COMPATIBLE_INTERFACE_*`
//! lists, that every consumer linking it must agree on the value of a
//! property. The consumer's own value is combined with the `INTERFACE_<name>`
//! value of each target in its link implementation closure: booleans and
//! strings must be equal, numbers resolve to their minimum or maximum.

use std::collections::BTreeSet;
use std::rc::Rc;

use serde::Serialize;

use crate::core::property::parse_integer;
use crate::core::{ConfigId, Prop, TargetId, TargetKind};
use crate::util::diagnostic::Diagnostic;

use super::cache::CacheSlot;
use super::errors::{Fatal, GraphError};
use super::Engine;

/// How a compatible property combines across dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompatibleKind {
    Bool,
    String,
    NumberMin,
    NumberMax,
}

impl CompatibleKind {
    pub const ALL: [CompatibleKind; 4] = [
        CompatibleKind::Bool,
        CompatibleKind::String,
        CompatibleKind::NumberMin,
        CompatibleKind::NumberMax,
    ];

    /// The declaration list naming properties of this kind.
    pub fn list_prop(&self) -> Prop {
        match self {
            CompatibleKind::Bool => Prop::CompatibleInterfaceBool,
            CompatibleKind::String => Prop::CompatibleInterfaceString,
            CompatibleKind::NumberMin => Prop::CompatibleInterfaceNumberMin,
            CompatibleKind::NumberMax => Prop::CompatibleInterfaceNumberMax,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            CompatibleKind::Bool => "Boolean compatibility",
            CompatibleKind::String => "String compatibility",
            CompatibleKind::NumberMin => "Numeric minimum compatibility",
            CompatibleKind::NumberMax => "Numeric maximum compatibility",
        }
    }

    /// Report word for one combination step.
    fn step(&self, dominant: bool) -> &'static str {
        match (self, dominant) {
            (CompatibleKind::Bool | CompatibleKind::String, false) => "(Agree)",
            (CompatibleKind::Bool | CompatibleKind::String, true) => "(Disagree)",
            (_, false) => "(Ignored)",
            (_, true) => "(Dominant)",
        }
    }
}

/// Property names declared compatible by a target's dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompatibleInterfaces {
    pub bools: BTreeSet<String>,
    pub strings: BTreeSet<String>,
    pub numbers_min: BTreeSet<String>,
    pub numbers_max: BTreeSet<String>,
}

impl CompatibleInterfaces {
    pub fn names(&self, kind: CompatibleKind) -> &BTreeSet<String> {
        match kind {
            CompatibleKind::Bool => &self.bools,
            CompatibleKind::String => &self.strings,
            CompatibleKind::NumberMin => &self.numbers_min,
            CompatibleKind::NumberMax => &self.numbers_max,
        }
    }

    fn names_mut(&mut self, kind: CompatibleKind) -> &mut BTreeSet<String> {
        match kind {
            CompatibleKind::Bool => &mut self.bools,
            CompatibleKind::String => &mut self.strings,
            CompatibleKind::NumberMin => &mut self.numbers_min,
            CompatibleKind::NumberMax => &mut self.numbers_max,
        }
    }

    /// The first kind, in declaration order, that lists `name`.
    pub fn kind_of(&self, name: &str) -> Option<CompatibleKind> {
        CompatibleKind::ALL
            .into_iter()
            .find(|kind| self.names(*kind).contains(name))
    }
}

/// Where the consumer's own value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Start {
    Explicit,
    Implied,
    Unset,
}

/// Combine two values. `None` is a conflict; otherwise the combined value
/// and whether it came from the right-hand side.
fn consistent(lhs: Option<&str>, rhs: Option<&str>, kind: CompatibleKind) -> Option<(Option<String>, bool)> {
    let (lhs, rhs) = match (lhs, rhs) {
        (None, None) => return Some((None, false)),
        (None, Some(rhs)) => return Some((Some(rhs.to_string()), true)),
        (Some(lhs), None) => return Some((Some(lhs.to_string()), false)),
        (Some(lhs), Some(rhs)) => (lhs, rhs),
    };

    match kind {
        CompatibleKind::Bool | CompatibleKind::String => {
            (lhs == rhs).then(|| (Some(lhs.to_string()), false))
        }
        CompatibleKind::NumberMin | CompatibleKind::NumberMax => {
            let l = parse_integer(lhs)?;
            let r = parse_integer(rhs)?;
            let take_rhs = match kind {
                CompatibleKind::NumberMax => r > l,
                _ => r < l,
            };
            let value = if take_rhs { rhs } else { lhs };
            Some((Some(value.to_string()), take_rhs))
        }
    }
}

fn bool_text(on: bool) -> &'static str {
    if on {
        "TRUE"
    } else {
        "FALSE"
    }
}

impl Engine {
    /// Compatible property names declared across the link implementation
    /// closure of `id`.
    pub fn compatible_interfaces(&self, id: TargetId, config: &ConfigId) -> Rc<CompatibleInterfaces> {
        let slot = self.cache(id).compatible.borrow().get(config).cloned();
        match slot {
            Some(CacheSlot::Done(hit)) => return hit,
            Some(CacheSlot::InProgress) => return Rc::new(CompatibleInterfaces::default()),
            None => {}
        }
        if self.link_implementation_in_progress(id, config) {
            return Rc::new(CompatibleInterfaces::default());
        }

        self.cache(id)
            .compatible
            .borrow_mut()
            .insert(*config, CacheSlot::InProgress);

        let mut interfaces = CompatibleInterfaces::default();
        if !matches!(
            self.target(id).kind,
            TargetKind::ObjectLibrary | TargetKind::InterfaceLibrary
        ) {
            interfaces
                .bools
                .insert(Prop::PositionIndependentCode.name().to_string());
            for dep in self.link_implementation_closure(id, config).iter() {
                let properties = &self.target(*dep).properties;
                for kind in CompatibleKind::ALL {
                    interfaces
                        .names_mut(kind)
                        .extend(properties.get_list(kind.list_prop(), Some(config)));
                }
            }
        }

        let interfaces = Rc::new(interfaces);
        self.cache(id)
            .compatible
            .borrow_mut()
            .insert(*config, CacheSlot::Done(Rc::clone(&interfaces)));
        interfaces
    }

    pub fn compatible_bool(&self, id: TargetId, name: &str, config: &ConfigId) -> bool {
        let value = self
            .consistent_property(id, name, config, CompatibleKind::Bool)
            .unwrap_or_else(|partial| partial);
        value.as_deref() == Some(bool_text(true))
    }

    pub fn compatible_string(&self, id: TargetId, name: &str, config: &ConfigId) -> Option<String> {
        self.consistent_property(id, name, config, CompatibleKind::String)
            .unwrap_or_else(|partial| partial)
    }

    pub fn compatible_number_min(&self, id: TargetId, name: &str, config: &ConfigId) -> Option<String> {
        self.consistent_property(id, name, config, CompatibleKind::NumberMin)
            .unwrap_or_else(|partial| partial)
    }

    pub fn compatible_number_max(&self, id: TargetId, name: &str, config: &ConfigId) -> Option<String> {
        self.consistent_property(id, name, config, CompatibleKind::NumberMax)
            .unwrap_or_else(|partial| partial)
    }

    /// The agreed value of `name` when it is a compatible property of `id`.
    ///
    /// Booleans render as `1`/`0`, unset strings and numbers as empty.
    pub fn compatible_value(&self, id: TargetId, name: &str, config: &ConfigId) -> Option<String> {
        if matches!(
            self.target(id).kind,
            TargetKind::ObjectLibrary | TargetKind::InterfaceLibrary
        ) {
            return None;
        }
        let kind = self.compatible_interfaces(id, config).kind_of(name)?;
        let value = match kind {
            CompatibleKind::Bool => {
                let on = self.compatible_bool(id, name, config);
                (if on { "1" } else { "0" }).to_string()
            }
            CompatibleKind::String => self.compatible_string(id, name, config).unwrap_or_default(),
            CompatibleKind::NumberMin => self.compatible_number_min(id, name, config).unwrap_or_default(),
            CompatibleKind::NumberMax => self.compatible_number_max(id, name, config).unwrap_or_default(),
        };
        Some(value)
    }

    /// A property value as the combination step sees it. Booleans are
    /// normalized so equal truth values compare equal.
    fn compat_read(&self, id: TargetId, prop: Prop, config: &ConfigId, kind: CompatibleKind) -> Option<String> {
        let properties = &self.target(id).properties;
        let value = properties.lookup(prop, Some(config))?;
        Some(match kind {
            CompatibleKind::Bool => bool_text(value.is_on()).to_string(),
            _ => value.as_string(),
        })
    }

    /// Walk the closure combining `name`.
    ///
    /// On a conflict the error is reported and `Err` carries the value agreed
    /// so far.
    fn consistent_property(
        &self,
        id: TargetId,
        name: &str,
        config: &ConfigId,
        kind: CompatibleKind,
    ) -> Result<Option<String>, Option<String>> {
        let deps = self.link_implementation_closure(id, config);
        let target = self.target(id);
        let prop = Prop::from_name(name);

        let own = self.compat_read(id, prop, config, kind);
        if deps.is_empty() {
            return Ok(match kind {
                CompatibleKind::Bool => Some(own.unwrap_or_else(|| bool_text(false).to_string())),
                _ => own,
            });
        }

        let start = if own.is_some() {
            Start::Explicit
        } else if self.cache(id).implied_null.borrow().contains(name) {
            Start::Implied
        } else {
            Start::Unset
        };

        let mut report = format!(" * Target \"{}\"", target.name);
        let mut value = match start {
            Start::Explicit => {
                report.push_str(&format!(
                    " has property content \"{}\"\n",
                    own.as_deref().unwrap_or_default()
                ));
                own
            }
            Start::Implied => {
                report.push_str(" property is implied by use.\n");
                Some(match kind {
                    CompatibleKind::Bool => bool_text(false).to_string(),
                    _ => String::new(),
                })
            }
            Start::Unset => {
                report.push_str(" property not set.\n");
                match kind {
                    CompatibleKind::Bool => Some(bool_text(false).to_string()),
                    _ => None,
                }
            }
        };

        let interface_prop = Prop::custom(format!("INTERFACE_{}", name));
        let mut seeded = false;
        let mut failure = None;

        for dep in deps.iter().copied() {
            let Some(dep_value) = self.compat_read(dep, interface_prop, config, kind) else {
                continue;
            };
            let dep_name = self.target(dep).name;
            report.push_str(&format!(
                " * Target \"{}\" property value \"{}\" ",
                dep_name, dep_value
            ));

            if start == Start::Unset && !seeded {
                report.push_str("(Interface set)\n");
                value = Some(dep_value);
                seeded = true;
                continue;
            }

            match consistent(value.as_deref(), Some(&dep_value), kind) {
                Some((combined, dominant)) => {
                    report.push_str(kind.step(dominant));
                    report.push('\n');
                    value = combined;
                }
                None => {
                    report.push_str(kind.step(true));
                    report.push('\n');
                    let (target, property, dependency) =
                        (target.name.to_string(), name.to_string(), dep_name.to_string());
                    failure = Some(match start {
                        Start::Explicit => GraphError::CompatibleExplicitMismatch {
                            target,
                            property,
                            dependency,
                        },
                        Start::Implied => GraphError::CompatibleImpliedMismatch {
                            target,
                            property,
                            dependency,
                            implied: match kind {
                                CompatibleKind::Bool => "FALSE",
                                _ => "empty",
                            },
                        },
                        Start::Unset => GraphError::CompatibleSeededMismatch {
                            target,
                            property,
                            dependency,
                        },
                    });
                    break;
                }
            }
        }

        self.compat_debug_report(id, name, kind, value.as_deref(), &report);

        match failure {
            Some(err) => {
                self.fail(err, &target.backtrace);
                Err(value)
            }
            None => Ok(value),
        }
    }

    fn compat_debug_report(&self, id: TargetId, name: &str, kind: CompatibleKind, value: Option<&str>, report: &str) {
        if !self.config.debug.traces(name) {
            return;
        }
        if !self.cache(id).compat_logged.borrow_mut().insert(name.to_string()) {
            return;
        }
        let target = self.target(id);
        let shown = match (kind, value) {
            (_, Some(value)) => value,
            (CompatibleKind::Bool, None) => bool_text(false),
            (_, None) => "(unset)",
        };
        self.report(
            Diagnostic::note(format!(
                "{} of property \"{}\" for target \"{}\" (result: \"{}\"):\n{}",
                kind.description(),
                name,
                target.name,
                shown,
                report
            ))
            .with_backtrace(target.backtrace.clone()),
        );
    }

    /// Validate every compatible property declared by the closure of `id`.
    ///
    /// Returns `false` when an error was reported.
    pub fn check_property_compatibility(&self, id: TargetId, config: &ConfigId) -> bool {
        self.check_compatibility(id, config).is_ok()
    }

    fn check_compatibility(&self, id: TargetId, config: &ConfigId) -> Result<(), Fatal> {
        let mut emitted: [BTreeSet<String>; 4] = Default::default();

        for dep in self.link_implementation_closure(id, config).iter().copied() {
            let dependency = self.target(dep);
            if dependency.kind == TargetKind::ObjectLibrary {
                continue;
            }
            for (index, kind) in CompatibleKind::ALL.into_iter().enumerate() {
                let list = kind.list_prop();
                for name in dependency.properties.get_list(list, Some(config)) {
                    if Prop::from_name(&name).is_builtin() {
                        return Err(self.fail(
                            GraphError::BuiltinCompatibleProperty {
                                dependency: dependency.name.to_string(),
                                property: name,
                                list: list.name(),
                            },
                            &dependency.backtrace,
                        ));
                    }
                    if emitted[index].insert(name.clone()) {
                        self.consistent_property(id, &name, config, kind)
                            .map_err(|_| Fatal)?;
                    }
                }
            }
        }

        let all: BTreeSet<&String> = emitted.iter().flatten().collect();
        let mut result = Ok(());
        for name in all {
            let mut lists: Vec<&'static str> = CompatibleKind::ALL
                .into_iter()
                .enumerate()
                .filter(|(index, _)| emitted[*index].contains(name))
                .map(|(_, kind)| kind.list_prop().name())
                .collect();
            if lists.len() < 2 {
                continue;
            }
            lists.sort_unstable();
            let Some(last) = lists.pop() else {
                continue;
            };
            let target = self.target(id);
            result = Err(self.fail(
                GraphError::CompatibleKindConflict {
                    target: target.name.to_string(),
                    property: name.clone(),
                    kinds: format!("{} and the {}", lists.join(", "), last),
                },
                &target.backtrace,
            ));
        }
        result
    }
}
