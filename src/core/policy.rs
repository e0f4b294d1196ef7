//! Compatibility policies.
//!
//! Every place where legacy and current behaviour diverge asks a
//! [`PolicyOracle`] which side to take. The oracle is injected into the
//! engine; [`PolicyMap`] is the configurable implementation used by the
//! loader and CLI, where unset policies default to `New`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::diagnostic::Severity;

/// A behavioural fork with a legacy and a current side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyId {
    /// Leading/trailing whitespace in link item names.
    LinkItemWhitespace,
    /// Relative paths in a target's own include directories.
    RelativeIncludeDirectories,
    /// Which property defines a target's exported link interface.
    LinkInterfaceProperty,
    /// Nonexistent include directories of imported targets.
    ImportedIncludeExistence,
    /// Unresolved `Pkg::name` link items.
    AliasTargetMissing,
    /// A target listing itself among its link libraries.
    SelfLink,
    /// Per-configuration `COMPILE_DEFINITIONS` values.
    ConfigCompileDefinitions,
}

impl PolicyId {
    pub const ALL: [PolicyId; 7] = [
        PolicyId::LinkItemWhitespace,
        PolicyId::RelativeIncludeDirectories,
        PolicyId::LinkInterfaceProperty,
        PolicyId::ImportedIncludeExistence,
        PolicyId::AliasTargetMissing,
        PolicyId::SelfLink,
        PolicyId::ConfigCompileDefinitions,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PolicyId::LinkItemWhitespace => "link-item-whitespace",
            PolicyId::RelativeIncludeDirectories => "relative-include-directories",
            PolicyId::LinkInterfaceProperty => "link-interface-property",
            PolicyId::ImportedIncludeExistence => "imported-include-existence",
            PolicyId::AliasTargetMissing => "alias-target-missing",
            PolicyId::SelfLink => "self-link",
            PolicyId::ConfigCompileDefinitions => "config-compile-definitions",
        }
    }

    /// One-line statement of the current behaviour.
    pub fn summary(&self) -> &'static str {
        match self {
            PolicyId::LinkItemWhitespace => {
                "Library names may not have leading or trailing whitespace."
            }
            PolicyId::RelativeIncludeDirectories => {
                "Relative paths are not allowed in INCLUDE_DIRECTORIES."
            }
            PolicyId::LinkInterfaceProperty => {
                "INTERFACE_LINK_LIBRARIES defines the link interface."
            }
            PolicyId::ImportedIncludeExistence => {
                "Include directories of imported targets must exist."
            }
            PolicyId::AliasTargetMissing => {
                "A double colon in a link item means an ALIAS or IMPORTED target."
            }
            PolicyId::SelfLink => "Targets may not link directly to themselves.",
            PolicyId::ConfigCompileDefinitions => {
                "Per-configuration COMPILE_DEFINITIONS are ignored."
            }
        }
    }

    /// Context line attached to diagnostics emitted under `Warn`.
    pub fn warning_context(&self) -> String {
        format!(
            "policy `{}` is not set: {} Set it to `old` or `new` to silence this warning.",
            self.name(),
            self.summary()
        )
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyId::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown policy `{}`", s))
    }
}

/// The side of a fork a project has opted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    Old,
    Warn,
    #[default]
    New,
    Required,
}

impl PolicyStatus {
    /// Legacy behaviour is still in effect.
    pub fn is_legacy(&self) -> bool {
        matches!(self, PolicyStatus::Old | PolicyStatus::Warn)
    }

    /// Severity for a construct the current behaviour rejects.
    ///
    /// `None` means the legacy side accepts it silently.
    pub fn violation_severity(&self) -> Option<Severity> {
        match self {
            PolicyStatus::Old => None,
            PolicyStatus::Warn => Some(Severity::Warning),
            PolicyStatus::New | PolicyStatus::Required => Some(Severity::Error),
        }
    }
}

impl FromStr for PolicyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "old" => Ok(PolicyStatus::Old),
            "warn" => Ok(PolicyStatus::Warn),
            "new" => Ok(PolicyStatus::New),
            "required" => Ok(PolicyStatus::Required),
            other => Err(format!(
                "invalid policy status `{}` (expected old, warn, new or required)",
                other
            )),
        }
    }
}

/// Answers which side of each fork is in effect.
pub trait PolicyOracle {
    fn status(&self, id: PolicyId) -> PolicyStatus;
}

/// Explicit policy settings; anything unset is `New`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyMap {
    settings: BTreeMap<PolicyId, PolicyStatus>,
}

impl PolicyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: PolicyId, status: PolicyStatus) -> Self {
        self.set(id, status);
        self
    }

    pub fn set(&mut self, id: PolicyId, status: PolicyStatus) {
        self.settings.insert(id, status);
    }

    /// Overlay `other` on top of this map.
    pub fn merge(&mut self, other: &PolicyMap) {
        for (id, status) in &other.settings {
            self.settings.insert(*id, *status);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PolicyId, PolicyStatus)> + '_ {
        self.settings.iter().map(|(id, status)| (*id, *status))
    }
}

impl PolicyOracle for PolicyMap {
    fn status(&self, id: PolicyId) -> PolicyStatus {
        self.settings.get(&id).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_policy_is_new() {
        let map = PolicyMap::new().with(PolicyId::SelfLink, PolicyStatus::Old);
        assert_eq!(map.status(PolicyId::SelfLink), PolicyStatus::Old);
        assert_eq!(map.status(PolicyId::LinkItemWhitespace), PolicyStatus::New);
    }

    #[test]
    fn test_violation_severity() {
        assert_eq!(PolicyStatus::Old.violation_severity(), None);
        assert_eq!(
            PolicyStatus::Warn.violation_severity(),
            Some(Severity::Warning)
        );
        assert_eq!(
            PolicyStatus::Required.violation_severity(),
            Some(Severity::Error)
        );
    }

    #[test]
    fn test_policy_map_from_toml() {
        let map: PolicyMap =
            toml::from_str("self-link = \"old\"\nlink-interface-property = \"warn\"\n").unwrap();
        assert_eq!(map.status(PolicyId::SelfLink), PolicyStatus::Old);
        assert_eq!(
            map.status(PolicyId::LinkInterfaceProperty),
            PolicyStatus::Warn
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "alias-target-missing".parse::<PolicyId>().unwrap(),
            PolicyId::AliasTargetMissing
        );
        assert!("bogus".parse::<PolicyId>().is_err());
        assert_eq!("WARN".parse::<PolicyStatus>().unwrap(), PolicyStatus::Warn);
    }
}
