//! Build configuration identifiers.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::util::InternedString;

/// A build configuration such as `Debug` or `Release`.
///
/// Configuration names are case-insensitive. A `ConfigId` keeps the spelling
/// the author used (returned by `$<CONFIG>`) but compares, hashes and orders
/// by the upper-cased key. The empty configuration is valid and stands for
/// single-configuration builds with no build type.
#[derive(Clone, Copy)]
pub struct ConfigId {
    name: InternedString,
    key: InternedString,
}

impl ConfigId {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = InternedString::new(name.as_ref().trim());
        ConfigId {
            name,
            key: name.to_ascii_uppercase(),
        }
    }

    /// The configuration used when a project declares none.
    pub fn none() -> Self {
        ConfigId::new("")
    }

    /// The spelling used by the project author.
    pub fn name(&self) -> &'static str {
        self.name.as_str()
    }

    /// The normalised key.
    pub fn key(&self) -> InternedString {
        self.key
    }

    pub fn is_none(&self) -> bool {
        self.key.is_empty()
    }

    /// Key used where a configuration has to be spelled out even when empty.
    pub fn suffix(&self) -> &'static str {
        if self.is_none() {
            "NOCONFIG"
        } else {
            self.key.as_str()
        }
    }

    /// Case-insensitive comparison against a raw name.
    pub fn matches(&self, name: &str) -> bool {
        self.key.eq_ignore_ascii_case(name.trim())
    }
}

impl Default for ConfigId {
    fn default() -> Self {
        ConfigId::none()
    }
}

impl PartialEq for ConfigId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ConfigId {}

impl Hash for ConfigId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state)
    }
}

impl PartialOrd for ConfigId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfigId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Debug for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigId({:?})", self.name.as_str())
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

impl From<&str> for ConfigId {
    fn from(s: &str) -> Self {
        ConfigId::new(s)
    }
}

impl Serialize for ConfigId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ConfigId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ConfigId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_identity() {
        let a = ConfigId::new("Debug");
        let b = ConfigId::new("DEBUG");
        assert_eq!(a, b);
        assert_eq!(a.name(), "Debug");
        assert_eq!(b.name(), "DEBUG");
        assert!(a.matches("debug"));
    }

    #[test]
    fn test_empty_config_suffix() {
        assert_eq!(ConfigId::none().suffix(), "NOCONFIG");
        assert_eq!(ConfigId::new("RelWithDebInfo").suffix(), "RELWITHDEBINFO");
    }
}
