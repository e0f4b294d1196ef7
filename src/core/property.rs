//! Typed target properties.
//!
//! Properties are keyed by [`Prop`], an explicit enum of every property the
//! engine interprets, plus `Custom` for author-defined names. Per-configuration
//! values live under `(Prop, Some(config))`; reads for a configuration fall back
//! to the generic value and then to the property's declared default.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::config_id::ConfigId;
use crate::util::InternedString;

/// Declared value type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    String,
    List,
}

macro_rules! props {
    ($( $variant:ident => $name:literal : $ty:ident ),* $(,)?) => {
        /// A target property the engine knows about.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Prop {
            $( $variant, )*
            /// Any property name the engine does not interpret itself.
            Custom(InternedString),
        }

        impl Prop {
            /// Every built-in property.
            pub const BUILTIN: &'static [Prop] = &[ $( Prop::$variant, )* ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Prop::$variant => $name, )*
                    Prop::Custom(name) => name.as_str(),
                }
            }

            pub fn value_type(&self) -> ValueType {
                match self {
                    $( Prop::$variant => ValueType::$ty, )*
                    Prop::Custom(_) => ValueType::String,
                }
            }

            /// Map a property name onto its kind.
            pub fn from_name(name: &str) -> Prop {
                match name {
                    $( $name => Prop::$variant, )*
                    other => Prop::Custom(InternedString::new(other)),
                }
            }
        }
    };
}

props! {
    // Usage requirements, authored through the entry store.
    IncludeDirectories => "INCLUDE_DIRECTORIES": List,
    CompileOptions => "COMPILE_OPTIONS": List,
    CompileFeatures => "COMPILE_FEATURES": List,
    CompileDefinitions => "COMPILE_DEFINITIONS": List,
    Sources => "SOURCES": List,
    LinkLibraries => "LINK_LIBRARIES": List,

    InterfaceIncludeDirectories => "INTERFACE_INCLUDE_DIRECTORIES": List,
    InterfaceCompileOptions => "INTERFACE_COMPILE_OPTIONS": List,
    InterfaceCompileFeatures => "INTERFACE_COMPILE_FEATURES": List,
    InterfaceCompileDefinitions => "INTERFACE_COMPILE_DEFINITIONS": List,
    InterfaceSources => "INTERFACE_SOURCES": List,

    // Link interface.
    InterfaceLinkLibraries => "INTERFACE_LINK_LIBRARIES": List,
    LinkInterfaceLibraries => "LINK_INTERFACE_LIBRARIES": List,
    LinkInterfaceMultiplicity => "LINK_INTERFACE_MULTIPLICITY": String,
    ImportedLocation => "IMPORTED_LOCATION": String,
    ImportedLinkInterfaceLibraries => "IMPORTED_LINK_INTERFACE_LIBRARIES": List,
    ImportedLinkDependentLibraries => "IMPORTED_LINK_DEPENDENT_LIBRARIES": List,
    ImportedLinkInterfaceLanguages => "IMPORTED_LINK_INTERFACE_LANGUAGES": List,
    ImportedLinkInterfaceMultiplicity => "IMPORTED_LINK_INTERFACE_MULTIPLICITY": String,
    EnableExports => "ENABLE_EXPORTS": Bool,

    // Languages.
    LinkerLanguage => "LINKER_LANGUAGE": String,
    HasCxx => "HAS_CXX": Bool,

    // Compatible interface declarations.
    CompatibleInterfaceBool => "COMPATIBLE_INTERFACE_BOOL": List,
    CompatibleInterfaceString => "COMPATIBLE_INTERFACE_STRING": List,
    CompatibleInterfaceNumberMin => "COMPATIBLE_INTERFACE_NUMBER_MIN": List,
    CompatibleInterfaceNumberMax => "COMPATIBLE_INTERFACE_NUMBER_MAX": List,
    PositionIndependentCode => "POSITION_INDEPENDENT_CODE": Bool,

    // Output naming.
    OutputName => "OUTPUT_NAME": String,
    ArchiveOutputName => "ARCHIVE_OUTPUT_NAME": String,
    LibraryOutputName => "LIBRARY_OUTPUT_NAME": String,
    RuntimeOutputName => "RUNTIME_OUTPUT_NAME": String,
    ArchiveOutputDirectory => "ARCHIVE_OUTPUT_DIRECTORY": String,
    LibraryOutputDirectory => "LIBRARY_OUTPUT_DIRECTORY": String,
    RuntimeOutputDirectory => "RUNTIME_OUTPUT_DIRECTORY": String,
    Prefix => "PREFIX": String,
    Suffix => "SUFFIX": String,

    // Install and symbol export.
    SkipBuildRpath => "SKIP_BUILD_RPATH": Bool,
    BuildWithInstallRpath => "BUILD_WITH_INSTALL_RPATH": Bool,
    InstallRpath => "INSTALL_RPATH": String,
    DefineSymbol => "DEFINE_SYMBOL": String,

    // Source roles.
    PublicHeader => "PUBLIC_HEADER": List,
    Resource => "RESOURCE": List,
}

impl Prop {
    pub fn custom(name: impl AsRef<str>) -> Prop {
        Prop::from_name(name.as_ref())
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Prop::Custom(_))
    }

    /// Declared default used when neither a per-config nor a generic value is set.
    pub fn default_value(&self) -> Option<PropertyValue> {
        match self {
            Prop::LinkInterfaceMultiplicity | Prop::ImportedLinkInterfaceMultiplicity => {
                Some(PropertyValue::Str("1".to_string()))
            }
            _ => match self.value_type() {
                ValueType::Bool => Some(PropertyValue::Bool(false)),
                _ => None,
            },
        }
    }

    /// The `INTERFACE_` counterpart of a usage requirement.
    pub fn interface(&self) -> Prop {
        match self {
            Prop::IncludeDirectories => Prop::InterfaceIncludeDirectories,
            Prop::CompileOptions => Prop::InterfaceCompileOptions,
            Prop::CompileFeatures => Prop::InterfaceCompileFeatures,
            Prop::CompileDefinitions => Prop::InterfaceCompileDefinitions,
            Prop::Sources => Prop::InterfaceSources,
            Prop::LinkLibraries => Prop::InterfaceLinkLibraries,
            other => Prop::custom(format!("INTERFACE_{}", other.name())),
        }
    }

    /// Usage requirements that propagate along link interfaces.
    pub fn is_transitive_usage_requirement(&self) -> bool {
        matches!(
            self,
            Prop::InterfaceIncludeDirectories
                | Prop::InterfaceCompileOptions
                | Prop::InterfaceCompileFeatures
                | Prop::InterfaceCompileDefinitions
                | Prop::InterfaceSources
        )
    }
}

impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Str(String),
    List(Vec<String>),
}

impl PropertyValue {
    /// Render as a single string; lists are `;`-joined.
    pub fn as_string(&self) -> String {
        match self {
            PropertyValue::Bool(true) => "ON".to_string(),
            PropertyValue::Bool(false) => "OFF".to_string(),
            PropertyValue::Str(s) => s.clone(),
            PropertyValue::List(items) => items.join(";"),
        }
    }

    /// Expand into list elements, dropping empty ones.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            PropertyValue::List(items) => items
                .iter()
                .flat_map(|item| expand_list(item))
                .collect(),
            other => expand_list(&other.as_string()),
        }
    }

    pub fn is_on(&self) -> bool {
        match self {
            PropertyValue::Bool(b) => *b,
            other => is_on(&other.as_string()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(items: Vec<String>) -> Self {
        PropertyValue::List(items)
    }
}

impl From<&[&str]> for PropertyValue {
    fn from(items: &[&str]) -> Self {
        PropertyValue::List(items.iter().map(|s| s.to_string()).collect())
    }
}

/// Property storage for one target.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    values: BTreeMap<(Prop, Option<ConfigId>), PropertyValue>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, prop: Prop, value: impl Into<PropertyValue>) {
        self.values.insert((prop, None), value.into());
    }

    pub fn set_for_config(&mut self, prop: Prop, config: ConfigId, value: impl Into<PropertyValue>) {
        self.values.insert((prop, Some(config)), value.into());
    }

    pub fn remove(&mut self, prop: Prop) -> Option<PropertyValue> {
        self.values.remove(&(prop, None))
    }

    /// The generic value, ignoring per-config overrides and defaults.
    pub fn get(&self, prop: Prop) -> Option<&PropertyValue> {
        self.values.get(&(prop, None))
    }

    /// The value set for exactly `config`.
    pub fn get_config(&self, prop: Prop, config: &ConfigId) -> Option<&PropertyValue> {
        self.values.get(&(prop, Some(*config)))
    }

    /// Per-config value, then the generic value.
    pub fn lookup(&self, prop: Prop, config: Option<&ConfigId>) -> Option<&PropertyValue> {
        config
            .and_then(|c| self.get_config(prop, c))
            .or_else(|| self.get(prop))
    }

    pub fn is_set(&self, prop: Prop) -> bool {
        self.values.contains_key(&(prop, None))
    }

    pub fn get_bool(&self, prop: Prop, config: Option<&ConfigId>) -> bool {
        match self.lookup(prop, config) {
            Some(value) => value.is_on(),
            None => prop.default_value().is_some_and(|v| v.is_on()),
        }
    }

    pub fn get_string(&self, prop: Prop, config: Option<&ConfigId>) -> Option<String> {
        self.lookup(prop, config)
            .map(PropertyValue::as_string)
            .or_else(|| prop.default_value().map(|v| v.as_string()))
    }

    pub fn get_list(&self, prop: Prop, config: Option<&ConfigId>) -> Vec<String> {
        self.lookup(prop, config)
            .map(PropertyValue::as_list)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Prop, Option<&ConfigId>, &PropertyValue)> {
        self.values
            .iter()
            .map(|((prop, config), value)| (*prop, config.as_ref(), value))
    }
}

/// Split a `;`-separated list, dropping empty elements.
///
/// Semicolons nested inside `$<...>` are kept so expressions stay intact.
pub fn expand_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek() == Some(&'<') => {
                depth += 1;
                current.push(c);
            }
            '>' if depth > 0 => {
                depth -= 1;
                current.push(c);
            }
            ';' if depth == 0 => {
                if !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

/// True for `1`, `ON`, `YES`, `TRUE`, `Y` or a non-zero number.
pub fn is_on(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    match upper.as_str() {
        "1" | "ON" | "YES" | "TRUE" | "Y" => true,
        other => other.parse::<f64>().is_ok_and(|n| n != 0.0),
    }
}

/// True for empty strings, false constants and `*-NOTFOUND`.
pub fn is_off(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    match upper.as_str() {
        "" | "0" | "OFF" | "NO" | "FALSE" | "N" | "IGNORE" | "NOTFOUND" => true,
        other => other.ends_with("-NOTFOUND"),
    }
}

/// Parse an integer the way C `strtol` does with base 0.
///
/// Accepts an optional sign, then `0x` hex, a leading `0` for octal, or
/// decimal. The whole string must be consumed.
pub fn parse_integer(value: &str) -> Option<i64> {
    let s = value.trim_start();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_roundtrips_builtins() {
        for prop in Prop::BUILTIN {
            assert_eq!(Prop::from_name(prop.name()), *prop);
        }
        assert_eq!(Prop::from_name("MAXVER"), Prop::custom("MAXVER"));
        assert!(!Prop::from_name("MAXVER").is_builtin());
    }

    #[test]
    fn test_config_lookup_precedence() {
        let debug = ConfigId::new("Debug");
        let release = ConfigId::new("Release");
        let mut map = PropertyMap::new();
        map.set(Prop::OutputName, "core");
        map.set_for_config(Prop::OutputName, debug, "core_d");

        assert_eq!(map.get_string(Prop::OutputName, Some(&debug)).as_deref(), Some("core_d"));
        assert_eq!(map.get_string(Prop::OutputName, Some(&release)).as_deref(), Some("core"));
        assert_eq!(map.get_string(Prop::OutputName, None).as_deref(), Some("core"));
    }

    #[test]
    fn test_declared_defaults() {
        let map = PropertyMap::new();
        assert_eq!(
            map.get_string(Prop::LinkInterfaceMultiplicity, None).as_deref(),
            Some("1")
        );
        assert!(!map.get_bool(Prop::EnableExports, None));
        assert_eq!(map.get_string(Prop::LinkerLanguage, None), None);
    }

    #[test]
    fn test_expand_list_keeps_expressions() {
        assert_eq!(
            expand_list("a;;$<$<CONFIG:Debug>:x;y>;b"),
            vec!["a", "$<$<CONFIG:Debug>:x;y>", "b"]
        );
        assert!(expand_list("").is_empty());
    }

    #[test]
    fn test_truthiness() {
        assert!(is_on("on"));
        assert!(is_on("2"));
        assert!(!is_on("0"));
        assert!(!is_on("maybe"));
        assert!(is_off("lib-NOTFOUND"));
        assert!(is_off(""));
        assert!(!is_off("ON"));
    }

    #[test]
    fn test_parse_integer_bases() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-7"), Some(-7));
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("010"), Some(8));
        assert_eq!(parse_integer("0"), Some(0));
        assert_eq!(parse_integer("3.5"), None);
        assert_eq!(parse_integer("abc"), None);
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("5 "), None);
    }
}
