//! Configuration file support for keel.
//!
//! keel supports two configuration file locations:
//! - Global: `~/.keel/config.toml` - User-wide defaults
//! - Project: `.keel/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Policies set in the
//! project description itself override both.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::policy::PolicyMap;

/// keel configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Policy settings
    pub policies: PolicyMap,

    /// Language tables
    pub languages: LanguageConfig,

    /// Diagnostic settings
    pub debug: DebugConfig,
}

/// Per-language linker preferences and source extensions.
///
/// Anything left unset falls back to the built-in tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Linker preference weight per language
    pub preference: BTreeMap<String, i32>,

    /// Languages whose preference propagates to dependents
    pub propagates: Option<BTreeSet<String>>,

    /// File extension (without dot) to language
    pub extensions: BTreeMap<String, String>,
}

const BUILTIN_PREFERENCE: &[(&str, i32)] = &[
    ("ASM", 0),
    ("C", 10),
    ("OBJC", 10),
    ("CUDA", 15),
    ("Fortran", 20),
    ("CXX", 30),
    ("OBJCXX", 30),
];

const BUILTIN_PROPAGATES: &[&str] = &["CXX", "Fortran", "OBJCXX"];

const BUILTIN_EXTENSIONS: &[(&str, &str)] = &[
    ("c", "C"),
    ("m", "OBJC"),
    ("cc", "CXX"),
    ("cpp", "CXX"),
    ("cxx", "CXX"),
    ("c++", "CXX"),
    ("mm", "OBJCXX"),
    ("cu", "CUDA"),
    ("f", "Fortran"),
    ("f90", "Fortran"),
    ("s", "ASM"),
    ("asm", "ASM"),
];

impl LanguageConfig {
    /// Linker preference weight, if the language has one.
    pub fn preference(&self, lang: &str) -> Option<i32> {
        self.preference.get(lang).copied().or_else(|| {
            BUILTIN_PREFERENCE
                .iter()
                .find(|(l, _)| *l == lang)
                .map(|(_, w)| *w)
        })
    }

    pub fn preference_propagates(&self, lang: &str) -> bool {
        match &self.propagates {
            Some(set) => set.contains(lang),
            None => BUILTIN_PROPAGATES.contains(&lang),
        }
    }

    /// Language for a lower-cased file extension.
    pub fn language_for_extension(&self, ext: &str) -> Option<&str> {
        self.extensions.get(ext).map(String::as_str).or_else(|| {
            BUILTIN_EXTENSIONS
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, l)| *l)
        })
    }

    fn merge(&mut self, other: LanguageConfig) {
        self.preference.extend(other.preference);
        if other.propagates.is_some() {
            self.propagates = other.propagates;
        }
        self.extensions.extend(other.extensions);
    }
}

/// Diagnostic settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Property names whose origins are logged while resolving
    pub properties: Vec<String>,
}

impl DebugConfig {
    pub fn traces(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        self.policies.merge(&other.policies);
        self.languages.merge(other.languages);
        for prop in other.debug.properties {
            if !self.debug.properties.contains(&prop) {
                self.debug.properties.push(prop);
            }
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.keel/config.toml)
/// 2. Global config (~/.keel/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));
    config
}

/// Get the global keel config directory (~/.keel).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".keel"))
}

/// Get the global config path (~/.keel/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.keel/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".keel").join("config.toml")
}
