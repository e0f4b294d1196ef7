//! The project registry.
//!
//! `Project` owns every target and source file for the run. Everything else
//! refers to targets by [`TargetId`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config_id::ConfigId;
use crate::core::source::SourceFile;
use crate::core::target::{Target, TargetId};
use crate::util::InternedString;

/// Project-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectSettings {
    pub name: String,

    /// Configurations to resolve; empty means a single unnamed one
    pub configurations: Vec<String>,

    /// Configurations that select `debug` typed link libraries
    pub debug_configurations: Vec<String>,

    /// Append the configuration name to output directories
    pub multi_config: bool,

    /// `linux`, `macos` or `windows`
    pub platform: String,

    pub executable_output_path: Option<String>,
    pub library_output_path: Option<String>,

    /// Never use rpaths
    pub skip_rpath: bool,

    /// The platform rewrites rpaths in place at install time
    pub use_chrpath: bool,

    #[serde(skip)]
    pub source_dir: PathBuf,

    #[serde(skip)]
    pub binary_dir: PathBuf,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        ProjectSettings {
            name: String::new(),
            configurations: Vec::new(),
            debug_configurations: vec!["Debug".to_string()],
            multi_config: false,
            platform: "linux".to_string(),
            executable_output_path: None,
            library_output_path: None,
            skip_rpath: false,
            use_chrpath: false,
            source_dir: PathBuf::new(),
            binary_dir: PathBuf::new(),
        }
    }
}

impl ProjectSettings {
    pub fn is_apple(&self) -> bool {
        self.platform == "macos"
    }

    pub fn is_dll_platform(&self) -> bool {
        self.platform == "windows"
    }
}

/// Registry errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectError {
    #[error("target `{name}` is defined more than once")]
    DuplicateTarget { name: String },

    #[error("alias `{alias}` refers to unknown target `{target}`")]
    UnknownAliasTarget { alias: String, target: String },

    #[error("alias `{alias}` collides with an existing target or alias")]
    DuplicateAlias { alias: String },
}

/// All targets and source files of a configured project.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub settings: ProjectSettings,
    targets: Vec<Target>,
    by_name: HashMap<InternedString, TargetId>,
    aliases: HashMap<InternedString, TargetId>,
    sources: BTreeMap<PathBuf, SourceFile>,
    outputs: HashMap<PathBuf, PathBuf>,
}

impl Project {
    pub fn new(settings: ProjectSettings) -> Self {
        Project {
            settings,
            ..Default::default()
        }
    }

    /// Register a target.
    pub fn add_target(&mut self, mut target: Target) -> Result<TargetId, ProjectError> {
        if self.by_name.contains_key(&target.name) || self.aliases.contains_key(&target.name) {
            return Err(ProjectError::DuplicateTarget {
                name: target.name.to_string(),
            });
        }
        if target.source_dir.as_os_str().is_empty() {
            target.source_dir = self.settings.source_dir.clone();
        }
        if target.binary_dir.as_os_str().is_empty() {
            target.binary_dir = self.settings.binary_dir.clone();
        }

        let id = TargetId(self.targets.len() as u32);
        self.by_name.insert(target.name, id);
        self.targets.push(target);
        Ok(id)
    }

    /// Make `alias` another name for `target`.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<(), ProjectError> {
        let alias_name = InternedString::new(alias);
        if self.by_name.contains_key(&alias_name) || self.aliases.contains_key(&alias_name) {
            return Err(ProjectError::DuplicateAlias {
                alias: alias.to_string(),
            });
        }
        let id = self
            .by_name
            .get(&InternedString::new(target))
            .copied()
            .ok_or_else(|| ProjectError::UnknownAliasTarget {
                alias: alias.to_string(),
                target: target.to_string(),
            })?;
        self.aliases.insert(alias_name, id);
        Ok(())
    }

    /// Look up a target by name or alias.
    pub fn find_target(&self, name: &str) -> Option<TargetId> {
        let key = InternedString::new(name);
        self.by_name
            .get(&key)
            .or_else(|| self.aliases.get(&key))
            .copied()
    }

    pub fn target(&self, id: TargetId) -> &Target {
        &self.targets[id.index()]
    }

    pub fn target_mut(&mut self, id: TargetId) -> &mut Target {
        &mut self.targets[id.index()]
    }

    pub fn target_ids(&self) -> impl Iterator<Item = TargetId> {
        (0..self.targets.len() as u32).map(TargetId)
    }

    pub fn targets(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.targets
            .iter()
            .enumerate()
            .map(|(i, t)| (TargetId(i as u32), t))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Register source metadata, indexing any command outputs.
    pub fn add_source(&mut self, source: SourceFile) {
        if let Some(command) = &source.command {
            for output in &command.outputs {
                self.outputs
                    .entry(output.clone())
                    .or_insert_with(|| source.path.clone());
            }
        }
        self.sources.insert(source.path.clone(), source);
    }

    pub fn source(&self, path: &Path) -> Option<&SourceFile> {
        self.sources.get(path)
    }

    /// The source file whose command produces `output`.
    pub fn source_with_output(&self, output: &Path) -> Option<&SourceFile> {
        self.outputs.get(output).and_then(|p| self.sources.get(p))
    }

    /// Configurations to resolve, never empty.
    pub fn configurations(&self) -> Vec<ConfigId> {
        if self.settings.configurations.is_empty() {
            vec![ConfigId::none()]
        } else {
            self.settings
                .configurations
                .iter()
                .map(ConfigId::new)
                .collect()
        }
    }

    pub fn is_debug_config(&self, config: &ConfigId) -> bool {
        self.settings
            .debug_configurations
            .iter()
            .any(|c| config.matches(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::CustomCommand;
    use crate::core::target::TargetKind;

    #[test]
    fn test_find_target_and_alias() {
        let mut project = Project::default();
        let core = project.add_target(Target::static_library("core")).unwrap();
        project.add_alias("Demo::core", "core").unwrap();

        assert_eq!(project.find_target("core"), Some(core));
        assert_eq!(project.find_target("Demo::core"), Some(core));
        assert_eq!(project.find_target("missing"), None);
        assert_eq!(project.target(core).kind, TargetKind::StaticLibrary);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut project = Project::default();
        project.add_target(Target::executable("app")).unwrap();
        assert_eq!(
            project.add_target(Target::executable("app")),
            Err(ProjectError::DuplicateTarget {
                name: "app".to_string()
            })
        );
        assert!(project.add_alias("x", "nope").is_err());
    }

    #[test]
    fn test_source_with_output_maps_secondary_outputs() {
        let mut project = Project::default();
        project.add_source(
            SourceFile::new("/b/gen.c").command(
                CustomCommand::new("gen")
                    .output("/b/gen.c")
                    .output("/b/gen.h"),
            ),
        );

        let primary = project.source_with_output(Path::new("/b/gen.h")).unwrap();
        assert_eq!(primary.path, PathBuf::from("/b/gen.c"));
        assert!(project.source_with_output(Path::new("/b/other.h")).is_none());
    }

    #[test]
    fn test_configurations_default_to_unnamed() {
        let project = Project::default();
        assert_eq!(project.configurations(), vec![ConfigId::none()]);
        assert!(project.is_debug_config(&ConfigId::new("DEBUG")));
        assert!(!project.is_debug_config(&ConfigId::new("Release")));
    }
}
