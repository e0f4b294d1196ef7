//! Output names, directories and install-time link queries.

use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use crate::core::{Artifact, ConfigId, Prop, TargetId, TargetKind};
use crate::genex::{DagChecker, EvalContext};

use super::cache::CacheSlot;
use super::errors::GraphError;
use super::Engine;

/// Collapse `.` and `..` components without touching the filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Turn arbitrary text into a valid C identifier.
pub fn make_c_identifier(text: &str) -> String {
    let mut ident = String::with_capacity(text.len() + 1);
    if text.starts_with(|c: char| c.is_ascii_digit()) {
        ident.push('_');
    }
    ident.extend(
        text.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
    );
    ident
}

impl Engine {
    /// Base name of the `artifact` file of `id`, without prefix or suffix.
    pub fn output_name(&self, id: TargetId, config: &ConfigId, artifact: Artifact) -> String {
        let key = (*config, artifact);
        let slot = self.cache(id).output_names.borrow().get(&key).cloned();
        match slot {
            Some(CacheSlot::Done(name)) => return name.as_ref().clone(),
            Some(CacheSlot::InProgress) => {
                let target = self.target(id);
                self.fail(
                    GraphError::SelfReferentialOutput {
                        target: target.name.to_string(),
                        property: "OUTPUT_NAME",
                    },
                    &target.backtrace,
                );
                return String::new();
            }
            None => {}
        }
        self.cache(id)
            .output_names
            .borrow_mut()
            .insert(key, CacheSlot::InProgress);

        let target = self.target(id);
        let properties = &target.properties;
        let specific = artifact.output_name_prop();
        let per_config = |prop: Prop| {
            if config.is_none() {
                None
            } else {
                properties.get_config(prop, config)
            }
        };
        let raw = per_config(specific)
            .or_else(|| properties.get(specific))
            .or_else(|| per_config(Prop::OutputName))
            .or_else(|| properties.get(Prop::OutputName))
            .map(|value| value.as_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| target.name.to_string());

        let root = DagChecker::root(id, Prop::OutputName);
        let ctx = EvalContext::new(*config, id, id, &target.backtrace).with_dag(&root);
        let name = self.evaluate(&raw, &ctx).values.join(";");

        self.cache(id)
            .output_names
            .borrow_mut()
            .insert(key, CacheSlot::Done(Rc::new(name.clone())));
        name
    }

    /// Directory the `artifact` file of `id` is written to.
    pub fn output_directory(&self, id: TargetId, config: &ConfigId, artifact: Artifact) -> PathBuf {
        let key = (*config, artifact);
        let slot = self.cache(id).output_dirs.borrow().get(&key).cloned();
        match slot {
            Some(CacheSlot::Done(dir)) => return dir.as_ref().clone(),
            Some(CacheSlot::InProgress) => {
                let target = self.target(id);
                self.fail(
                    GraphError::SelfReferentialOutput {
                        target: target.name.to_string(),
                        property: "OUTPUT_DIRECTORY",
                    },
                    &target.backtrace,
                );
                return PathBuf::new();
            }
            None => {}
        }
        self.cache(id)
            .output_dirs
            .borrow_mut()
            .insert(key, CacheSlot::InProgress);

        let dir = self.compute_output_directory(id, config, artifact);

        self.cache(id)
            .output_dirs
            .borrow_mut()
            .insert(key, CacheSlot::Done(Rc::new(dir.clone())));
        dir
    }

    fn compute_output_directory(&self, id: TargetId, config: &ConfigId, artifact: Artifact) -> PathBuf {
        let target = self.target(id);
        let settings = &self.project.settings;
        let prop = artifact.output_directory_prop();
        let root = DagChecker::root(id, prop);
        let ctx = EvalContext::new(*config, id, id, &target.backtrace).with_dag(&root);

        let mut config_subdir = true;
        let configured = (!config.is_none())
            .then(|| target.properties.get_config(prop, config))
            .flatten();

        let out = if let Some(raw) = configured {
            config_subdir = false;
            self.evaluate(&raw.as_string(), &ctx).values.join(";")
        } else if let Some(raw) = target.properties.get(prop) {
            let raw = raw.as_string();
            let evaluated = self.evaluate(&raw, &ctx).values.join(";");
            if evaluated != raw {
                config_subdir = false;
            }
            evaluated
        } else {
            let default = match target.kind {
                TargetKind::Executable => settings.executable_output_path.clone(),
                TargetKind::StaticLibrary | TargetKind::SharedLibrary | TargetKind::ModuleLibrary => {
                    settings.library_output_path.clone()
                }
                _ => None,
            };
            default.unwrap_or_default()
        };

        let out = if out.is_empty() { ".".to_string() } else { out };
        let mut dir = normalize_path(&target.binary_dir.join(out));
        if settings.multi_config && config_subdir && !config.is_none() {
            dir.push(config.name());
        }
        dir
    }

    /// Full path of the `artifact` file of `id`.
    ///
    /// Imported targets report their `IMPORTED_LOCATION`; targets that
    /// produce no file report an empty path.
    pub fn full_path(&self, id: TargetId, config: &ConfigId, artifact: Artifact) -> PathBuf {
        let target = self.target(id);
        if target.imported {
            return target
                .properties
                .get_string(Prop::ImportedLocation, Some(config))
                .map(PathBuf::from)
                .unwrap_or_default();
        }
        if !target.kind.is_executable_like() {
            return PathBuf::new();
        }

        let os = self.project.settings.platform.as_str();
        let import_library = artifact == Artifact::Archive
            && matches!(target.kind, TargetKind::SharedLibrary | TargetKind::Executable);
        let prefix = target
            .properties
            .get_string(Prop::Prefix, Some(config))
            .unwrap_or_else(|| target.kind.prefix(os).to_string());
        let suffix = if import_library {
            ".lib".to_string()
        } else {
            target
                .properties
                .get_string(Prop::Suffix, Some(config))
                .unwrap_or_else(|| target.kind.suffix(os).to_string())
        };

        let name = self.output_name(id, config, artifact);
        self.output_directory(id, config, artifact)
            .join(format!("{}{}{}", prefix, name, suffix))
    }

    /// Whether the build-tree binary carries an rpath.
    pub fn has_build_tree_rpath(&self, id: TargetId, config: &ConfigId) -> bool {
        if self.project.settings.skip_rpath
            || self
                .target(id)
                .properties
                .get_bool(Prop::SkipBuildRpath, Some(config))
        {
            return false;
        }
        !self
            .link_implementation_libraries(id, config, id)
            .libraries
            .is_empty()
    }

    pub fn has_install_tree_rpath(&self, id: TargetId, config: &ConfigId) -> bool {
        !self.project.settings.skip_rpath
            && self
                .target(id)
                .properties
                .get_string(Prop::InstallRpath, Some(config))
                .is_some_and(|rpath| !rpath.is_empty())
    }

    /// Whether installing `id` requires linking it again with the install
    /// rpath.
    pub fn needs_relink_before_install(&self, id: TargetId, config: &ConfigId) -> bool {
        let target = self.target(id);
        let settings = &self.project.settings;

        if !matches!(
            target.kind,
            TargetKind::Executable | TargetKind::SharedLibrary | TargetKind::ModuleLibrary
        ) || !target.install_rule
            || settings.skip_rpath
            || target.properties.get_bool(Prop::BuildWithInstallRpath, Some(config))
            || settings.use_chrpath
            || settings.is_dll_platform()
        {
            return false;
        }

        if self.link_closure(id, config).linker_language.is_empty() {
            return false;
        }

        self.has_build_tree_rpath(id, config) || self.has_install_tree_rpath(id, config)
    }

    /// Preprocessor symbol defined while building a target that exports
    /// symbols.
    pub fn export_macro(&self, id: TargetId) -> Option<String> {
        let target = self.target(id);
        let exports = matches!(target.kind, TargetKind::SharedLibrary | TargetKind::ModuleLibrary)
            || target.is_executable_with_exports();
        if !exports {
            return None;
        }
        Some(
            target
                .properties
                .get_string(Prop::DefineSymbol, None)
                .unwrap_or_else(|| make_c_identifier(&format!("{}_EXPORTS", target.name))),
        )
    }
}
