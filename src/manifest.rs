//! Keel.toml project description.
//!
//! The description lists targets, their usage requirements and properties,
//! aliases, source metadata and policy settings. Loading it yields a
//! configured [`Project`] plus the [`PolicyMap`] it declares.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::core::entry::{EntryKind, PropertyEntry};
use crate::core::{
    ConfigId, CustomCommand, LinkLibraryType, PolicyMap, Project, ProjectSettings, Prop,
    PropertyValue, SourceFile, Target, TargetKind,
};
use crate::genex::has_genex;
use crate::util::diagnostic::Backtrace;
use crate::util::InternedString;

/// File name of a project description.
pub const MANIFEST_NAME: &str = "Keel.toml";

/// Problems that make a description unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("{path} has no [project] section")]
    MissingProject { path: String },

    #[error("target `{target}`: property `{property}` has an unsupported value type")]
    UnsupportedValue { target: String, property: String },

    #[error("target `{target}`: `{property}` is a list property; use `{key}` instead")]
    ListProperty {
        target: String,
        property: String,
        key: &'static str,
    },
}

/// A loaded project description.
#[derive(Debug)]
pub struct Manifest {
    pub project: Project,
    pub policies: PolicyMap,
    /// Directory containing the description
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawManifest {
    project: Option<RawProject>,
    #[serde(default)]
    policies: PolicyMap,
    #[serde(default)]
    targets: BTreeMap<String, RawTarget>,
    #[serde(default)]
    sources: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawProject {
    #[serde(flatten)]
    settings: ProjectSettings,
    binary_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawTarget {
    kind: Option<TargetKind>,
    imported: bool,
    install: bool,
    sources: Vec<String>,
    include_directories: Vec<String>,
    compile_definitions: Vec<String>,
    compile_options: Vec<String>,
    compile_features: Vec<String>,
    link_libraries: Vec<String>,
    legacy_link_libraries: Vec<RawLegacyLink>,
    aliases: Vec<String>,
    properties: BTreeMap<String, toml::Value>,
    config: BTreeMap<String, BTreeMap<String, toml::Value>>,
    pre_build: Vec<CustomCommand>,
    pre_link: Vec<CustomCommand>,
    post_build: Vec<CustomCommand>,
}

#[derive(Debug, Deserialize)]
struct RawLegacyLink {
    name: String,
    #[serde(rename = "type", default = "general")]
    ty: LinkLibraryType,
}

fn general() -> LinkLibraryType {
    LinkLibraryType::General
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSource {
    path: PathBuf,
    language: Option<String>,
    #[serde(default)]
    object_depends: Vec<String>,
    #[serde(default)]
    depends: Vec<PathBuf>,
    command: Option<CustomCommand>,
    object_library: Option<String>,
    #[serde(default)]
    header_file_only: bool,
    #[serde(default)]
    external_object: bool,
}

impl Manifest {
    /// Load a description from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project description: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Find `Keel.toml` in `dir` and load it.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_NAME);
        if !path.exists() {
            anyhow::bail!("could not find `{}` in `{}`", MANIFEST_NAME, dir.display());
        }
        Self::load(&path)
    }

    /// Parse description content. Relative paths resolve against the
    /// directory of `path`.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| MANIFEST_NAME.to_string());

        let raw_project = raw.project.ok_or_else(|| ManifestError::MissingProject {
            path: path.display().to_string(),
        })?;
        let mut settings = raw_project.settings;
        settings.source_dir = root.clone();
        settings.binary_dir = match raw_project.binary_dir {
            Some(dir) => absolutize(&root, &dir),
            None => root.clone(),
        };

        let mut project = Project::new(settings);

        for source in raw.sources {
            project.add_source(convert_source(&root, &file, source));
        }

        let mut aliases = Vec::new();
        for (name, raw_target) in raw.targets {
            for alias in &raw_target.aliases {
                aliases.push((alias.clone(), name.clone()));
            }
            let target = convert_target(&root, &file, &name, raw_target)?;
            project
                .add_target(target)
                .with_context(|| format!("invalid target `{}`", name))?;
        }
        for (alias, target) in aliases {
            project
                .add_alias(&alias, &target)
                .with_context(|| format!("invalid alias `{}`", alias))?;
        }

        tracing::debug!(
            "loaded `{}`: {} targets, {} policies",
            project.settings.name,
            project.len(),
            raw.policies.iter().count()
        );

        Ok(Manifest {
            project,
            policies: raw.policies,
            root,
        })
    }
}

fn absolutize(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Expression-free relative entries become absolute; anything else is kept
/// verbatim for the resolvers.
fn anchor_entry(root: &Path, text: &str) -> String {
    if text.is_empty() || has_genex(text) || Path::new(text).is_absolute() {
        text.to_string()
    } else {
        root.join(text).to_string_lossy().into_owned()
    }
}

fn convert_value(target: &str, property: &str, value: toml::Value) -> Result<PropertyValue, ManifestError> {
    match value {
        toml::Value::String(s) => Ok(PropertyValue::Str(s)),
        toml::Value::Boolean(b) => Ok(PropertyValue::Bool(b)),
        toml::Value::Integer(i) => Ok(PropertyValue::Str(i.to_string())),
        toml::Value::Float(f) => Ok(PropertyValue::Str(f.to_string())),
        toml::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                toml::Value::String(s) => Ok(s),
                toml::Value::Integer(i) => Ok(i.to_string()),
                _ => Err(ManifestError::UnsupportedValue {
                    target: target.to_string(),
                    property: property.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PropertyValue::List),
        _ => Err(ManifestError::UnsupportedValue {
            target: target.to_string(),
            property: property.to_string(),
        }),
    }
}

/// The dedicated key for a property stored as an entry list.
fn entry_key(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::IncludeDirectories => "include-directories",
        EntryKind::CompileOptions => "compile-options",
        EntryKind::CompileFeatures => "compile-features",
        EntryKind::CompileDefinitions => "compile-definitions",
        EntryKind::Sources => "sources",
        EntryKind::LinkLibraries => "link-libraries",
    }
}

fn convert_target(root: &Path, file: &str, name: &str, raw: RawTarget) -> Result<Target> {
    let kind = raw.kind.unwrap_or(TargetKind::StaticLibrary);
    let mut target = Target::new(name, kind);
    target.imported = raw.imported;
    target.install_rule = raw.install;
    target.backtrace = Backtrace::new(format!("{}: targets.{}", file, name));

    let lists = [
        (EntryKind::Sources, raw.sources, true),
        (EntryKind::IncludeDirectories, raw.include_directories, true),
        (EntryKind::CompileDefinitions, raw.compile_definitions, false),
        (EntryKind::CompileOptions, raw.compile_options, false),
        (EntryKind::CompileFeatures, raw.compile_features, false),
        (EntryKind::LinkLibraries, raw.link_libraries, false),
    ];
    for (kind, values, paths) in lists {
        let backtrace = Backtrace::new(format!("{}: targets.{}.{}", file, name, entry_key(kind)));
        for value in values {
            let text = if paths { anchor_entry(root, &value) } else { value };
            target
                .entries
                .push(kind, PropertyEntry::direct(text, backtrace.clone()));
        }
    }

    for link in raw.legacy_link_libraries {
        target.legacy_link_libraries.push((link.name, link.ty));
    }

    for (property, value) in raw.properties {
        let prop = Prop::from_name(&property);
        if let Some(kind) = EntryKind::from_prop(prop) {
            return Err(ManifestError::ListProperty {
                target: name.to_string(),
                property,
                key: entry_key(kind),
            }
            .into());
        }
        let value = convert_value(name, &property, value)?;
        target.properties.set(prop, value);
    }

    for (config, values) in raw.config {
        let config = ConfigId::new(&config);
        for (property, value) in values {
            let value = convert_value(name, &property, value)?;
            target
                .properties
                .set_for_config(Prop::from_name(&property), config, value);
        }
    }

    let command_trace = |event: &str, index: usize| {
        Backtrace::new(format!("{}: targets.{}.{}[{}]", file, name, event, index))
    };
    for (event, commands, slot) in [
        ("pre-build", raw.pre_build, &mut target.pre_build),
        ("pre-link", raw.pre_link, &mut target.pre_link),
        ("post-build", raw.post_build, &mut target.post_build),
    ] {
        for (index, command) in commands.into_iter().enumerate() {
            slot.push(command.with_backtrace(command_trace(event, index)));
        }
    }

    Ok(target)
}

fn convert_source(root: &Path, file: &str, raw: RawSource) -> SourceFile {
    let path = absolutize(root, &raw.path);
    let mut source = SourceFile::new(path.clone());
    source.language = raw.language.map(InternedString::new);
    source.object_depends = raw.object_depends;
    source.depends = raw.depends.iter().map(|dep| absolutize(root, dep)).collect();
    source.object_library = raw.object_library.map(InternedString::new);
    source.header_file_only = raw.header_file_only;
    source.external_object = raw.external_object;
    source.command = raw.command.map(|mut command| {
        command.outputs = command
            .outputs
            .iter()
            .map(|output| absolutize(root, output))
            .collect();
        command.with_backtrace(Backtrace::new(format!(
            "{}: sources.{}",
            file,
            raw.path.display()
        )))
    });
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DEMO: &str = r#"
[project]
name = "demo"
configurations = ["Debug", "Release"]

[policies]
self-link = "old"

[targets.core]
kind = "static-library"
sources = ["src/core.c", "$<$<CONFIG:Debug>:src/debug.c>"]
include-directories = ["include", "/usr/include/extra"]
compile-definitions = ["CORE=1"]
aliases = ["Demo::core"]
properties = { INTERFACE_INCLUDE_DIRECTORIES = "/abs/include", POSITION_INDEPENDENT_CODE = true }
config.Debug = { LINK_INTERFACE_MULTIPLICITY = 2 }

[targets.app]
kind = "executable"
sources = ["src/main.c"]
link-libraries = ["Demo::core", "m"]

[[sources]]
path = "gen/out.c"
language = "C"
command = { command = [["gen", "out.c"]], outputs = ["gen/out.c"] }
"#;

    #[test]
    fn test_parse_demo_project() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_NAME);

        let manifest = Manifest::parse(DEMO, &path).unwrap();
        let project = &manifest.project;

        assert_eq!(project.settings.name, "demo");
        assert_eq!(project.len(), 2);
        let core = project.find_target("Demo::core").unwrap();
        assert_eq!(project.find_target("core"), Some(core));

        let target = project.target(core);
        assert_eq!(target.kind, TargetKind::StaticLibrary);
        let sources = target.entries.entries(EntryKind::Sources);
        assert_eq!(sources[0].text, tmp.path().join("src/core.c").to_string_lossy());
        assert_eq!(sources[1].text, "$<$<CONFIG:Debug>:src/debug.c>");

        let includes = target.entries.entries(EntryKind::IncludeDirectories);
        assert_eq!(includes[1].text, "/usr/include/extra");
        assert!(includes[0].backtrace.to_string().contains("targets.core.include-directories"));

        assert!(target.properties.get_bool(Prop::PositionIndependentCode, None));
        assert_eq!(
            target
                .properties
                .get_string(Prop::LinkInterfaceMultiplicity, Some(&ConfigId::new("Debug")))
                .as_deref(),
            Some("2")
        );

        assert!(project
            .source_with_output(&tmp.path().join("gen/out.c"))
            .is_some());
    }

    #[test]
    fn test_policies_are_returned() {
        use crate::core::{PolicyId, PolicyOracle, PolicyStatus};

        let manifest = Manifest::parse(DEMO, Path::new("/p/Keel.toml")).unwrap();
        assert_eq!(manifest.policies.status(PolicyId::SelfLink), PolicyStatus::Old);
        assert_eq!(manifest.root, PathBuf::from("/p"));
    }

    #[test]
    fn test_loaded_project_resolves() {
        use std::rc::Rc;

        use crate::core::ConfigId;
        use crate::generator::Engine;
        use crate::test_support::demo_manifest;
        use crate::util::CollectingSink;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_NAME);
        std::fs::write(&path, demo_manifest()).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        let sink = Rc::new(CollectingSink::new());
        let engine = Engine::new(manifest.project, manifest.policies, Rc::clone(&sink));
        let app = engine.find_target("app").unwrap();
        let config = ConfigId::none();

        assert_eq!(*engine.compile_definitions(app, &config, None), ["CORE=1"]);
        assert_eq!(*engine.sources(app, &config), [tmp.path().join("main.c")]);
        assert_eq!(engine.link_implementation(app, &config).libraries[0].name, "core");
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_missing_project_section() {
        let err = Manifest::parse("[targets.a]\nkind = \"executable\"\n", Path::new("/p/Keel.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("has no [project] section"));
    }

    #[test]
    fn test_entry_property_is_rejected() {
        let content = r#"
[project]
name = "p"

[targets.a]
properties = { LINK_LIBRARIES = "b" }
"#;
        let err = Manifest::parse(content, Path::new("/p/Keel.toml")).unwrap_err();
        assert!(err.to_string().contains("use `link-libraries` instead"));
    }

    #[test]
    fn test_unknown_alias_target() {
        let content = r#"
[project]
name = "p"

[targets.a]
aliases = ["a"]
"#;
        let err = Manifest::parse(content, Path::new("/p/Keel.toml")).unwrap_err();
        assert!(err.to_string().contains("invalid alias `a`"));
    }
}
