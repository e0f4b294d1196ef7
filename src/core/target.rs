//! Build targets.
//!
//! A target is configured once from the project description and then only
//! read by the resolvers. The one exception is the dependency tracer, which
//! appends newly discovered sources and utility names.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::entry::{EntryKind, PropertyEntry, PropertyEntryStore};
use crate::core::property::{Prop, PropertyMap, PropertyValue};
use crate::core::source::CustomCommand;
use crate::util::diagnostic::Backtrace;
use crate::util::InternedString;

/// Index of a target in its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TargetId(pub(crate) u32);

impl TargetId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    #[serde(alias = "exe")]
    Executable,

    #[serde(alias = "staticlib", alias = "static")]
    StaticLibrary,

    #[serde(alias = "sharedlib", alias = "shared")]
    SharedLibrary,

    #[serde(alias = "module")]
    ModuleLibrary,

    #[serde(alias = "object")]
    ObjectLibrary,

    #[serde(alias = "interface")]
    InterfaceLibrary,

    Utility,

    /// Imported library whose artifact kind is unknown
    #[serde(alias = "unknown")]
    UnknownLibrary,
}

/// Which output class an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Static libraries and import libraries
    Archive,
    /// Shared and module libraries on non-DLL platforms
    Library,
    /// Executables and DLLs
    Runtime,
}

impl Artifact {
    pub fn output_name_prop(&self) -> Prop {
        match self {
            Artifact::Archive => Prop::ArchiveOutputName,
            Artifact::Library => Prop::LibraryOutputName,
            Artifact::Runtime => Prop::RuntimeOutputName,
        }
    }

    pub fn output_directory_prop(&self) -> Prop {
        match self {
            Artifact::Archive => Prop::ArchiveOutputDirectory,
            Artifact::Library => Prop::LibraryOutputDirectory,
            Artifact::Runtime => Prop::RuntimeOutputDirectory,
        }
    }
}

impl TargetKind {
    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::Executable => "EXECUTABLE",
            TargetKind::StaticLibrary => "STATIC_LIBRARY",
            TargetKind::SharedLibrary => "SHARED_LIBRARY",
            TargetKind::ModuleLibrary => "MODULE_LIBRARY",
            TargetKind::ObjectLibrary => "OBJECT_LIBRARY",
            TargetKind::InterfaceLibrary => "INTERFACE_LIBRARY",
            TargetKind::Utility => "UTILITY",
            TargetKind::UnknownLibrary => "UNKNOWN_LIBRARY",
        }
    }

    pub fn is_library(&self) -> bool {
        matches!(
            self,
            TargetKind::StaticLibrary
                | TargetKind::SharedLibrary
                | TargetKind::ModuleLibrary
                | TargetKind::ObjectLibrary
                | TargetKind::InterfaceLibrary
                | TargetKind::UnknownLibrary
        )
    }

    /// Executables and the library kinds that produce a file on disk.
    pub fn is_executable_like(&self) -> bool {
        matches!(
            self,
            TargetKind::Executable
                | TargetKind::StaticLibrary
                | TargetKind::SharedLibrary
                | TargetKind::ModuleLibrary
        )
    }

    /// Whether a static library's link language reaches its dependents.
    pub fn link_language_propagates(&self) -> bool {
        matches!(self, TargetKind::StaticLibrary)
    }

    /// Output class of the primary artifact.
    ///
    /// `dll_platform` selects DLL semantics where shared libraries are
    /// runtime artifacts and their import libraries are archives.
    pub fn artifact(&self, dll_platform: bool, import_library: bool) -> Artifact {
        match self {
            TargetKind::Executable => {
                if import_library {
                    Artifact::Archive
                } else {
                    Artifact::Runtime
                }
            }
            TargetKind::SharedLibrary if dll_platform => {
                if import_library {
                    Artifact::Archive
                } else {
                    Artifact::Runtime
                }
            }
            TargetKind::SharedLibrary | TargetKind::ModuleLibrary => Artifact::Library,
            _ => Artifact::Archive,
        }
    }

    /// Typical file prefix for this kind.
    pub fn prefix(&self, os: &str) -> &'static str {
        match self {
            TargetKind::StaticLibrary | TargetKind::SharedLibrary | TargetKind::ModuleLibrary
                if os != "windows" =>
            {
                "lib"
            }
            _ => "",
        }
    }

    /// Typical file suffix for this kind, including the dot.
    pub fn suffix(&self, os: &str) -> &'static str {
        match (self, os) {
            (TargetKind::Executable, "windows") => ".exe",
            (TargetKind::StaticLibrary, "windows") => ".lib",
            (TargetKind::StaticLibrary, _) => ".a",
            (TargetKind::SharedLibrary, "windows") => ".dll",
            (TargetKind::SharedLibrary, "macos") => ".dylib",
            (TargetKind::SharedLibrary, _) => ".so",
            (TargetKind::ModuleLibrary, "windows") => ".dll",
            (TargetKind::ModuleLibrary, _) => ".so",
            _ => "",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of an old-style typed link library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkLibraryType {
    General,
    Debug,
    Optimized,
}

/// A build target.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: InternedString,
    pub kind: TargetKind,
    pub imported: bool,
    pub properties: PropertyMap,
    pub entries: PropertyEntryStore,
    /// Old-style typed link libraries
    pub legacy_link_libraries: Vec<(String, LinkLibraryType)>,
    pub pre_build: Vec<CustomCommand>,
    pub pre_link: Vec<CustomCommand>,
    pub post_build: Vec<CustomCommand>,
    /// Names of targets that must be built first
    pub utilities: BTreeSet<InternedString>,
    pub source_dir: PathBuf,
    pub binary_dir: PathBuf,
    pub install_rule: bool,
    pub backtrace: Backtrace,
}

impl Target {
    /// Create a new target with the given name and kind.
    pub fn new(name: impl Into<InternedString>, kind: TargetKind) -> Self {
        Target {
            name: name.into(),
            kind,
            imported: false,
            properties: PropertyMap::new(),
            entries: PropertyEntryStore::new(),
            legacy_link_libraries: Vec::new(),
            pre_build: Vec::new(),
            pre_link: Vec::new(),
            post_build: Vec::new(),
            utilities: BTreeSet::new(),
            source_dir: PathBuf::new(),
            binary_dir: PathBuf::new(),
            install_rule: false,
            backtrace: Backtrace::empty(),
        }
    }

    pub fn executable(name: impl Into<InternedString>) -> Self {
        Self::new(name, TargetKind::Executable)
    }

    pub fn static_library(name: impl Into<InternedString>) -> Self {
        Self::new(name, TargetKind::StaticLibrary)
    }

    pub fn shared_library(name: impl Into<InternedString>) -> Self {
        Self::new(name, TargetKind::SharedLibrary)
    }

    pub fn interface_library(name: impl Into<InternedString>) -> Self {
        Self::new(name, TargetKind::InterfaceLibrary)
    }

    /// Mark the target as imported from outside the project.
    pub fn imported(mut self) -> Self {
        self.imported = true;
        self
    }

    pub fn with_dirs(mut self, source_dir: impl Into<PathBuf>, binary_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self.binary_dir = binary_dir.into();
        self
    }

    pub fn with_property(mut self, prop: Prop, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(prop, value);
        self
    }

    /// Append a direct entry to one of the entry lists.
    pub fn with_entry(mut self, kind: EntryKind, text: impl Into<String>) -> Self {
        let backtrace = self.backtrace.push(format!("{}.{}", self.name, kind));
        self.entries.push(kind, PropertyEntry::direct(text, backtrace));
        self
    }

    pub fn link(self, lib: impl Into<String>) -> Self {
        self.with_entry(EntryKind::LinkLibraries, lib)
    }

    pub fn with_legacy_link(mut self, lib: impl Into<String>, ty: LinkLibraryType) -> Self {
        self.legacy_link_libraries.push((lib.into(), ty));
        self
    }

    pub fn is_imported(&self) -> bool {
        self.imported
    }

    pub fn is_executable_with_exports(&self) -> bool {
        self.kind == TargetKind::Executable && self.properties.get_bool(Prop::EnableExports, None)
    }

    /// Whether other targets can link to this one.
    pub fn is_linkable(&self) -> bool {
        matches!(
            self.kind,
            TargetKind::StaticLibrary
                | TargetKind::SharedLibrary
                | TargetKind::ModuleLibrary
                | TargetKind::UnknownLibrary
                | TargetKind::InterfaceLibrary
        ) || self.is_executable_with_exports()
    }

    /// Imported non-interface targets need a location to be usable.
    pub fn has_import_location(&self) -> bool {
        self.properties
            .iter()
            .any(|(prop, _, value)| prop == Prop::ImportedLocation && !value.as_string().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_classes() {
        assert_eq!(TargetKind::StaticLibrary.artifact(false, false), Artifact::Archive);
        assert_eq!(TargetKind::SharedLibrary.artifact(false, false), Artifact::Library);
        assert_eq!(TargetKind::SharedLibrary.artifact(true, false), Artifact::Runtime);
        assert_eq!(TargetKind::SharedLibrary.artifact(true, true), Artifact::Archive);
        assert_eq!(TargetKind::Executable.artifact(false, false), Artifact::Runtime);
        assert_eq!(TargetKind::ModuleLibrary.artifact(true, false), Artifact::Library);
    }

    #[test]
    fn test_prefix_and_suffix() {
        assert_eq!(TargetKind::StaticLibrary.prefix("linux"), "lib");
        assert_eq!(TargetKind::StaticLibrary.suffix("linux"), ".a");
        assert_eq!(TargetKind::SharedLibrary.suffix("macos"), ".dylib");
        assert_eq!(TargetKind::SharedLibrary.prefix("windows"), "");
        assert_eq!(TargetKind::Executable.suffix("windows"), ".exe");
        assert_eq!(TargetKind::Executable.suffix("linux"), "");
    }

    #[test]
    fn test_linkability() {
        let exe = Target::executable("app");
        assert!(!exe.is_linkable());

        let plugin_host = Target::executable("host").with_property(Prop::EnableExports, true);
        assert!(plugin_host.is_linkable());
        assert!(plugin_host.is_executable_with_exports());

        assert!(Target::interface_library("headers").is_linkable());
        assert!(!Target::new("objs", TargetKind::ObjectLibrary).is_linkable());
    }

    #[test]
    fn test_kind_deserializes_aliases() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: TargetKind,
        }
        let w: Wrapper = toml::from_str("kind = \"staticlib\"").unwrap();
        assert_eq!(w.kind, TargetKind::StaticLibrary);
        let w: Wrapper = toml::from_str("kind = \"interface-library\"").unwrap();
        assert_eq!(w.kind, TargetKind::InterfaceLibrary);
    }
}
