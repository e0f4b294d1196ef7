//! Source file metadata and custom commands.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::diagnostic::Backtrace;
use crate::util::InternedString;

/// A command that produces files at build time.
///
/// Command lines are argument vectors, never shell strings. Arguments and
/// `depends` may contain generator expressions, evaluated per configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCommand {
    /// Command lines, each one argument vector
    #[serde(default)]
    pub command: Vec<Vec<String>>,

    /// Files the command reads
    #[serde(default)]
    pub depends: Vec<String>,

    /// Files the command produces
    #[serde(default)]
    pub outputs: Vec<PathBuf>,

    /// Working directory
    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(skip)]
    pub backtrace: Backtrace,
}

impl CustomCommand {
    /// Create a command with a single command line.
    pub fn new(program: impl Into<String>) -> Self {
        CustomCommand {
            command: vec![vec![program.into()]],
            ..Default::default()
        }
    }

    /// Append an argument to the last command line.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        match self.command.last_mut() {
            Some(line) => line.push(arg.into()),
            None => self.command.push(vec![arg.into()]),
        }
        self
    }

    /// Start another command line.
    pub fn then(mut self, program: impl Into<String>) -> Self {
        self.command.push(vec![program.into()]);
        self
    }

    pub fn depend(mut self, dep: impl Into<String>) -> Self {
        self.depends.push(dep.into());
        self
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.outputs.push(output.into());
        self
    }

    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = backtrace;
        self
    }
}

/// What the build does with a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Produced by a custom command attached to the file
    CustomCommand,
    /// Object file produced elsewhere
    ExternalObject,
    /// Symbol export definition (`.def`)
    ModuleDefinition,
    /// Interface definition (`.idl`)
    Idl,
    /// Resource file
    Resource,
    /// Application manifest
    AppManifest,
    /// Header, never compiled on its own
    Header,
    /// Compiled with the source's language
    Compilable,
    /// Anything else listed for IDE visibility
    Extra,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::CustomCommand => "custom-command",
            SourceKind::ExternalObject => "external-object",
            SourceKind::ModuleDefinition => "module-definition",
            SourceKind::Idl => "idl",
            SourceKind::Resource => "resource",
            SourceKind::AppManifest => "app-manifest",
            SourceKind::Header => "header",
            SourceKind::Compilable => "compilable",
            SourceKind::Extra => "extra",
        };
        f.write_str(s)
    }
}

/// Metadata for one source file, supplied by the project description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Declared language, overriding extension-based detection
    pub language: Option<InternedString>,
    /// Extra files the object depends on
    pub object_depends: Vec<String>,
    /// Dependencies added programmatically
    pub depends: Vec<PathBuf>,
    /// Command that generates this file
    pub command: Option<CustomCommand>,
    /// Object library this external object belongs to
    pub object_library: Option<InternedString>,
    pub header_file_only: bool,
    pub external_object: bool,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SourceFile {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn language(mut self, lang: impl Into<InternedString>) -> Self {
        self.language = Some(lang.into());
        self
    }

    pub fn object_depend(mut self, dep: impl Into<String>) -> Self {
        self.object_depends.push(dep.into());
        self
    }

    pub fn depend(mut self, dep: impl Into<PathBuf>) -> Self {
        self.depends.push(dep.into());
        self
    }

    pub fn command(mut self, command: CustomCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }
}

/// Lower-cased extension of `path`, without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "h++", "hm", "hpp", "hxx", "in", "txx", "inl"];
const OBJECT_EXTENSIONS: &[&str] = &["o", "obj"];

/// Classify a source file given its resolved language.
///
/// `resources` lists paths the target declares as resources.
pub fn classify_source(
    source: &SourceFile,
    language: Option<&str>,
    resources: &[PathBuf],
) -> SourceKind {
    if source.command.is_some() {
        return SourceKind::CustomCommand;
    }

    let ext = source.extension();
    let ext = ext.as_deref().unwrap_or("");

    if source.header_file_only || HEADER_EXTENSIONS.contains(&ext) {
        SourceKind::Header
    } else if source.external_object
        || source.object_library.is_some()
        || OBJECT_EXTENSIONS.contains(&ext)
    {
        SourceKind::ExternalObject
    } else if ext == "def" {
        SourceKind::ModuleDefinition
    } else if ext == "idl" {
        SourceKind::Idl
    } else if ext == "resx" || resources.iter().any(|r| r == &source.path) {
        SourceKind::Resource
    } else if ext == "manifest" {
        SourceKind::AppManifest
    } else if language.is_some_and(|l| !l.is_empty()) {
        SourceKind::Compilable
    } else {
        SourceKind::Extra
    }
}
