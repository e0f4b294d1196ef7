//! Resolution error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{Backtrace, Diagnostic, Severity};

/// A condition that aborts the computation it was raised in.
///
/// Resolvers never return these; they convert them with
/// [`GraphError::to_diagnostic`], report them, and cache an empty result.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum GraphError {
    #[error("Target \"{target}\" links to itself.")]
    #[diagnostic(
        code(keel::link::self_link),
        help("remove \"{target}\" from its own link libraries")
    )]
    SelfLink { target: String },

    #[error(
        "Target \"{target}\" links to OBJECT library \"{library}\" but this is not allowed.  \
         One may link only to STATIC or SHARED libraries, or to executables with the \
         ENABLE_EXPORTS property set."
    )]
    #[diagnostic(code(keel::link::object_library))]
    LinksToObjectLibrary { target: String, library: String },

    #[error("Target \"{target}\" links to item \"{item}\" which has leading or trailing whitespace.")]
    #[diagnostic(code(keel::link::whitespace))]
    WhitespaceLinkItem { target: String, item: String },

    #[error(
        "Target \"{target}\" links to target \"{item}\" but the target was not found.  \
         Perhaps a target definition is missing for an imported target, or an alias is missing?"
    )]
    #[diagnostic(code(keel::link::missing_alias_target))]
    MissingAliasTarget { target: String, item: String },

    #[error("Target \"{dependency}\" contains relative path in its {property}:\n  \"{path}\"")]
    #[diagnostic(code(keel::usage::relative_interface_path))]
    RelativeInterfacePath {
        dependency: String,
        property: String,
        path: String,
    },

    #[error("Found relative path while evaluating {what} of \"{target}\":\n  \"{path}\"")]
    #[diagnostic(code(keel::usage::relative_path))]
    RelativePath {
        target: String,
        what: &'static str,
        path: String,
    },

    #[error(
        "Imported target \"{dependency}\" includes non-existent path\n  \"{path}\"\n\
         in its INTERFACE_INCLUDE_DIRECTORIES."
    )]
    #[diagnostic(
        code(keel::usage::missing_imported_include),
        help("the path was deleted or moved, or the package that provides it is incomplete")
    )]
    MissingImportedInclude { dependency: String, path: String },

    #[error(
        "Target {target} contains multiple languages with the highest linker preference \
         ({preference}):\n{}",
        .languages.iter().map(|l| format!("  {}\n", l)).collect::<String>()
    )]
    #[diagnostic(
        code(keel::closure::ambiguous_linker_language),
        help("set the LINKER_LANGUAGE property for this target")
    )]
    AmbiguousLinkerLanguage {
        target: String,
        preference: i32,
        languages: Vec<String>,
    },

    #[error(
        "Property \"{property}\" appears in both the {kinds} property in the dependencies of \
         target \"{target}\".  This is not allowed. A property may only require compatibility \
         in a boolean interpretation, a numeric minimum, a numeric maximum or a string \
         interpretation, but not a mixture."
    )]
    #[diagnostic(code(keel::compat::kind_conflict))]
    CompatibleKindConflict {
        target: String,
        property: String,
        kinds: String,
    },

    #[error(
        "Property {property} on target \"{target}\" does\nnot match the INTERFACE_{property} \
         property requirement\nof dependency \"{dependency}\"."
    )]
    #[diagnostic(code(keel::compat::explicit_mismatch))]
    CompatibleExplicitMismatch {
        target: String,
        property: String,
        dependency: String,
    },

    #[error(
        "Property {property} on target \"{target}\" is\nimplied to be {implied} because it was \
         used to determine the link libraries\nalready. The INTERFACE_{property} property on\n\
         dependency \"{dependency}\" is in conflict."
    )]
    #[diagnostic(code(keel::compat::implied_mismatch))]
    CompatibleImpliedMismatch {
        target: String,
        property: String,
        dependency: String,
        implied: &'static str,
    },

    #[error(
        "The INTERFACE_{property} property of \"{dependency}\" does\nnot agree with the value \
         of {property} already determined\nfor \"{target}\"."
    )]
    #[diagnostic(code(keel::compat::seeded_mismatch))]
    CompatibleSeededMismatch {
        target: String,
        property: String,
        dependency: String,
    },

    #[error(
        "Target \"{dependency}\" has property \"{property}\" listed in its {list} property.  \
         This is not allowed.  Only user-defined properties may appear listed in the {list} \
         property."
    )]
    #[diagnostic(code(keel::compat::builtin_property))]
    BuiltinCompatibleProperty {
        dependency: String,
        property: String,
        list: &'static str,
    },

    #[error("Target '{target}' {property} depends on itself.")]
    #[diagnostic(code(keel::output::self_reference))]
    SelfReferentialOutput {
        target: String,
        property: &'static str,
    },

    #[error(
        "Target \"{target}\" has source files which vary by configuration. This is not \
         supported by this generator.\nConfig \"{first}\" and config \"{second}\" differ."
    )]
    #[diagnostic(code(keel::sources::vary_by_config))]
    VaryingSources {
        target: String,
        first: String,
        second: String,
    },

    #[error(
        "Target \"{target}\" has an INTERFACE_LINK_LIBRARIES property which differs from its \
         {legacy} properties."
    )]
    #[diagnostic(code(keel::link::interface_mismatch))]
    ConflictingLinkInterface { target: String, legacy: String },
}

/// Marker for a computation aborted by an already reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fatal;

impl GraphError {
    /// Convert to a user-facing diagnostic with the given severity.
    pub fn to_diagnostic(&self, severity: Severity, backtrace: &Backtrace) -> Diagnostic {
        let mut diag = Diagnostic::new(severity, self.to_string()).with_backtrace(backtrace.clone());

        if let Some(code) = self.code() {
            diag = diag.with_code(code.to_string());
        }

        if let Some(help) = self.help() {
            diag = diag.with_suggestion(help.to_string());
        }

        diag
    }
}
