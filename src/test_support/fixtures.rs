//! Canned projects shared by several test modules.

use crate::core::{Prop, Target};

use super::TestProject;

/// `app -> {left, right} -> base`, all static except the executable.
pub fn diamond() -> TestProject {
    TestProject::new()
        .target(Target::executable("app").link("left").link("right"))
        .target(
            Target::static_library("left")
                .link("base")
                .with_property(Prop::InterfaceLinkLibraries, "base"),
        )
        .target(
            Target::static_library("right")
                .link("base")
                .with_property(Prop::InterfaceLinkLibraries, "base"),
        )
        .target(Target::static_library("base"))
}

/// A library whose usage requirements reach its consumer.
pub fn with_usage_requirements() -> TestProject {
    TestProject::new()
        .target(Target::executable("app").link("core").with_entry(
            crate::core::EntryKind::IncludeDirectories,
            "/src/app/include",
        ))
        .target(
            Target::static_library("core")
                .with_property(Prop::InterfaceIncludeDirectories, "/src/core/include")
                .with_property(Prop::InterfaceCompileDefinitions, "CORE_API=1")
                .with_property(Prop::InterfaceLinkLibraries, "util"),
        )
        .target(
            Target::static_library("util")
                .with_property(Prop::InterfaceIncludeDirectories, "/src/util/include"),
        )
}

/// Keel.toml for an executable linking one static library.
pub fn demo_manifest() -> &'static str {
    r#"[project]
name = "demo"

[targets.core]
kind = "static-library"
sources = ["core.c"]
include-directories = ["include"]
properties = { INTERFACE_COMPILE_DEFINITIONS = "CORE=1" }

[targets.app]
kind = "executable"
sources = ["main.c"]
link-libraries = ["core"]
"#
}
