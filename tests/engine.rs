//! Library-level tests for the resolution engine.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use keel::core::{
    Artifact, ConfigId, CustomCommand, EntryKind, LinkLibraryType, PolicyId, PolicyMap,
    PolicyStatus, Project, ProjectSettings, Prop, SourceFile, Target, TargetKind,
};
use keel::generator::Engine;
use keel::util::{CollectingSink, Config, Severity};

fn settings() -> ProjectSettings {
    ProjectSettings {
        name: "test".to_string(),
        source_dir: PathBuf::from("/src"),
        binary_dir: PathBuf::from("/build"),
        ..Default::default()
    }
}

fn project(targets: Vec<Target>) -> Project {
    let mut project = Project::new(settings());
    for target in targets {
        project.add_target(target).unwrap();
    }
    project
}

fn engine_with(project: Project, policies: PolicyMap) -> (Engine, Rc<CollectingSink>) {
    let sink = Rc::new(CollectingSink::new());
    let engine = Engine::new(project, policies, Rc::clone(&sink));
    (engine, sink)
}

fn engine(targets: Vec<Target>) -> (Engine, Rc<CollectingSink>) {
    engine_with(project(targets), PolicyMap::new())
}

fn errors(sink: &CollectingSink) -> Vec<String> {
    sink.diagnostics()
        .into_iter()
        .filter(|d| d.is_error())
        .map(|d| d.message)
        .collect()
}

fn warnings(sink: &CollectingSink) -> Vec<String> {
    sink.diagnostics()
        .into_iter()
        .filter(|d| d.severity == Severity::Warning)
        .map(|d| d.message)
        .collect()
}

fn policy(id: PolicyId, status: PolicyStatus) -> PolicyMap {
    PolicyMap::new().with(id, status)
}

/// An imported shared library whose include directory is not on disk.
fn imported_with_missing_include(name: &str) -> Target {
    Target::shared_library(name)
        .imported()
        .with_property(Prop::ImportedLocation, format!("/opt/{name}/lib{name}.so"))
        .with_property(
            Prop::InterfaceIncludeDirectories,
            format!("/nonexistent/keel-{name}/include"),
        )
}

fn names(engine: &Engine, items: &[keel::generator::LinkItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item.target {
            Some(id) => engine.target(id).name.to_string(),
            None => item.name.clone(),
        })
        .collect()
}

#[test]
fn test_repeated_queries_return_the_cached_object() {
    let (engine, _) = engine(vec![
        Target::executable("app")
            .link("core")
            .with_entry(EntryKind::IncludeDirectories, "/src/app"),
        Target::static_library("core").with_property(Prop::InterfaceIncludeDirectories, "/src/core"),
    ]);
    let app = engine.find_target("app").unwrap();
    let config = ConfigId::none();

    let first = engine.include_directories(app, &config, None);
    let second = engine.include_directories(app, &config, None);
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(*first, ["/src/app", "/src/core"]);

    assert!(Rc::ptr_eq(
        &engine.link_implementation(app, &config),
        &engine.link_implementation(app, &config)
    ));
    assert!(Rc::ptr_eq(
        &engine.link_closure(app, &config),
        &engine.link_closure(app, &config)
    ));
    assert!(Rc::ptr_eq(
        &engine.link_implementation_closure(app, &config),
        &engine.link_implementation_closure(app, &config)
    ));
}

#[test]
fn test_self_link_is_fatal_under_new_policy() {
    let (engine, sink) = engine(vec![
        Target::static_library("A").link("A").link("B"),
        Target::static_library("B"),
    ]);
    let a = engine.find_target("A").unwrap();

    let implementation = engine.link_implementation(a, &ConfigId::none());
    assert!(implementation.libraries.is_empty());
    assert_eq!(errors(&sink), ["Target \"A\" links to itself."]);
}

#[test]
fn test_self_link_is_dropped_under_old_policy() {
    let (engine, sink) = engine_with(
        project(vec![
            Target::static_library("A").link("A").link("B"),
            Target::static_library("B"),
        ]),
        PolicyMap::new().with(PolicyId::SelfLink, PolicyStatus::Old),
    );
    let a = engine.find_target("A").unwrap();

    let implementation = engine.link_implementation(a, &ConfigId::none());
    assert_eq!(names(&engine, &implementation.libraries), ["B"]);
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn test_direct_values_come_first_and_duplicates_are_dropped() {
    let (engine, _) = engine(vec![
        Target::executable("app")
            .link("dep")
            .with_entry(EntryKind::CompileDefinitions, "X;Y;X"),
        Target::static_library("dep").with_property(Prop::InterfaceCompileDefinitions, "Y;Z"),
    ]);
    let app = engine.find_target("app").unwrap();

    let definitions = engine.compile_definitions(app, &ConfigId::none(), None);
    assert_eq!(*definitions, ["X", "Y", "Z"]);
}

#[test]
fn test_compatible_property_declared_with_two_kinds() {
    let (engine, sink) = engine(vec![
        Target::executable("A").link("D1").link("D2"),
        Target::static_library("D1").with_property(Prop::CompatibleInterfaceBool, "FOO"),
        Target::static_library("D2").with_property(Prop::CompatibleInterfaceString, "FOO"),
    ]);
    let a = engine.find_target("A").unwrap();

    assert!(!engine.check_property_compatibility(a, &ConfigId::none()));
    let errors = errors(&sink);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with(
        "Property \"FOO\" appears in both the COMPATIBLE_INTERFACE_BOOL and the \
         COMPATIBLE_INTERFACE_STRING property in the dependencies of target \"A\"."
    ));
}

#[test]
fn test_numeric_maximum_dominates() {
    let maxver = Prop::custom("INTERFACE_MAXVER");
    let (engine, sink) = engine(vec![
        Target::executable("A").link("D1").link("D2"),
        Target::static_library("D1")
            .with_property(Prop::CompatibleInterfaceNumberMax, "MAXVER")
            .with_property(maxver, "3"),
        Target::static_library("D2")
            .with_property(Prop::CompatibleInterfaceNumberMax, "MAXVER")
            .with_property(maxver, "5"),
    ]);
    let a = engine.find_target("A").unwrap();
    let config = ConfigId::none();

    assert_eq!(
        engine.compatible_number_max(a, "MAXVER", &config).as_deref(),
        Some("5")
    );
    assert_eq!(
        engine.compatible_number_min(a, "MAXVER", &config).as_deref(),
        Some("3")
    );
    assert_eq!(engine.compatible_value(a, "MAXVER", &config).as_deref(), Some("5"));
    assert!(engine.check_property_compatibility(a, &config));
    assert!(errors(&sink).is_empty());
}

#[test]
fn test_conflicting_string_requirements() {
    let flavor = Prop::custom("INTERFACE_FLAVOR");
    let (engine, sink) = engine(vec![
        Target::executable("A").link("D1").link("D2"),
        Target::static_library("D1")
            .with_property(Prop::CompatibleInterfaceString, "FLAVOR")
            .with_property(flavor, "sweet"),
        Target::static_library("D2").with_property(flavor, "sour"),
    ]);
    let a = engine.find_target("A").unwrap();

    assert!(!engine.check_property_compatibility(a, &ConfigId::none()));
    let errors = errors(&sink);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("The INTERFACE_FLAVOR property of \"D2\" does\nnot agree"));
}

#[test]
fn test_diamond_closure_lists_shared_dependency_once() {
    let (engine, _) = engine(vec![
        Target::executable("A").link("B").link("C"),
        Target::static_library("B")
            .link("D")
            .with_property(Prop::InterfaceLinkLibraries, "D"),
        Target::static_library("C")
            .link("D")
            .with_property(Prop::InterfaceLinkLibraries, "D"),
        Target::static_library("D"),
    ]);
    let a = engine.find_target("A").unwrap();

    let closure: Vec<String> = engine
        .link_implementation_closure(a, &ConfigId::none())
        .iter()
        .map(|id| engine.target(*id).name.to_string())
        .collect();
    assert_eq!(closure, ["B", "D", "C"]);
}

#[test]
fn test_head_independent_interface_is_shared_between_heads() {
    let (engine, _) = engine(vec![
        Target::executable("A").link("L"),
        Target::executable("B").link("L"),
        Target::static_library("L").with_property(Prop::InterfaceLinkLibraries, "M"),
        Target::static_library("M"),
    ]);
    let a = engine.find_target("A").unwrap();
    let b = engine.find_target("B").unwrap();
    let l = engine.find_target("L").unwrap();
    let config = ConfigId::none();

    let for_a = engine.link_interface(l, &config, a);
    let for_b = engine.link_interface(l, &config, b);
    assert!(Rc::ptr_eq(&for_a, &for_b));
    assert_eq!(names(&engine, &for_a.libraries), ["M"]);
}

#[test]
fn test_head_sensitive_interface_is_computed_per_head() {
    let (engine, _) = engine(vec![
        Target::executable("A").link("L"),
        Target::executable("B").link("L"),
        Target::static_library("L").with_property(
            Prop::InterfaceLinkLibraries,
            "$<$<STREQUAL:$<TARGET_PROPERTY:NAME>,A>:M>",
        ),
        Target::static_library("M"),
    ]);
    let a = engine.find_target("A").unwrap();
    let b = engine.find_target("B").unwrap();
    let l = engine.find_target("L").unwrap();
    let config = ConfigId::none();

    let for_a = engine.link_interface(l, &config, a);
    let for_b = engine.link_interface(l, &config, b);
    assert!(!Rc::ptr_eq(&for_a, &for_b));
    assert_eq!(names(&engine, &for_a.libraries), ["M"]);
    assert!(for_b.libraries.is_empty());
}

#[test]
fn test_tied_linker_preference_is_ambiguous() {
    let mut config = Config::default();
    config.languages.preference.insert("X".to_string(), 5);
    config.languages.preference.insert("Y".to_string(), 5);
    config.languages.extensions.insert("x".to_string(), "X".to_string());
    config.languages.extensions.insert("y".to_string(), "Y".to_string());

    let (engine, sink) = engine(vec![Target::executable("mixed")
        .with_entry(EntryKind::Sources, "/src/a.x")
        .with_entry(EntryKind::Sources, "/src/b.y")]);
    let engine = engine.with_config(config);
    let mixed = engine.find_target("mixed").unwrap();

    let closure = engine.link_closure(mixed, &ConfigId::none());
    assert_eq!(closure.linker_language, "");

    let errors = errors(&sink);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("multiple languages with the highest linker preference (5)"));
    assert!(errors[0].contains("  X\n") && errors[0].contains("  Y\n"));
}

#[test]
fn test_linker_language_override_and_propagation() {
    let (engine, sink) = engine(vec![
        Target::executable("app")
            .link("engine")
            .with_entry(EntryKind::Sources, "/src/main.c"),
        Target::static_library("engine").with_entry(EntryKind::Sources, "/src/engine.cpp"),
        Target::executable("tool")
            .with_entry(EntryKind::Sources, "/src/tool.cpp")
            .with_property(Prop::LinkerLanguage, "C"),
    ]);
    let config = ConfigId::none();

    let app = engine.link_closure(engine.find_target("app").unwrap(), &config);
    assert_eq!(app.languages, ["C", "CXX"]);
    assert_eq!(app.linker_language, "CXX");

    let tool = engine.link_closure(engine.find_target("tool").unwrap(), &config);
    assert_eq!(tool.linker_language, "C");
    assert!(errors(&sink).is_empty());
}

#[test]
fn test_trace_adds_generated_sources_and_utilities() {
    let mut project = project(vec![
        Target::executable("app").with_entry(EntryKind::Sources, "/src/main.c"),
        Target::executable("mkgen").with_entry(EntryKind::Sources, "/src/mkgen.c"),
    ]);
    project.add_source(SourceFile::new("/src/main.c").object_depend("/build/gen.h"));
    project.add_source(
        SourceFile::new("/build/gen.c").command(
            CustomCommand::new("mkgen")
                .arg("gen.c")
                .output("/build/gen.c")
                .output("/build/gen.h"),
        ),
    );
    let (mut engine, _) = engine_with(project, PolicyMap::new());
    let app = engine.find_target("app").unwrap();
    let config = ConfigId::none();

    assert_eq!(*engine.sources(app, &config), [PathBuf::from("/src/main.c")]);

    let summary = engine.trace_dependencies(app);
    assert_eq!(summary.new_sources, [PathBuf::from("/build/gen.c")]);
    assert!(summary.utilities.contains("mkgen"));
    assert_eq!(
        engine.source_depends(app, Path::new("/src/main.c")),
        [PathBuf::from("/build/gen.c")]
    );

    assert_eq!(
        *engine.sources(app, &config),
        [PathBuf::from("/src/main.c"), PathBuf::from("/build/gen.c")]
    );
    let utilities = engine.utility_items(app);
    assert_eq!(utilities.len(), 1);
    assert_eq!(utilities[0].target, engine.find_target("mkgen"));

    let again = engine.trace_dependencies(app);
    assert!(Rc::ptr_eq(&summary, &again));
}

#[test]
fn test_output_locations() {
    let mut settings = settings();
    settings.executable_output_path = Some("bin".to_string());
    settings.configurations = vec!["Debug".to_string(), "Release".to_string()];
    settings.multi_config = true;
    let mut project = Project::new(settings);
    project
        .add_target(Target::executable("app").with_property(Prop::OutputName, "app-$<CONFIG>"))
        .unwrap();
    project.add_target(Target::static_library("core")).unwrap();
    project
        .add_target(
            Target::static_library("fixed").with_property(Prop::ArchiveOutputDirectory, "/out/lib"),
        )
        .unwrap();
    let (engine, sink) = engine_with(project, PolicyMap::new());
    let debug = ConfigId::new("Debug");

    let app = engine.find_target("app").unwrap();
    assert_eq!(
        engine.full_path(app, &debug, Artifact::Runtime),
        PathBuf::from("/build/bin/Debug/app-Debug")
    );

    let core = engine.find_target("core").unwrap();
    assert_eq!(
        engine.full_path(core, &debug, Artifact::Archive),
        PathBuf::from("/build/Debug/libcore.a")
    );

    let fixed = engine.find_target("fixed").unwrap();
    assert_eq!(
        engine.output_directory(fixed, &debug, Artifact::Archive),
        PathBuf::from("/out/lib/Debug")
    );
    assert!(errors(&sink).is_empty());
}

#[test]
fn test_output_name_referring_to_itself() {
    let (engine, sink) = engine(vec![
        Target::executable("app").with_property(Prop::OutputName, "$<TARGET_FILE_NAME:app>")
    ]);
    let app = engine.find_target("app").unwrap();

    engine.output_name(app, &ConfigId::none(), Artifact::Runtime);
    assert!(errors(&sink)
        .iter()
        .any(|e| e == "Target 'app' OUTPUT_NAME depends on itself."));
}

#[test]
fn test_export_macro_and_rpath_queries() {
    let (engine, _) = engine(vec![
        Target::shared_library("my-lib").link("dep"),
        Target::shared_library("dep").with_property(Prop::DefineSymbol, "DEP_BUILDING"),
        Target::static_library("plain"),
    ]);
    let config = ConfigId::none();
    let lib = engine.find_target("my-lib").unwrap();

    assert_eq!(engine.export_macro(lib).as_deref(), Some("my_lib_EXPORTS"));
    assert_eq!(
        engine.export_macro(engine.find_target("dep").unwrap()).as_deref(),
        Some("DEP_BUILDING")
    );
    assert_eq!(engine.export_macro(engine.find_target("plain").unwrap()), None);

    assert!(engine.has_build_tree_rpath(lib, &config));
    assert!(!engine.has_install_tree_rpath(lib, &config));
}

#[test]
fn test_link_to_object_library_is_rejected() {
    let (engine, sink) = engine(vec![
        Target::executable("app").link("objs"),
        Target::new("objs", TargetKind::ObjectLibrary),
    ]);
    let app = engine.find_target("app").unwrap();

    assert!(engine.link_implementation(app, &ConfigId::none()).libraries.is_empty());
    assert!(errors(&sink)[0].starts_with("Target \"app\" links to OBJECT library \"objs\""));
}

#[test]
fn test_sources_varying_by_configuration() {
    let mut settings = settings();
    settings.configurations = vec!["Debug".to_string(), "Release".to_string()];
    let mut project = Project::new(settings);
    project
        .add_target(
            Target::executable("app")
                .with_entry(EntryKind::Sources, "/src/main.c")
                .with_entry(EntryKind::Sources, "$<$<CONFIG:Debug>:/src/debug.c>"),
        )
        .unwrap();
    let (engine, sink) = engine_with(project, PolicyMap::new());
    let app = engine.find_target("app").unwrap();

    assert_eq!(engine.sources(app, &ConfigId::new("Debug")).len(), 2);
    assert_eq!(engine.sources(app, &ConfigId::new("Release")).len(), 1);
    assert!(engine.config_common_sources(app).is_none());
    assert!(errors(&sink)[0].contains("Config \"Debug\" and config \"Release\" differ."));
}

#[test]
fn test_relative_inherited_paths_name_the_dependency() {
    let (engine, sink) = engine(vec![
        Target::executable("app")
            .link("dep")
            .with_entry(EntryKind::Sources, "/src/main.c"),
        Target::static_library("dep")
            .with_property(Prop::InterfaceIncludeDirectories, "include")
            .with_property(Prop::InterfaceSources, "extra.c"),
    ]);
    let app = engine.find_target("app").unwrap();
    let config = ConfigId::none();

    assert!(engine.include_directories(app, &config, None).is_empty());
    assert_eq!(*engine.sources(app, &config), [PathBuf::from("/src/main.c")]);
    assert_eq!(
        errors(&sink),
        [
            "Target \"dep\" contains relative path in its INTERFACE_INCLUDE_DIRECTORIES:\n  \"include\"",
            "Target \"dep\" contains relative path in its INTERFACE_SOURCES:\n  \"extra.c\"",
        ]
    );
}

#[test]
fn test_missing_imported_include_is_downgraded_under_legacy_policies() {
    for status in [PolicyStatus::Old, PolicyStatus::Warn] {
        let (engine, sink) = engine_with(
            project(vec![
                Target::executable("app").link("$<1:ext>").link("core"),
                imported_with_missing_include("ext"),
                Target::static_library("core").with_property(Prop::InterfaceIncludeDirectories, "/src/core"),
            ]),
            policy(PolicyId::ImportedIncludeExistence, status),
        );
        let app = engine.find_target("app").unwrap();

        // Collection stops at the missing path, so later dependencies add nothing.
        assert!(engine.include_directories(app, &ConfigId::none(), None).is_empty());
        assert!(errors(&sink).is_empty(), "{:?}", status);
        let warnings = warnings(&sink);
        assert_eq!(warnings.len(), 1, "{:?}", status);
        assert!(warnings[0].starts_with(
            "Imported target \"ext\" includes non-existent path\n  \"/nonexistent/keel-ext/include\""
        ));
    }
}

#[test]
fn test_missing_imported_include_is_fatal() {
    let cases = [
        ("$<1:ext>", PolicyStatus::New),
        // Without an expression the legacy policy does not apply.
        ("ext", PolicyStatus::Old),
    ];
    for (link, status) in cases {
        let (engine, sink) = engine_with(
            project(vec![
                Target::executable("app").link(link),
                imported_with_missing_include("ext"),
            ]),
            policy(PolicyId::ImportedIncludeExistence, status),
        );
        let app = engine.find_target("app").unwrap();

        assert!(engine.include_directories(app, &ConfigId::none(), None).is_empty());
        let errors = errors(&sink);
        assert_eq!(errors.len(), 1, "{}", link);
        assert!(errors[0].starts_with("Imported target \"ext\" includes non-existent path"));
    }
}

#[test]
fn test_link_item_whitespace_policy() {
    let message = "Target \"app\" links to item \" core \" which has leading or trailing whitespace.";
    let targets = || vec![Target::executable("app").link(" core "), Target::static_library("core")];

    let (engine, sink) = engine(targets());
    let app = engine.find_target("app").unwrap();
    assert!(engine.link_implementation(app, &ConfigId::none()).libraries.is_empty());
    assert_eq!(errors(&sink), [message]);

    let (engine, sink) = engine_with(
        project(targets()),
        policy(PolicyId::LinkItemWhitespace, PolicyStatus::Old),
    );
    let app = engine.find_target("app").unwrap();
    let implementation = engine.link_implementation(app, &ConfigId::none());
    assert_eq!(names(&engine, &implementation.libraries), ["core"]);
    assert!(sink.diagnostics().is_empty());

    let (engine, sink) = engine_with(
        project(targets()),
        policy(PolicyId::LinkItemWhitespace, PolicyStatus::Warn),
    );
    let app = engine.find_target("app").unwrap();
    let implementation = engine.link_implementation(app, &ConfigId::none());
    assert_eq!(names(&engine, &implementation.libraries), ["core"]);
    assert_eq!(warnings(&sink), [message]);
    assert!(errors(&sink).is_empty());
}

#[test]
fn test_typed_link_libraries_follow_the_configuration() {
    let (engine, sink) = engine(vec![Target::executable("app")
        .with_legacy_link("dbg", LinkLibraryType::Debug)
        .with_legacy_link("opt", LinkLibraryType::Optimized)
        .with_legacy_link("all", LinkLibraryType::General)]);
    let app = engine.find_target("app").unwrap();

    let debug = engine.link_implementation(app, &ConfigId::new("Debug"));
    assert_eq!(names(&engine, &debug.libraries), ["dbg", "all"]);
    assert_eq!(names(&engine, &debug.wrong_config_libraries), ["opt"]);

    let release = engine.link_implementation(app, &ConfigId::new("Release"));
    assert_eq!(names(&engine, &release.libraries), ["opt", "all"]);
    assert_eq!(names(&engine, &release.wrong_config_libraries), ["dbg"]);
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn test_link_interface_multiplicity_per_configuration() {
    let mut cyclic = Target::static_library("cyclic").with_property(Prop::LinkInterfaceMultiplicity, "2");
    cyclic
        .properties
        .set_for_config(Prop::LinkInterfaceMultiplicity, ConfigId::new("Release"), "4");
    let (engine, _) = engine(vec![cyclic, Target::static_library("plain")]);
    let cyclic = engine.find_target("cyclic").unwrap();
    let plain = engine.find_target("plain").unwrap();

    assert_eq!(engine.link_interface(cyclic, &ConfigId::new("Debug"), cyclic).multiplicity, 2);
    assert_eq!(engine.link_interface(cyclic, &ConfigId::new("Release"), cyclic).multiplicity, 4);
    assert_eq!(engine.link_interface(plain, &ConfigId::none(), plain).multiplicity, 1);
}

#[test]
fn test_explicit_interface_keeps_omitted_shared_libraries_as_runtime_deps() {
    let (engine, _) = engine(vec![
        Target::shared_library("lib")
            .link("sdep")
            .link("adep")
            .with_property(Prop::InterfaceLinkLibraries, "adep"),
        Target::shared_library("sdep"),
        Target::static_library("adep"),
    ]);
    let lib = engine.find_target("lib").unwrap();

    let iface = engine.link_interface(lib, &ConfigId::none(), lib);
    assert!(iface.explicit);
    assert_eq!(names(&engine, &iface.libraries), ["adep"]);
    assert_eq!(names(&engine, &iface.shared_deps), ["sdep"]);
}

#[test]
fn test_missing_namespaced_target_policy() {
    let targets = || vec![Target::executable("app").link("Pkg::missing")];

    let (engine, sink) = engine(targets());
    let app = engine.find_target("app").unwrap();
    engine.link_closure(app, &ConfigId::none());
    let errors = errors(&sink);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with(
        "Target \"app\" links to target \"Pkg::missing\" but the target was not found."
    ));

    let (engine, sink) = engine_with(
        project(targets()),
        policy(PolicyId::AliasTargetMissing, PolicyStatus::Old),
    );
    let app = engine.find_target("app").unwrap();
    engine.link_closure(app, &ConfigId::none());
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn test_per_configuration_compile_definitions_policy() {
    let app = || {
        let mut app = Target::executable("app").with_entry(EntryKind::CompileDefinitions, "ALL");
        app.properties
            .set_for_config(Prop::CompileDefinitions, ConfigId::new("Debug"), "DBG");
        app
    };
    let debug = ConfigId::new("Debug");

    let (engine, sink) = engine(vec![app()]);
    let id = engine.find_target("app").unwrap();
    assert_eq!(*engine.compile_definitions(id, &debug, None), ["ALL"]);
    assert!(sink.diagnostics().is_empty());

    let (engine, sink) = engine_with(
        project(vec![app()]),
        policy(PolicyId::ConfigCompileDefinitions, PolicyStatus::Old),
    );
    let id = engine.find_target("app").unwrap();
    assert_eq!(*engine.compile_definitions(id, &debug, None), ["ALL", "DBG"]);
    assert!(sink.diagnostics().is_empty());

    let (engine, sink) = engine_with(
        project(vec![app()]),
        policy(PolicyId::ConfigCompileDefinitions, PolicyStatus::Warn),
    );
    let id = engine.find_target("app").unwrap();
    assert_eq!(*engine.compile_definitions(id, &debug, None), ["ALL", "DBG"]);
    assert_eq!(warnings(&sink).len(), 1);
}

#[test]
fn test_implied_link_interface_warns_once() {
    let targets = || vec![Target::shared_library("lib").link("dep"), Target::static_library("dep")];
    let warn = || policy(PolicyId::LinkInterfaceProperty, PolicyStatus::Warn);
    let config = ConfigId::none();

    let (engine, sink) = engine_with(project(targets()), warn());
    let lib = engine.find_target("lib").unwrap();
    let iface = engine.link_interface(lib, &config, lib);
    assert_eq!(names(&engine, &iface.libraries), ["dep"]);
    engine.link_interface(lib, &ConfigId::new("Debug"), lib);
    assert_eq!(
        warnings(&sink),
        ["Target \"lib\" has an INTERFACE_LINK_LIBRARIES property which differs from its \
          LINK_LIBRARIES properties."]
    );

    let (engine, sink) = engine_with(project(targets()), warn());
    let lib = engine.find_target("lib").unwrap();
    let usage = engine.link_interface_libraries(lib, &config, lib, true);
    assert_eq!(names(&engine, &usage.libraries), ["dep"]);
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn test_conflicting_bool_requirements() {
    let fast = Prop::custom("INTERFACE_FAST");
    let (engine, sink) = engine(vec![
        Target::executable("A").link("D1").link("D2"),
        Target::static_library("D1")
            .with_property(Prop::CompatibleInterfaceBool, "FAST")
            .with_property(fast, "ON"),
        Target::static_library("D2").with_property(fast, "OFF"),
    ]);
    let a = engine.find_target("A").unwrap();

    assert!(!engine.check_property_compatibility(a, &ConfigId::none()));
    let errors = errors(&sink);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("The INTERFACE_FAST property of \"D2\" does\nnot agree"));
}

#[test]
fn test_imported_interface_falls_back_to_imported_property() {
    let ext = || {
        Target::shared_library("ext")
            .imported()
            .with_property(Prop::ImportedLocation, "/opt/ext/libext.so")
    };
    let config = ConfigId::none();

    let (engine, _) = engine(vec![
        Target::executable("app").link("ext"),
        ext().with_property(Prop::ImportedLinkInterfaceLibraries, "dep"),
    ]);
    let app = engine.find_target("app").unwrap();
    let iface = engine.link_interface(engine.find_target("ext").unwrap(), &config, app);
    assert_eq!(names(&engine, &iface.libraries), ["dep"]);

    let (engine, _) = engine_with(
        project(vec![
            Target::executable("app").link("ext"),
            ext()
                .with_property(Prop::ImportedLinkInterfaceLibraries, "olddep")
                .with_property(Prop::InterfaceLinkLibraries, "newdep"),
        ]),
        policy(PolicyId::LinkInterfaceProperty, PolicyStatus::Old),
    );
    let app = engine.find_target("app").unwrap();
    let iface = engine.link_interface(engine.find_target("ext").unwrap(), &config, app);
    assert_eq!(names(&engine, &iface.libraries), ["newdep"]);
}

#[test]
fn test_interface_naming_object_library_is_not_reported() {
    let (engine, sink) = engine(vec![
        Target::executable("app").link("lib"),
        Target::static_library("lib").with_property(Prop::InterfaceLinkLibraries, "objs"),
        Target::new("objs", TargetKind::ObjectLibrary),
    ]);
    let app = engine.find_target("app").unwrap();
    let lib = engine.find_target("lib").unwrap();
    let config = ConfigId::none();

    assert!(engine.link_interface(lib, &config, app).libraries.is_empty());
    engine.link_closure(app, &config);
    assert!(errors(&sink).is_empty());
}

#[test]
fn test_trace_finds_tool_named_by_expression() {
    let mut project = project(vec![
        Target::executable("app").with_entry(EntryKind::Sources, "/src/main.c"),
        Target::executable("mkgen").with_entry(EntryKind::Sources, "/src/mkgen.c"),
    ]);
    project.add_source(SourceFile::new("/src/main.c").object_depend("/build/gen.h"));
    project.add_source(
        SourceFile::new("/build/gen.c").command(
            CustomCommand::new("$<TARGET_FILE:mkgen>")
                .arg("gen.c")
                .output("/build/gen.c")
                .output("/build/gen.h"),
        ),
    );
    let (mut engine, _) = engine_with(project, PolicyMap::new());
    let app = engine.find_target("app").unwrap();

    let summary = engine.trace_dependencies(app);
    assert!(summary.utilities.contains("mkgen"));
}

#[test]
fn test_traced_sources_reach_dependent_link_closures() {
    let mut project = project(vec![
        Target::executable("app")
            .link("gen_lib")
            .with_entry(EntryKind::Sources, "/src/main.c"),
        Target::static_library("gen_lib").with_entry(EntryKind::Sources, "/src/lib.c"),
    ]);
    project.add_source(SourceFile::new("/src/lib.c").object_depend("/build/gen.cpp"));
    project.add_source(
        SourceFile::new("/build/gen.cpp")
            .command(CustomCommand::new("/usr/bin/mkgen").output("/build/gen.cpp")),
    );
    let (mut engine, _) = engine_with(project, PolicyMap::new());
    let app = engine.find_target("app").unwrap();
    let gen_lib = engine.find_target("gen_lib").unwrap();
    let config = ConfigId::none();

    assert_eq!(engine.link_closure(app, &config).languages, ["C"]);

    let summary = engine.trace_dependencies(gen_lib);
    assert_eq!(summary.new_sources, [PathBuf::from("/build/gen.cpp")]);

    assert_eq!(engine.link_interface(gen_lib, &config, app).languages, ["C", "CXX"]);
    let closure = engine.link_closure(app, &config);
    assert_eq!(closure.languages, ["C", "CXX"]);
    assert_eq!(closure.linker_language, "CXX");
}
