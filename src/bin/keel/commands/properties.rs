//! `keel properties` command

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use super::{print_json, Session};
use crate::cli::TargetArgs;

#[derive(Serialize)]
struct Resolved {
    target: String,
    config: String,
    include_directories: Vec<String>,
    compile_definitions: Vec<String>,
    compile_options: Vec<String>,
    compile_features: Vec<String>,
    sources: Vec<PathBuf>,
    output: Option<PathBuf>,
    export_macro: Option<String>,
}

pub fn execute(session: &Session, args: TargetArgs, json: bool) -> Result<()> {
    let engine = &session.engine;
    let id = session.target(&args.target)?;
    let config = session.config(args.config.as_deref())?;
    let language = args.language.as_deref();
    let target = engine.target(id);

    let output = target.kind.is_executable_like().then(|| {
        let artifact = target
            .kind
            .artifact(engine.project().settings.is_dll_platform(), false);
        engine.full_path(id, &config, artifact)
    });

    let resolved = Resolved {
        target: target.name.to_string(),
        config: config.to_string(),
        include_directories: engine.include_directories(id, &config, language).to_vec(),
        compile_definitions: engine.compile_definitions(id, &config, language).to_vec(),
        compile_options: engine.compile_options(id, &config, language).to_vec(),
        compile_features: engine.compile_features(id, &config, language).to_vec(),
        sources: engine.sources(id, &config).to_vec(),
        output,
        export_macro: engine.export_macro(id),
    };

    if json {
        return print_json(&resolved);
    }

    println!("# Usage requirements for `{}`{}:", resolved.target, config_label(&resolved.config));
    print_list("INCLUDE_DIRECTORIES", &resolved.include_directories);
    print_list("COMPILE_DEFINITIONS", &resolved.compile_definitions);
    print_list("COMPILE_OPTIONS", &resolved.compile_options);
    print_list("COMPILE_FEATURES", &resolved.compile_features);
    let sources: Vec<String> = resolved
        .sources
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    print_list("SOURCES", &sources);

    if let Some(output) = &resolved.output {
        println!("output: {}", output.display());
    }
    if let Some(symbol) = &resolved.export_macro {
        println!("export macro: {}", symbol);
    }
    Ok(())
}

pub(crate) fn config_label(config: &str) -> String {
    if config.is_empty() {
        String::new()
    } else {
        format!(" ({})", config)
    }
}

fn print_list(name: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    println!("{}:", name);
    for value in values {
        println!("  {}", value);
    }
}
