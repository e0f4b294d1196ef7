//! `keel closure` command

use anyhow::Result;
use serde::Serialize;

use super::properties::config_label;
use super::{print_json, Session};
use crate::cli::TargetArgs;

#[derive(Serialize)]
struct ClosureReport {
    target: String,
    config: String,
    closure: Vec<String>,
    languages: Vec<String>,
    linker_language: String,
}

pub fn execute(session: &Session, args: TargetArgs, json: bool) -> Result<()> {
    let engine = &session.engine;
    let id = session.target(&args.target)?;
    let config = session.config(args.config.as_deref())?;

    let closure = engine.link_implementation_closure(id, &config);
    let link = engine.link_closure(id, &config);
    let report = ClosureReport {
        target: engine.target(id).name.to_string(),
        config: config.to_string(),
        closure: closure
            .iter()
            .map(|dep| engine.target(*dep).name.to_string())
            .collect(),
        languages: link.languages.clone(),
        linker_language: link.linker_language.clone(),
    };

    if json {
        return print_json(&report);
    }

    println!("# Link closure of `{}`{}:", report.target, config_label(&report.config));
    for name in &report.closure {
        println!("  {}", name);
    }
    println!("languages: {}", report.languages.join(", "));
    if report.linker_language.is_empty() {
        println!("linker language: (none)");
    } else {
        println!("linker language: {}", report.linker_language);
    }
    Ok(())
}
