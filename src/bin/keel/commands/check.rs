//! `keel check` command

use anyhow::{bail, Result};
use serde::Serialize;

use super::{print_json, Session};
use crate::cli::CheckArgs;
use keel::generator::LinkGraph;
use keel::util::diagnostic::{Diagnostic, DiagnosticSink};

#[derive(Serialize)]
struct CheckReport {
    targets: usize,
    configurations: usize,
    errors: usize,
    warnings: usize,
}

pub fn execute(session: &Session, args: CheckArgs, json: bool) -> Result<()> {
    let engine = &session.engine;
    let configs = engine.project().configurations();

    engine.check_all();

    for config in &configs {
        for cycle in LinkGraph::build(engine, config).cycles() {
            if !cycle.is_allowed() {
                session.sink.report(
                    Diagnostic::error(format!(
                        "Cyclic dependencies are allowed only among static libraries: {}",
                        cycle.targets.join(", ")
                    ))
                    .with_code("keel::link::cycle")
                    .with_context(format!("configuration: {}", config)),
                );
                continue;
            }
            tracing::debug!(
                "static libraries {} form a cycle repeated {} times",
                cycle.targets.join(", "),
                cycle.multiplicity
            );
        }
    }

    let report = CheckReport {
        targets: engine.project().len(),
        configurations: configs.len(),
        errors: session.sink.errors(),
        warnings: session.sink.warnings(),
    };

    if json {
        print_json(&report)?;
    } else if report.errors == 0 {
        println!(
            "checked {} targets in {} configuration(s): {} warning(s)",
            report.targets, report.configurations, report.warnings
        );
    }

    if args.deny_warnings && report.warnings > 0 {
        bail!("{} warning(s) reported and --deny-warnings is set", report.warnings);
    }
    Ok(())
}
