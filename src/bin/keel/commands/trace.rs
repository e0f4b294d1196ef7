//! `keel trace` command

use anyhow::Result;

use super::{print_json, Session};
use crate::cli::TraceArgs;

pub fn execute(session: &mut Session, args: TraceArgs, json: bool) -> Result<()> {
    let id = session.target(&args.target)?;
    let summary = session.engine.trace_dependencies(id);

    if json {
        return print_json(summary.as_ref());
    }

    let name = session.engine.target(id).name;
    println!("# Traced dependencies of `{}`:", name);
    if summary.new_sources.is_empty() {
        println!("no generated sources added");
    } else {
        println!("added sources:");
        for path in &summary.new_sources {
            println!("  {}", path.display());
        }
    }
    for (source, depends) in &summary.source_depends {
        println!("{}:", source.display());
        for dep in depends {
            println!("  <- {}", dep.display());
        }
    }
    if !summary.utilities.is_empty() {
        println!("utilities:");
        for utility in &summary.utilities {
            println!("  {}", utility);
        }
    }
    Ok(())
}
