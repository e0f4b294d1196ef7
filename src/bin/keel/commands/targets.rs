//! `keel targets` command

use anyhow::Result;
use serde::Serialize;

use super::{print_json, Session};
use crate::cli::TargetsArgs;

#[derive(Serialize)]
struct TargetRow {
    name: String,
    kind: String,
    imported: bool,
    linkable: bool,
}

pub fn execute(session: &Session, args: TargetsArgs, json: bool) -> Result<()> {
    let rows: Vec<TargetRow> = session
        .engine
        .project()
        .targets()
        .filter(|(_, target)| args.imported || !target.imported)
        .map(|(_, target)| TargetRow {
            name: target.name.to_string(),
            kind: target.kind.name().to_string(),
            imported: target.imported,
            linkable: target.is_linkable(),
        })
        .collect();

    if json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("no targets");
        return Ok(());
    }

    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for row in &rows {
        let imported = if row.imported { " (imported)" } else { "" };
        println!("{:width$}  {}{}", row.name, row.kind, imported, width = width);
    }
    Ok(())
}
