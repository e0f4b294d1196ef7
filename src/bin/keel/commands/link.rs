//! `keel link` command

use anyhow::Result;
use serde::Serialize;

use super::properties::config_label;
use super::{print_json, Session};
use crate::cli::TargetArgs;
use keel::generator::{LinkImplementation, LinkInterface, LinkItem};

#[derive(Serialize)]
struct LinkReport<'a> {
    target: String,
    config: String,
    implementation: &'a LinkImplementation,
    interface: &'a LinkInterface,
    relink_before_install: bool,
}

pub fn execute(session: &Session, args: TargetArgs, json: bool) -> Result<()> {
    let engine = &session.engine;
    let id = session.target(&args.target)?;
    let config = session.config(args.config.as_deref())?;

    let implementation = engine.link_implementation(id, &config);
    let interface = engine.link_interface(id, &config, id);
    let report = LinkReport {
        target: engine.target(id).name.to_string(),
        config: config.to_string(),
        implementation: &implementation,
        interface: &interface,
        relink_before_install: engine.needs_relink_before_install(id, &config),
    };

    if json {
        return print_json(&report);
    }

    println!("# Link implementation of `{}`{}:", report.target, config_label(&report.config));
    print_items(&implementation.libraries);
    if !implementation.wrong_config_libraries.is_empty() {
        println!("other configurations:");
        print_items(&implementation.wrong_config_libraries);
    }

    println!();
    if !interface.exists {
        println!("# `{}` has no link interface", report.target);
        return Ok(());
    }
    let origin = if interface.implementation_is_interface {
        " (from the link implementation)"
    } else {
        ""
    };
    println!("# Link interface of `{}`{}:", report.target, origin);
    print_items(&interface.libraries);
    if !interface.shared_deps.is_empty() {
        println!("shared dependencies:");
        print_items(&interface.shared_deps);
    }
    if interface.multiplicity > 1 {
        println!("multiplicity: {}", interface.multiplicity);
    }
    if report.relink_before_install {
        println!("relinks before install");
    }
    Ok(())
}

fn print_items(items: &[LinkItem]) {
    for item in items {
        let kind = if item.target.is_some() { "target" } else { "external" };
        println!("  {}    # {}", item.name, kind);
    }
}
