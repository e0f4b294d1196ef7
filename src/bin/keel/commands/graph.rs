//! `keel graph` command

use anyhow::Result;
use serde::Serialize;

use super::{print_json, Session};
use crate::cli::GraphArgs;
use keel::generator::graph::LinkCycle;
use keel::generator::LinkGraph;

#[derive(Serialize)]
struct GraphReport {
    config: String,
    build_order: Vec<String>,
    edges: Vec<(String, String)>,
    cycles: Vec<LinkCycle>,
}

pub fn execute(session: &Session, args: GraphArgs, json: bool) -> Result<()> {
    let engine = &session.engine;
    let config = session.config(args.config.as_deref())?;
    let graph = LinkGraph::build(engine, &config);

    if args.dot {
        print!("{}", graph.to_dot());
        return Ok(());
    }

    let order = graph.build_order();
    let mut edges = Vec::new();
    for id in &order {
        for dep in graph.dependencies(*id) {
            edges.push((graph.name(*id).to_string(), graph.name(dep).to_string()));
        }
    }
    let report = GraphReport {
        config: config.to_string(),
        build_order: order.iter().map(|id| graph.name(*id).to_string()).collect(),
        edges,
        cycles: graph.cycles(),
    };

    if json {
        return print_json(&report);
    }

    println!("# Build order:");
    for (index, name) in report.build_order.iter().enumerate() {
        println!("{:>3}. {}", index + 1, name);
    }
    for cycle in &report.cycles {
        let status = if cycle.is_allowed() { "allowed" } else { "not allowed" };
        println!(
            "cycle ({}, multiplicity {}): {}",
            status,
            cycle.multiplicity,
            cycle.targets.join(" -> ")
        );
    }
    Ok(())
}
