//! The project-wide link graph.
//!
//! One node per target, one edge from a target to every target it links.
//! Built from the resolved link implementations (and, for imported targets,
//! their link interfaces) of a single configuration.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::core::{ConfigId, TargetId, TargetKind};

use super::Engine;

/// A strongly connected set of targets that link each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCycle {
    pub targets: Vec<String>,
    /// How many times the cycle is repeated on the link line
    pub multiplicity: u32,
    /// Every member is a static library
    pub all_static: bool,
}

impl LinkCycle {
    /// Only static libraries may link each other circularly.
    pub fn is_allowed(&self) -> bool {
        self.all_static
    }
}

/// Link dependencies between the targets of a project.
#[derive(Debug, Clone)]
pub struct LinkGraph {
    graph: DiGraph<TargetId, ()>,
    nodes: HashMap<TargetId, NodeIndex>,
    names: HashMap<TargetId, String>,
    multiplicity: HashMap<TargetId, u32>,
    static_libraries: Vec<TargetId>,
}

impl LinkGraph {
    /// Resolve every target of the engine's project for `config`.
    pub fn build(engine: &Engine, config: &ConfigId) -> Self {
        let mut graph = LinkGraph {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
            names: HashMap::new(),
            multiplicity: HashMap::new(),
            static_libraries: Vec::new(),
        };

        for (id, target) in engine.project().targets() {
            graph.add_target(id, target.name.to_string());
            if target.kind == TargetKind::StaticLibrary {
                graph.static_libraries.push(id);
                let iface = engine.link_interface(id, config, id);
                graph.multiplicity.insert(id, iface.multiplicity);
            }
        }

        for (id, target) in engine.project().targets() {
            let items = if target.imported {
                engine.link_interface(id, config, id).libraries.clone()
            } else if target.kind == TargetKind::InterfaceLibrary {
                engine
                    .link_interface_libraries(id, config, id, false)
                    .libraries
                    .clone()
            } else {
                engine.link_implementation(id, config).libraries.clone()
            };
            for dep in items.iter().filter_map(|item| item.target) {
                graph.add_edge(id, dep);
            }
        }

        tracing::debug!(
            "link graph for `{}`: {} targets, {} edges",
            config,
            graph.graph.node_count(),
            graph.graph.edge_count()
        );
        graph
    }

    fn add_target(&mut self, id: TargetId, name: String) {
        if self.nodes.contains_key(&id) {
            return;
        }
        let node = self.graph.add_node(id);
        self.nodes.insert(id, node);
        self.names.insert(id, name);
    }

    fn add_edge(&mut self, from: TargetId, to: TargetId) {
        if let (Some(&from_node), Some(&to_node)) = (self.nodes.get(&from), self.nodes.get(&to)) {
            if !self.graph.contains_edge(from_node, to_node) {
                self.graph.add_edge(from_node, to_node, ());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Targets `id` links directly.
    pub fn dependencies(&self, id: TargetId) -> Vec<TargetId> {
        self.neighbors(id, petgraph::Direction::Outgoing)
    }

    /// Targets that link `id` directly.
    pub fn dependents(&self, id: TargetId) -> Vec<TargetId> {
        self.neighbors(id, petgraph::Direction::Incoming)
    }

    fn neighbors(&self, id: TargetId, direction: petgraph::Direction) -> Vec<TargetId> {
        let Some(&node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut found: Vec<TargetId> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|n| self.graph[n])
            .collect();
        found.sort();
        found
    }

    /// Targets with their dependencies first.
    ///
    /// Members of a cycle are adjacent, in no particular order.
    pub fn build_order(&self) -> Vec<TargetId> {
        // Tarjan yields components in reverse topological order, which for
        // dependent -> dependency edges puts dependencies first.
        tarjan_scc(&self.graph)
            .into_iter()
            .flatten()
            .map(|node| self.graph[node])
            .collect()
    }

    /// Every set of targets that depend on each other circularly.
    pub fn cycles(&self) -> Vec<LinkCycle> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&n| self.graph.contains_edge(n, n))
            })
            .map(|component| {
                let ids: Vec<TargetId> = component.iter().map(|&n| self.graph[n]).collect();
                let all_static = ids.iter().all(|id| self.static_libraries.contains(id));
                let multiplicity = ids
                    .iter()
                    .filter_map(|id| self.multiplicity.get(id))
                    .copied()
                    .max()
                    .unwrap_or(1);
                let mut targets: Vec<String> = ids.iter().map(|id| self.name(*id).to_string()).collect();
                targets.sort();
                LinkCycle {
                    targets,
                    multiplicity,
                    all_static,
                }
            })
            .collect()
    }

    pub fn name(&self, id: TargetId) -> &str {
        self.names.get(&id).map(String::as_str).unwrap_or_default()
    }

    /// Graphviz rendering with target names as labels.
    pub fn to_dot(&self) -> String {
        let labelled = self.graph.map(|_, id| self.name(*id).to_string(), |_, _| "");
        format!("{}", Dot::with_config(&labelled, &[DotConfig::EdgeNoLabel]))
    }
}
