//! Dependency ordering for groups and cycle checks for included configs.

use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;
use petgraph::Direction::Incoming;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::ConfError;
use crate::types::Group;

/// Order groups so that every group comes after the groups it lists as
/// members. Groups that do not depend on each other keep declaration order.
///
/// References to groups not declared in `groups` (e.g. `@all`) are ignored.
pub(crate) fn order_groups(groups: &IndexMap<String, Group>) -> Result<Vec<&Group>, ConfError> {
    let mut graph: DiGraph<&str, ()> = DiGraph::with_capacity(groups.len(), 0);
    let nodes: IndexMap<&str, NodeIndex> = groups
        .keys()
        .map(|name| (name.as_str(), graph.add_node(name.as_str())))
        .collect();

    for (name, group) in groups {
        let dependent = nodes[name.as_str()];
        for referenced in group.group_refs() {
            if let Some(&dependency) = nodes.get(referenced) {
                graph.add_edge(dependency, dependent, ());
            }
        }
    }

    toposort(&graph, None).map_err(|cycle| {
        ConfError::GroupDependency(format!(
            "@{} is part of a membership cycle",
            graph[cycle.node_id()]
        ))
    })?;

    // Node indices follow declaration order, so always taking the lowest
    // ready index keeps independent groups where they were declared.
    let mut pending: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.neighbors_directed(idx, Incoming).count())
        .collect();
    let mut ready: BTreeSet<NodeIndex> = graph
        .node_indices()
        .filter(|idx| pending[idx.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(groups.len());
    while let Some(next) = ready.pop_first() {
        order.push(&groups[graph[next]]);
        for dependent in graph.neighbors(next) {
            pending[dependent.index()] -= 1;
            if pending[dependent.index()] == 0 {
                ready.insert(dependent);
            }
        }
    }

    debug!(
        event = "Serialize",
        phase = "GroupOrder",
        groups = groups.len(),
        edges = graph.edge_count()
    );

    Ok(order)
}

/// One config file on an include chain, identified by its path relative to
/// the root file's directory and, when read from disk, its canonical path.
#[derive(Debug, Clone)]
pub(crate) struct IncludeNode<'a> {
    pub logical: String,
    pub source: Option<&'a Path>,
}

impl IncludeNode<'_> {
    fn same_file(&self, other: &IncludeNode<'_>) -> bool {
        match (self.source, other.source) {
            (Some(a), Some(b)) if a == b => true,
            _ => self.logical == other.logical,
        }
    }
}

/// Reject `candidates` that already appear on `chain` (the prospective
/// parent followed by its ancestors); linking them would make a file
/// include itself.
pub(crate) fn check_include_chain(
    chain: &[IncludeNode<'_>],
    candidates: &[IncludeNode<'_>],
) -> Result<(), ConfError> {
    for candidate in candidates {
        if let Some(ancestor) = chain.iter().find(|node| node.same_file(candidate)) {
            let path = chain
                .iter()
                .rev()
                .map(|node| node.logical.as_str())
                .chain(std::iter::once(candidate.logical.as_str()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ConfError::ConfigDependency(format!(
                "{} is already included above it: {path}",
                ancestor.logical
            )));
        }
    }
    Ok(())
}
