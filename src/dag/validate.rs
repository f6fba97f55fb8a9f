// src/dag/validate.rs

//! Cycle detection and topological ordering.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Control, DfsEvent, depth_first_search};
use tracing::{debug, error};

use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::errors::{Result, TaskgraphError};

/// Build a petgraph view of the DAG.
///
/// Edge direction: dependency -> dependent.
fn to_graphmap(graph: &DagGraph) -> DiGraphMap<&str, ()> {
    let mut g: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in graph.tasks() {
        g.add_node(name);
    }
    for name in graph.tasks() {
        for dependent in graph.dependents_of(name) {
            g.add_edge(name, dependent.as_str(), ());
        }
    }

    g
}

/// Reject graphs containing a cycle (including a task depending on itself).
///
/// Depth-first search from every node in insertion order; an edge into a
/// node that is still on the DFS stack (a back edge) closes a cycle. The
/// error carries the cycle as `a -> b -> ... -> a`.
pub fn validate(graph: &DagGraph) -> Result<()> {
    let g = to_graphmap(graph);
    let mut parent: HashMap<&str, &str> = HashMap::new();

    let found = depth_first_search(&g, graph.tasks(), |event| match event {
        DfsEvent::TreeEdge(u, v) => {
            parent.insert(v, u);
            Control::Continue
        }
        DfsEvent::BackEdge(u, v) => Control::Break((u, v)),
        _ => Control::Continue,
    });

    if let Control::Break((from, to)) = found {
        // Walk back from `from` to `to` along tree edges.
        let mut cycle: Vec<TaskName> = vec![from.to_string()];
        let mut cur = from;
        while cur != to {
            match parent.get(cur) {
                Some(&p) => {
                    cycle.push(p.to_string());
                    cur = p;
                }
                None => break,
            }
        }
        cycle.reverse();
        cycle.push(to.to_string());

        error!(cycle = %cycle.join(" -> "), "cycle detected in task graph");
        return Err(TaskgraphError::DagCycle {
            task: to.to_string(),
            cycle,
        });
    }

    debug!(tasks = graph.len(), edges = graph.edge_count(), "graph validated");
    Ok(())
}

/// A dependency-respecting order of all tasks.
pub fn topological_order(graph: &DagGraph) -> Result<Vec<TaskName>> {
    let g = to_graphmap(graph);
    match toposort(&g, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(TaskgraphError::DagCycle {
                task: node.to_string(),
                cycle: vec![node.to_string()],
            })
        }
    }
}

/// Group tasks by dependency depth: level 0 holds the roots, level `n` the
/// tasks whose longest dependency chain has length `n`. Tasks on the same
/// level never depend on each other and may run concurrently.
pub fn parallel_levels(graph: &DagGraph) -> Result<Vec<Vec<TaskName>>> {
    let order = topological_order(graph)?;
    let mut depth: HashMap<&str, usize> = HashMap::new();
    let mut levels: Vec<Vec<TaskName>> = Vec::new();

    for name in &order {
        let d = graph
            .dependencies_of(name)
            .iter()
            .filter_map(|dep| depth.get(dep.as_str()))
            .map(|d| d + 1)
            .max()
            .unwrap_or(0);
        depth.insert(name.as_str(), d);
        if levels.len() <= d {
            levels.resize_with(d + 1, Vec::new);
        }
        levels[d].push(name.clone());
    }

    Ok(levels)
}
