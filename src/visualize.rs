// src/visualize.rs

//! Plain-text renderings of a task graph.

use std::fmt::Write;

use crate::dag::{DagGraph, parallel_levels, topological_order};
use crate::errors::Result;

const RULE: usize = 40;
const WIDE_RULE: usize = 60;

/// Tasks in insertion order with their direct upstream and downstream
/// neighbours.
pub fn visualize(graph: &DagGraph, name: &str) -> String {
    if graph.is_empty() {
        return "Empty DAG (no tasks defined)".to_string();
    }

    let mut lines = vec![format!("DAG: {name}"), "=".repeat(RULE)];

    for task in graph.tasks() {
        let upstream = graph.dependencies_of(task);
        let downstream = graph.dependents_of(task);

        lines.push(format!("\nTask: {task}"));
        if !upstream.is_empty() {
            lines.push(format!("  Upstream: {}", upstream.join(", ")));
        }
        if !downstream.is_empty() {
            lines.push(format!("  Downstream: {}", downstream.join(", ")));
        }
        if upstream.is_empty() && downstream.is_empty() {
            lines.push("  (isolated task)".to_string());
        }
    }

    lines.join("\n")
}

/// Tabular overview in topological order followed by the groups of tasks
/// that may run concurrently.
pub fn summary(graph: &DagGraph, name: &str) -> Result<String> {
    let mut out = String::new();
    let heavy = "=".repeat(WIDE_RULE);
    let light = "-".repeat(WIDE_RULE);

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "Pipeline: {name}");
    let _ = writeln!(out, "{heavy}");

    if graph.is_empty() {
        let _ = writeln!(out, "(empty pipeline)");
        let _ = write!(out, "{heavy}");
        return Ok(out);
    }

    let _ = writeln!(
        out,
        "{:<24} {:<24} {:<10} {}",
        "Task", "Inputs", "Condition", "Retries"
    );
    let _ = writeln!(out, "{light}");

    for task_name in topological_order(graph)? {
        let Some(task) = graph.task(&task_name) else {
            continue;
        };
        let deps = graph.dependencies_of(&task_name);
        let inputs = if deps.is_empty() {
            "(input)".to_string()
        } else {
            deps.join(", ")
        };
        let condition = if task.has_guard() { "yes" } else { "-" };
        let _ = writeln!(
            out,
            "{:<24} {:<24} {:<10} {}",
            task_name,
            inputs,
            condition,
            task.retry_policy().retries
        );
    }

    let _ = writeln!(out, "{light}");
    let _ = writeln!(out, "Parallel groups:");
    for (i, level) in parallel_levels(graph)?.iter().enumerate() {
        let _ = writeln!(out, "  {}: {}", i + 1, level.join(", "));
    }
    let _ = writeln!(out, "Total tasks: {}", graph.len());
    let _ = write!(out, "{heavy}");

    Ok(out)
}
