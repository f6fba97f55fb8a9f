// tests/front_ends.rs

mod common;

use serde_json::json;

use taskgraph::errors::TaskgraphError;
use taskgraph::flow::{Flow, FunctionalFlow, GraphBuilder, Layer};
use taskgraph::task::Task;

use crate::common::{builders, options};

fn deps(graph: &taskgraph::dag::DagGraph, name: &str) -> Vec<String> {
    graph.dependencies_of(name).to_vec()
}

#[test]
fn builder_edges_and_chain() -> taskgraph::errors::Result<()> {
    let a = builders::constant("a", json!(1));
    let b = builders::constant("b", json!(2));
    let c = builders::constant("c", json!(3));
    let d = builders::constant("d", json!(4));

    let mut builder = GraphBuilder::new("built");
    builder.chain(&[&a, &b])?;
    builder.add_edges(&[&a, &b], &[&c])?;
    builder.task(&d)?;
    builder.depends_on("d", &["c"])?;
    let pipeline = builder.build()?;

    let graph = pipeline.graph();
    assert_eq!(pipeline.name(), "built");
    assert_eq!(graph.tasks().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
    assert_eq!(deps(graph, "b"), vec!["a"]);
    assert_eq!(deps(graph, "c"), vec!["a", "b"]);
    assert_eq!(deps(graph, "d"), vec!["c"]);
    Ok(())
}

#[test]
fn builder_rejects_cycles_on_build() -> taskgraph::errors::Result<()> {
    let a = builders::constant("a", json!(1));
    let b = builders::constant("b", json!(2));

    let mut builder = GraphBuilder::new("loop");
    builder.add_edge(&a, &b)?.add_edge(&b, &a)?;

    assert!(matches!(builder.build(), Err(TaskgraphError::DagCycle { .. })));
    Ok(())
}

#[test]
fn builder_rejects_a_different_task_with_the_same_name() {
    let first = builders::constant("same", json!(1));
    let second = builders::constant("same", json!(2));

    let mut builder = GraphBuilder::new("dupes");
    builder.task(&first).unwrap();
    let err = builder.task(&second).unwrap_err();
    assert!(matches!(err, TaskgraphError::DuplicateTask(ref n) if n == "same"));

    // Re-adding the very same task is fine.
    builder.task(&first).unwrap();
}

#[test]
fn flow_add_branch_merge() -> taskgraph::errors::Result<()> {
    let a = builders::constant("a", json!(1));
    let b = builders::constant("b", json!(2));
    let c = builders::constant("c", json!(3));
    let d = builders::constant("d", json!(4));
    let e = builders::constant("e", json!(5));

    let flow = Flow::new("shape").add(&a)?.branch(&[&b, &c])?;
    assert_eq!(flow.branch_points(), ["b", "c"]);

    let flow = flow.merge(&d)?.add(&e)?;
    assert_eq!(flow.branch_points(), ["e"]);

    let pipeline = flow.build()?;
    let graph = pipeline.graph();
    assert_eq!(deps(graph, "b"), vec!["a"]);
    assert_eq!(deps(graph, "c"), vec!["a"]);
    assert_eq!(deps(graph, "d"), vec!["b", "c"]);
    assert_eq!(deps(graph, "e"), vec!["d"]);

    let (opts, _sink) = options(2);
    let results = pipeline.run(&opts)?;
    assert_eq!(results.len(), 5);
    Ok(())
}

#[test]
fn flow_add_after_branch_attaches_to_every_branch() -> taskgraph::errors::Result<()> {
    let a = builders::constant("a", json!(1));
    let b = builders::constant("b", json!(2));
    let c = builders::constant("c", json!(3));
    let d = builders::constant("d", json!(4));

    let flow = Flow::new("fan").add(&a)?.branch(&[&b, &c])?.add(&d)?;
    assert_eq!(deps(flow.graph(), "d"), vec!["b", "c"]);
    Ok(())
}

#[test]
fn flow_branch_or_merge_without_a_start_is_an_error() {
    let a = builders::constant("a", json!(1));

    let err = Flow::new("empty").branch(&[&a]).unwrap_err();
    assert!(matches!(err, TaskgraphError::EmptyFlow(ref n) if n == "empty"));

    let err = Flow::new("empty").merge(&a).unwrap_err();
    assert!(matches!(err, TaskgraphError::EmptyFlow(_)));
}

#[test]
fn functional_flow_collects_everything_reachable_from_outputs() -> taskgraph::errors::Result<()> {
    let load = Layer::new(builders::constant("load", json!([3, 1, 2])));
    let sort = Layer::new(
        Task::builder("sort", |inputs| {
            let mut v: Vec<i64> = serde_json::from_value(inputs["load"].clone())?;
            v.sort();
            Ok(json!(v))
        })
        .input("load")
        .build()?,
    );
    let size = Layer::new(
        Task::builder("size", |inputs| {
            Ok(json!(inputs["load"].as_array().map(Vec::len).unwrap_or(0)))
        })
        .input("load")
        .build()?,
    );

    let x = load.input();
    let sorted = sort.apply(&[&x]);
    let counted = size.apply(&[&x]);
    let flow = FunctionalFlow::new("functional", &[&x], &[&sorted, &counted])?;

    assert_eq!(flow.input_names(), ["load"]);
    assert_eq!(flow.output_names(), ["sort", "size"]);
    assert_eq!(flow.pipeline().graph().len(), 3);

    let (opts, _sink) = options(2);
    let outputs = flow.run(&opts)?;
    assert_eq!(outputs, vec![Some(json!([1, 2, 3])), Some(json!(3))]);
    Ok(())
}

#[test]
fn functional_flow_reports_skipped_outputs_as_none() -> taskgraph::errors::Result<()> {
    let source = Layer::new(builders::constant("source", json!(0)));
    let never = Layer::new(
        Task::builder("never", |_| Ok(json!("ran")))
            .when(|_| false)
            .build()?,
    );

    let s = source.input();
    let n = never.apply(&[&s]);
    let flow = FunctionalFlow::new("skips", &[&s], &[&n, &s])?;

    let (opts, _sink) = options(1);
    assert_eq!(flow.run(&opts)?, vec![None, Some(json!(0))]);
    Ok(())
}

#[test]
fn functional_flow_rejects_unreachable_inputs_and_reused_layers() {
    let a = Layer::new(builders::constant("a", json!(1)));
    let b = Layer::new(builders::constant("b", json!(2)));
    let c = Layer::new(builders::constant("c", json!(3)));

    let xa = a.input();
    let xb = b.apply(&[&xa]);
    let lonely = c.input();
    let err = FunctionalFlow::new("f", &[&lonely], &[&xb]).unwrap_err();
    assert!(matches!(err, TaskgraphError::TaskNotFound(ref n) if n == "c"));

    // The same layer applied twice yields two nodes with one name.
    let first = b.apply(&[&xa]);
    let again = b.apply(&[&first]);
    let err = FunctionalFlow::new("f", &[&xa], &[&again]).unwrap_err();
    assert!(matches!(err, TaskgraphError::DuplicateTask(ref n) if n == "b"));
}

#[test]
fn summary_lists_inputs_and_outputs() -> taskgraph::errors::Result<()> {
    let a = Layer::new(builders::constant("a", json!(1)));
    let x = a.input();
    let flow = FunctionalFlow::new("tiny", &[&x], &[&x])?;

    let summary = flow.summary()?;
    assert!(summary.contains("Pipeline: tiny"));
    assert!(summary.ends_with("Input tasks: 1\nOutput tasks: 1"));
    Ok(())
}
