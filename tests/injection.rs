// tests/injection.rs

mod common;

use std::sync::Arc;

use serde_json::json;

use taskgraph::cli::PipelineName;
use taskgraph::demo;
use taskgraph::task::{Inputs, Task, guard_value, select_inputs};

use crate::common::{builders, graph_of, options};

/// Returns the injected inputs verbatim.
fn echo_inputs(name: &str, inputs: &[&str]) -> Arc<Task> {
    Task::builder(name, |inputs: &Inputs| Ok(json!(inputs)))
        .inputs(inputs.iter().copied())
        .build()
        .unwrap()
}

#[test]
fn only_declared_names_are_injected() {
    let a = builders::constant("a", json!(1));
    let b = builders::constant("b", json!(2));
    let sink = echo_inputs("sink", &["a"]);
    let graph = graph_of(&[&a, &b, &sink], &[("a", "sink"), ("b", "sink")]);

    let (opts, _events) = options(2);
    let results = taskgraph::execute(&graph, &opts).unwrap();

    assert_eq!(results["sink"], json!({ "a": 1 }));
}

#[test]
fn declared_subset_of_upstream_results() {
    let x = builders::constant("x", json!("X"));
    let y = builders::constant("y", json!("Y"));
    let z = builders::constant("z", json!("Z"));
    let consumer = echo_inputs("consumer", &["x", "y"]);
    let graph = graph_of(
        &[&x, &y, &z, &consumer],
        &[("x", "consumer"), ("y", "consumer"), ("z", "consumer")],
    );

    let (opts, _events) = options(3);
    let results = taskgraph::execute(&graph, &opts).unwrap();

    assert_eq!(results["consumer"], json!({ "x": "X", "y": "Y" }));
    assert_eq!(results.len(), 4);
}

#[test]
fn transitive_results_can_be_requested_by_name() {
    let a = builders::constant("a", json!("from a"));
    let b = builders::constant("b", json!("from b"));
    let c = echo_inputs("c", &["a", "b"]);
    let graph = graph_of(&[&a, &b, &c], &[("a", "b"), ("b", "c")]);

    let (opts, _events) = options(1);
    let results = taskgraph::execute(&graph, &opts).unwrap();

    assert_eq!(results["c"], json!({ "a": "from a", "b": "from b" }));
}

#[test]
fn names_without_results_are_left_out() {
    let a = builders::constant("a", json!(true));
    let c = echo_inputs("c", &["a", "does_not_exist"]);
    let graph = graph_of(&[&a, &c], &[("a", "c")]);

    let (opts, _events) = options(1);
    let results = taskgraph::execute(&graph, &opts).unwrap();

    assert_eq!(results["c"], json!({ "a": true }));
}

#[test]
fn fan_out_consumers_each_get_the_value() {
    let pipeline = demo::pipeline(PipelineName::Fanout).unwrap();
    let (opts, _events) = options(3);

    let results = pipeline.run(&opts).unwrap();

    assert_eq!(results["fetch"], json!([1, 2, 3]));
    assert_eq!(results["count"], json!(3));
    assert_eq!(results["total"], json!(6));
}

#[test]
fn etl_pipeline_threads_values_through_the_chain() {
    let pipeline = demo::pipeline(PipelineName::Etl).unwrap();
    let (opts, _events) = options(2);

    let results = pipeline.run(&opts).unwrap();

    assert_eq!(results["transform"], json!([2, 4, 6, 8, 10]));
    assert_eq!(results["load"], json!({ "rows": 5, "sum": 30 }));
}

#[test]
fn selection_helpers() {
    let mut results = taskgraph::task::Results::new();
    results.insert("x".into(), json!(1));
    results.insert("y".into(), json!(2));

    let declared = vec!["y".to_string(), "z".to_string()];
    let inputs = select_inputs(&declared, &results);
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs["y"], json!(2));

    let deps = vec!["y".to_string(), "x".to_string()];
    assert_eq!(guard_value(&deps, &results), Some(json!(2)));
    assert_eq!(guard_value(&[], &results), None);
    assert_eq!(guard_value(&["z".to_string()], &results), None);
}
