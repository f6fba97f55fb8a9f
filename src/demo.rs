// src/demo.rs

//! Built-in pipelines behind `taskgraph --pipeline <NAME>`.
//!
//! Every task body is deterministic. The binary also serves these tasks when
//! started as a process-pool worker, so task names are unique across all
//! pipelines.

use std::time::Duration;

use anyhow::{Context, anyhow};
use serde_json::json;

use crate::cli::PipelineName;
use crate::errors::Result;
use crate::exec::TaskRegistry;
use crate::flow::{Flow, FunctionalFlow, GraphBuilder, Layer, Pipeline};
use crate::task::{Inputs, Task, Value};

/// Amount above which the approval pipeline asks for a manual review.
pub const REVIEW_THRESHOLD: i64 = 1200;

/// Build one of the demo pipelines.
pub fn pipeline(name: PipelineName) -> Result<Pipeline> {
    match name {
        PipelineName::Etl => etl(),
        PipelineName::Fanout => fanout(),
        PipelineName::Approval => approval(),
    }
}

/// Every demo task, for serving worker processes.
pub fn demo_registry() -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    for name in [PipelineName::Etl, PipelineName::Fanout, PipelineName::Approval] {
        registry.register_graph(pipeline(name)?.graph())?;
    }
    Ok(registry)
}

/// extract -> transform -> load, built from explicit edges.
pub fn etl() -> Result<Pipeline> {
    let extract = Task::builder("extract", |_| Ok(json!([1, 2, 3, 4, 5])))
        .retries(2)
        .delay(Duration::from_millis(50))
        .build()?;

    let transform = Task::builder("transform", |inputs| {
        let doubled: Vec<i64> = numbers(inputs, "extract")?.iter().map(|n| n * 2).collect();
        Ok(json!(doubled))
    })
    .input("extract")
    .retries(1)
    .build()?;

    let load = Task::builder("load", |inputs| {
        let rows = numbers(inputs, "transform")?;
        Ok(json!({ "rows": rows.len(), "sum": rows.iter().sum::<i64>() }))
    })
    .input("transform")
    .build()?;

    let mut builder = GraphBuilder::new("etl");
    builder.chain(&[&extract, &transform, &load])?;
    builder.build()
}

/// fetch -> {count, total}, built with `Flow`.
pub fn fanout() -> Result<Pipeline> {
    let fetch = Task::new("fetch", |_| Ok(json!([1, 2, 3])))?;

    let count = Task::builder("count", |inputs| Ok(json!(numbers(inputs, "fetch")?.len())))
        .input("fetch")
        .build()?;

    let total = Task::builder("total", |inputs| {
        Ok(json!(numbers(inputs, "fetch")?.iter().sum::<i64>()))
    })
    .input("fetch")
    .build()?;

    Flow::new("fanout").add(&fetch)?.branch(&[&count, &total])?.build()
}

/// draft -> price -> {manual_review | auto_approve} -> finalize, built with
/// `FunctionalFlow`. Exactly one of the two reviews runs.
pub fn approval() -> Result<Pipeline> {
    let draft = Layer::new(Task::new("draft", |_| Ok(json!(42)))?);

    let price = Layer::new(
        Task::builder("price", |inputs| Ok(json!(integer(inputs, "draft")? * 30)))
            .input("draft")
            .build()?,
    );

    let manual_review = Layer::new(
        Task::builder("manual_review", |inputs| {
            Ok(json!({ "status": "manual", "amount": integer(inputs, "price")? }))
        })
        .input("price")
        .when(|v| v.as_i64().is_some_and(|n| n > REVIEW_THRESHOLD))
        .build()?,
    );

    let auto_approve = Layer::new(
        Task::builder("auto_approve", |inputs| {
            Ok(json!({ "status": "auto", "amount": integer(inputs, "price")? }))
        })
        .input("price")
        .when(|v| v.as_i64().is_some_and(|n| n <= REVIEW_THRESHOLD))
        .build()?,
    );

    let finalize = Layer::new(
        Task::builder("finalize", |inputs| {
            let decision = inputs
                .get("manual_review")
                .or_else(|| inputs.get("auto_approve"))
                .and_then(|d| d.get("status"))
                .cloned()
                .unwrap_or(Value::Null);
            Ok(json!({ "amount": integer(inputs, "price")?, "approval": decision }))
        })
        .inputs(["price", "manual_review", "auto_approve"])
        .build()?,
    );

    let draft_node = draft.input();
    let price_node = price.apply(&[&draft_node]);
    let manual_node = manual_review.apply(&[&price_node]);
    let auto_node = auto_approve.apply(&[&price_node]);
    let finalize_node = finalize.apply(&[&price_node, &manual_node, &auto_node]);

    let flow = FunctionalFlow::new("approval", &[&draft_node], &[&finalize_node])?;
    Ok(flow.pipeline().clone())
}

fn numbers(inputs: &Inputs, name: &str) -> anyhow::Result<Vec<i64>> {
    let value = inputs
        .get(name)
        .ok_or_else(|| anyhow!("missing input '{name}'"))?;
    serde_json::from_value(value.clone()).with_context(|| format!("input '{name}' is not a list of integers"))
}

fn integer(inputs: &Inputs, name: &str) -> anyhow::Result<i64> {
    inputs
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow!("input '{name}' is missing or not an integer"))
}
