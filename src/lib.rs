// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod demo;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod flow;
pub mod logging;
pub mod task;
pub mod types;
pub mod visualize;

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::errors::{Result, TaskgraphError};
use crate::events::JsonSink;
use crate::exec::{ExecutorBackend, ProcessPoolBackend, ThreadPoolBackend, WorkerCommand};
use crate::flow::Pipeline;
use crate::task::Results;
use crate::types::ExecutorKind;

pub use crate::engine::RunOptions;
pub use crate::flow::{Flow, FunctionalFlow, GraphBuilder, Layer, Node};
pub use crate::task::{Inputs, Task, Value};

/// Check `graph` for cycles and unknown edge endpoints without running it.
pub fn validate(graph: &DagGraph) -> Result<()> {
    dag::validate(graph)
}

/// ASCII overview of `graph`.
pub fn visualize(graph: &DagGraph, name: &str) -> String {
    visualize::visualize(graph, name)
}

/// Run `graph` to completion and return every produced result, keyed by
/// task name.
///
/// Blocks the caller on a dedicated Tokio runtime. From async code use
/// [`execute_async`] instead.
pub fn execute(graph: &DagGraph, options: &RunOptions) -> Result<Results> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(TaskgraphError::Other(anyhow!(
            "execute() called from within a Tokio runtime; use execute_async()"
        )));
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(execute_async(graph, options))
}

/// Async form of [`execute`].
///
/// This wires together:
/// - graph validation
/// - scheduler / core runtime
/// - the thread or process pool backend
/// - the optional result cache
pub async fn execute_async(graph: &DagGraph, options: &RunOptions) -> Result<Results> {
    validate(graph)?;

    let scheduler = Scheduler::new(graph);
    let core = CoreRuntime::new(scheduler, options.name.clone());
    let capacity = options.capacity();

    // Completion channel between the backend and the runtime.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    debug!(
        run = %options.name,
        executor = %options.executor,
        capacity,
        "executing graph"
    );

    match options.executor {
        ExecutorKind::Thread => {
            let backend = ThreadPoolBackend::new(
                rt_tx,
                capacity,
                Arc::clone(&options.sleeper),
                Arc::clone(&options.sink),
            );
            drive(core, rt_rx, backend, options).await
        }
        ExecutorKind::Process => {
            let command = match &options.worker {
                Some(command) => command.clone(),
                None => WorkerCommand::current_exe()?,
            };
            let backend =
                ProcessPoolBackend::new(rt_tx, capacity, command, Arc::clone(&options.sink));
            drive(core, rt_rx, backend, options).await
        }
    }
}

async fn drive<E: ExecutorBackend>(
    core: CoreRuntime,
    rt_rx: mpsc::Receiver<RuntimeEvent>,
    backend: E,
    options: &RunOptions,
) -> Result<Results> {
    Runtime::new(core, rt_rx, backend, Arc::clone(&options.sink))
        .with_cache(options.cache.clone())
        .with_cache_key(options.cache_key.clone())
        .run()
        .await
}

/// High-level entry point used by `main.rs`: run one of the demo pipelines
/// with settings from the config file, overridden by the CLI.
pub async fn run(args: CliArgs, cfg: ConfigFile) -> anyhow::Result<()> {
    let pipeline = demo::pipeline(args.pipeline)?;

    if args.dry_run {
        print_dry_run(&pipeline)?;
        return Ok(());
    }

    let mut options = cfg.run_options()?;
    if cfg.run.name.is_none() {
        options.name = pipeline.name().to_string();
    }
    if let Some(executor) = args.executor {
        options.executor = executor;
    }
    if let Some(max_workers) = args.max_workers {
        options.max_workers = max_workers;
    }
    if args.json_events {
        options.sink = Arc::new(JsonSink::stdout());
    }

    info!(
        pipeline = %pipeline.name(),
        executor = %options.executor,
        max_workers = %options.max_workers,
        "running pipeline"
    );

    let results = execute_async(pipeline.graph(), &options).await?;

    if args.json_events {
        // stdout carries the event stream; the results are the last line.
        println!("{}", serde_json::json!({ "results": results }));
    } else {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

/// Print the graph and its summary; nothing runs.
fn print_dry_run(pipeline: &Pipeline) -> anyhow::Result<()> {
    println!("{}", pipeline.visualize());
    println!();
    println!("{}", pipeline.summary()?);
    debug!("dry-run complete (no execution)");
    Ok(())
}
