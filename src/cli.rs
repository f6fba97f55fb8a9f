// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::types::{ExecutorKind, MaxWorkers};

/// Command-line arguments for `taskgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskgraph",
    version,
    about = "Run task graphs with dependency ordering, retries and bounded parallelism.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Taskgraph.toml` is used when it exists; otherwise
    /// built-in defaults apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Which built-in pipeline to run.
    #[arg(long, value_enum, value_name = "NAME", default_value = "etl")]
    pub pipeline: PipelineName,

    /// Execution substrate (thread or process). Overrides the config file.
    #[arg(long, value_name = "KIND")]
    pub executor: Option<ExecutorKind>,

    /// Pool capacity: a positive integer or "default". Overrides the config
    /// file.
    #[arg(long, value_name = "N")]
    pub max_workers: Option<MaxWorkers>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, the config file, then `TASKGRAPH_LOG`, then `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Write lifecycle events to stdout as JSON lines.
    #[arg(long)]
    pub json_events: bool,

    /// Validate and print the graph and its summary, but run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Built-in demo pipelines.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PipelineName {
    /// extract -> transform -> load, with per-stage retries.
    Etl,
    /// fetch -> {count, total}.
    Fanout,
    /// draft -> price -> {manual_review | auto_approve} -> finalize.
    Approval,
}

/// Log level as exposed on the CLI and in the config file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Log output format.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
