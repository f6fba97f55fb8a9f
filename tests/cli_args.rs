// tests/cli_args.rs

use clap::Parser;

use taskgraph::cli::{CliArgs, LogLevel, PipelineName};
use taskgraph::types::{ExecutorKind, MaxWorkers};

#[test]
fn defaults() {
    let args = CliArgs::try_parse_from(["taskgraph"]).unwrap();
    assert_eq!(args.pipeline, PipelineName::Etl);
    assert_eq!(args.executor, None);
    assert_eq!(args.max_workers, None);
    assert!(!args.dry_run);
    assert!(!args.json_events);
}

#[test]
fn overrides() {
    let args = CliArgs::try_parse_from([
        "taskgraph",
        "--pipeline",
        "approval",
        "--executor",
        "process",
        "--max-workers",
        "3",
        "--log-level",
        "debug",
        "--json-events",
        "--dry-run",
    ])
    .unwrap();

    assert_eq!(args.pipeline, PipelineName::Approval);
    assert_eq!(args.executor, Some(ExecutorKind::Process));
    assert_eq!(args.max_workers, MaxWorkers::fixed(3));
    assert_eq!(args.log_level, Some(LogLevel::Debug));
    assert!(args.json_events);
    assert!(args.dry_run);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(CliArgs::try_parse_from(["taskgraph", "--max-workers", "0"]).is_err());
    assert!(CliArgs::try_parse_from(["taskgraph", "--executor", "gpu"]).is_err());
    assert!(CliArgs::try_parse_from(["taskgraph", "--pipeline", "nope"]).is_err());
}
