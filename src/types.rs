use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Which concurrency substrate executes task bodies.
///
/// - `Thread`: a bounded pool of blocking worker threads sharing process
///   memory (default).
/// - `Process`: one isolated child process per dispatched task. Task inputs,
///   results and events cross the boundary as JSON, and the worker binary must
///   register the same tasks by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Thread,
    Process,
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "thread" => Ok(ExecutorKind::Thread),
            "process" => Ok(ExecutorKind::Process),
            other => Err(format!(
                "invalid executor: {other} (expected \"thread\" or \"process\")"
            )),
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::Thread => f.write_str("thread"),
            ExecutorKind::Process => f.write_str("process"),
        }
    }
}

/// Capacity bound of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxWorkers {
    /// Let the substrate pick (see [`MaxWorkers::resolve`]).
    #[default]
    Default,
    Fixed(NonZeroUsize),
}

impl MaxWorkers {
    pub fn fixed(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(MaxWorkers::Fixed)
    }

    /// Effective capacity for the given substrate.
    ///
    /// Threads default to `min(32, cpus + 4)`: task bodies are often IO bound.
    /// Processes default to the number of CPUs.
    pub fn resolve(self, kind: ExecutorKind) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        match (self, kind) {
            (MaxWorkers::Fixed(n), _) => n.get(),
            (MaxWorkers::Default, ExecutorKind::Thread) => (cpus + 4).min(32),
            (MaxWorkers::Default, ExecutorKind::Process) => cpus,
        }
    }
}

impl FromStr for MaxWorkers {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("default") {
            return Ok(MaxWorkers::Default);
        }
        let n: usize = s
            .parse()
            .map_err(|_| format!("invalid max_workers: {s} (expected a positive integer or \"default\")"))?;
        MaxWorkers::fixed(n).ok_or_else(|| "max_workers must be >= 1 (got 0)".to_string())
    }
}

impl fmt::Display for MaxWorkers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxWorkers::Default => f.write_str("default"),
            MaxWorkers::Fixed(n) => write!(f, "{n}"),
        }
    }
}

impl<'de> Deserialize<'de> for MaxWorkers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(i64),
            Word(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(n) if n >= 1 => usize::try_from(n)
                .ok()
                .and_then(MaxWorkers::fixed)
                .ok_or_else(|| serde::de::Error::custom(format!("max_workers out of range: {n}"))),
            Raw::Count(n) => Err(serde::de::Error::custom(format!(
                "max_workers must be >= 1 (got {n})"
            ))),
            Raw::Word(w) => w.parse().map_err(serde::de::Error::custom),
        }
    }
}
