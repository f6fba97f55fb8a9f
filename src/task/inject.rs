// src/task/inject.rs

//! Result injection: exact-name selection of accumulated results.

use std::collections::BTreeMap;

use super::Value;

/// Named arguments handed to a task body.
pub type Inputs = BTreeMap<String, Value>;

/// Accumulated results of a run, keyed by task name.
pub type Results = BTreeMap<String, Value>;

/// Build a task's call arguments from everything produced so far.
///
/// Exact set intersection of `declared` and the keys of `results`. Names
/// with no result (not produced yet, or skipped by a guard) are simply
/// absent; the body decides what a missing input means.
pub fn select_inputs(declared: &[String], results: &Results) -> Inputs {
    declared
        .iter()
        .filter_map(|name| results.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}

/// The value a guard predicate is evaluated against: the result of the
/// first dependency, if that dependency produced one.
pub fn guard_value(deps: &[String], results: &Results) -> Option<Value> {
    deps.first().and_then(|first| results.get(first)).cloned()
}
