// src/flow/mod.rs

//! Graph construction front-ends.
//!
//! All three produce a [`Pipeline`]: a validated [`DagGraph`] plus a name.
//!
//! - [`builder`]: explicit edges between tasks (`GraphBuilder`).
//! - [`sequential`]: `add` / `branch` / `merge` chaining (`Flow`).
//! - [`functional`]: layers applied to nodes, built back from the outputs
//!   (`FunctionalFlow`).

pub mod builder;
pub mod functional;
pub mod pipeline;
pub mod sequential;

pub use builder::GraphBuilder;
pub use functional::{FunctionalFlow, Layer, Node};
pub use pipeline::Pipeline;
pub use sequential::Flow;
