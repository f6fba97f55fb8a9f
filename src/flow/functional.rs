// src/flow/functional.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::dag::DagGraph;
use crate::engine::{RunOptions, TaskName};
use crate::errors::{Result, TaskgraphError};
use crate::flow::Pipeline;
use crate::task::{Task, Value};

/// A task wrapped so it can be applied to upstream nodes.
#[derive(Debug, Clone)]
pub struct Layer {
    task: Arc<Task>,
}

impl Layer {
    pub fn new(task: Arc<Task>) -> Self {
        Self { task }
    }

    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// A node without upstream inputs.
    pub fn input(&self) -> Node {
        self.apply(&[])
    }

    /// A node that runs after `inputs`. The first input is the node the
    /// task's guard conditions on.
    pub fn apply(&self, inputs: &[&Node]) -> Node {
        Node(Arc::new(NodeInner {
            task: Arc::clone(&self.task),
            inputs: inputs.iter().map(|n| (*n).clone()).collect(),
        }))
    }
}

/// A task applied to specific upstream nodes. Cheap to clone.
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

struct NodeInner {
    task: Arc<Task>,
    inputs: Vec<Node>,
}

impl Node {
    pub fn name(&self) -> &str {
        self.0.task.name()
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.0.task
    }

    pub fn inputs(&self) -> &[Node] {
        &self.0.inputs
    }

    fn same_node(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<&str> = self.inputs().iter().map(Node::name).collect();
        write!(f, "{}({})", self.name(), inputs.join(", "))
    }
}

/// Graph declared by applying layers, built back-to-front from an ordered
/// list of outputs.
#[derive(Debug, Clone)]
pub struct FunctionalFlow {
    pipeline: Pipeline,
    inputs: Vec<TaskName>,
    outputs: Vec<TaskName>,
}

impl FunctionalFlow {
    /// Collect every node reachable from `outputs`.
    ///
    /// Each declared input must be part of that graph. Two different nodes
    /// carrying the same task name (the same layer applied twice) are
    /// rejected.
    pub fn new(name: impl Into<String>, inputs: &[&Node], outputs: &[&Node]) -> Result<Self> {
        let name = name.into();
        let mut graph = DagGraph::new();
        let mut seen: HashMap<String, Node> = HashMap::new();

        for output in outputs {
            collect(output, &mut graph, &mut seen)?;
        }

        for input in inputs {
            match seen.get(input.name()) {
                Some(node) if node.same_node(input) => {}
                Some(_) => return Err(TaskgraphError::DuplicateTask(input.name().to_string())),
                None => return Err(TaskgraphError::TaskNotFound(input.name().to_string())),
            }
        }

        if graph.is_empty() {
            warn!(flow = %name, "functional flow has no nodes");
        }

        Ok(Self {
            pipeline: Pipeline::new(name, graph)?,
            inputs: inputs.iter().map(|n| n.name().to_string()).collect(),
            outputs: outputs.iter().map(|n| n.name().to_string()).collect(),
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn input_names(&self) -> &[TaskName] {
        &self.inputs
    }

    pub fn output_names(&self) -> &[TaskName] {
        &self.outputs
    }

    /// Run and return the output values in declaration order. A skipped
    /// output yields `None`.
    pub fn run(&self, options: &RunOptions) -> Result<Vec<Option<Value>>> {
        let results = self.pipeline.run(options)?;
        Ok(self
            .outputs
            .iter()
            .map(|name| results.get(name).cloned())
            .collect())
    }

    pub fn visualize(&self) -> String {
        self.pipeline.visualize()
    }

    pub fn summary(&self) -> Result<String> {
        let mut out = self.pipeline.summary()?;
        out.push_str(&format!(
            "\nInput tasks: {}\nOutput tasks: {}",
            self.inputs.len(),
            self.outputs.len()
        ));
        Ok(out)
    }
}

/// Post-order walk: upstream nodes join the graph before their dependents,
/// and edges are added in input order.
fn collect(node: &Node, graph: &mut DagGraph, seen: &mut HashMap<String, Node>) -> Result<()> {
    if let Some(existing) = seen.get(node.name()) {
        if existing.same_node(node) {
            return Ok(());
        }
        return Err(TaskgraphError::DuplicateTask(node.name().to_string()));
    }
    seen.insert(node.name().to_string(), node.clone());

    for input in node.inputs() {
        collect(input, graph, seen)?;
    }

    graph.add_task(node.task())?;
    for input in node.inputs() {
        graph.add_edge(input.name(), node.name())?;
    }
    Ok(())
}
