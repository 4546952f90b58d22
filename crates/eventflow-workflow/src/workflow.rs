use std::future::Future;

use eventflow_context::SharedContext;
use eventflow_event::{Event, EventKind};

use crate::error::{GraphError, StepError};
use crate::graph::WorkflowGraph;
use crate::step::StepDef;

/// A validated workflow ready for execution.
#[derive(Debug, Clone)]
pub struct Workflow {
  name: String,
  steps: Vec<StepDef>,
  graph: WorkflowGraph,
}

impl Workflow {
  /// Validate `steps` and derive the dispatch table.
  pub fn new(name: impl Into<String>, steps: Vec<StepDef>) -> Result<Self, GraphError> {
    let graph = WorkflowGraph::build(&steps)?;
    Ok(Self {
      name: name.into(),
      steps,
      graph,
    })
  }

  pub fn builder(name: impl Into<String>) -> WorkflowBuilder {
    WorkflowBuilder {
      name: name.into(),
      steps: Vec::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn steps(&self) -> &[StepDef] {
    &self.steps
  }

  pub fn graph(&self) -> &WorkflowGraph {
    &self.graph
  }

  /// Get a step by index.
  pub fn step(&self, idx: usize) -> Option<&StepDef> {
    self.steps.get(idx)
  }

  /// Get a step by name.
  pub fn get_step(&self, name: &str) -> Option<&StepDef> {
    self.steps.iter().find(|s| s.name() == name)
  }

  /// Steps that accept events of `kind`, in dispatch order.
  pub fn steps_for<'a>(
    &'a self,
    kind: &EventKind,
  ) -> impl Iterator<Item = (usize, &'a StepDef)> + use<'a> {
    self
      .graph
      .dispatch(kind)
      .iter()
      .map(move |idx| (*idx, &self.steps[*idx]))
  }
}

/// Fluent registration of steps.
pub struct WorkflowBuilder {
  name: String,
  steps: Vec<StepDef>,
}

impl WorkflowBuilder {
  /// Register a step from its parts.
  pub fn step<F, Fut>(
    mut self,
    name: impl Into<String>,
    accepts: impl Into<EventKind>,
    emits: impl IntoIterator<Item = EventKind>,
    body: F,
  ) -> Self
  where
    F: Fn(SharedContext, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Event>, StepError>> + Send + 'static,
  {
    self.steps.push(StepDef::new(name, accepts, emits, body));
    self
  }

  /// Register an already built step.
  pub fn add(mut self, step: StepDef) -> Self {
    self.steps.push(step);
    self
  }

  pub fn build(self) -> Result<Workflow, GraphError> {
    Workflow::new(self.name, self.steps)
  }
}
