use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use eventflow_event::EventKind;

use crate::error::GraphError;
use crate::step::StepDef;

/// Dispatch structure derived from a set of step declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGraph {
  /// Event kind -> indices of the steps that accept it, in registration order.
  dispatch: BTreeMap<EventKind, Vec<usize>>,
  /// Kinds from which a stop event can be reached.
  stop_reachable: BTreeSet<EventKind>,
  /// Steps reachable from the start event.
  reachable_steps: BTreeSet<usize>,
}

impl WorkflowGraph {
  /// Build and validate the graph for `steps`.
  pub fn build(steps: &[StepDef]) -> Result<Self, GraphError> {
    let mut names = HashSet::new();
    for step in steps {
      if !names.insert(step.name()) {
        return Err(GraphError::DuplicateStep(step.name().to_string()));
      }
      if step.accepts().is_stop() {
        return Err(GraphError::StopConsumed {
          step: step.name().to_string(),
        });
      }
      if step.declares(&EventKind::Start) {
        return Err(GraphError::EmitsStart {
          step: step.name().to_string(),
        });
      }
    }

    let mut dispatch: BTreeMap<EventKind, Vec<usize>> = BTreeMap::new();
    for (idx, step) in steps.iter().enumerate() {
      dispatch.entry(step.accepts().clone()).or_default().push(idx);
    }

    if !dispatch.contains_key(&EventKind::Start) {
      return Err(GraphError::NoStartStep);
    }

    for step in steps {
      for kind in step.emits() {
        if !kind.is_stop() && !dispatch.contains_key(kind) {
          return Err(GraphError::UnconsumedEvent {
            step: step.name().to_string(),
            kind: kind.clone(),
          });
        }
      }
    }

    let stop_reachable = stop_reachable_kinds(steps);
    if !stop_reachable.contains(&EventKind::Start) {
      return Err(GraphError::NoPathToStop);
    }

    // Acyclic dead-end branches are fine: they end once their events run out.
    let cyclic = cyclic_kinds(steps);
    let reachable_steps = reachable_from_start(steps, &dispatch);
    for idx in &reachable_steps {
      let step = &steps[*idx];
      let traps = step
        .emits()
        .iter()
        .any(|kind| cyclic.contains(kind) && !stop_reachable.contains(kind));
      if traps {
        return Err(GraphError::NoStopReachable {
          step: step.name().to_string(),
        });
      }
    }

    Ok(Self {
      dispatch,
      stop_reachable,
      reachable_steps,
    })
  }

  /// Steps accepting `kind`, in registration order.
  pub fn dispatch(&self, kind: &EventKind) -> &[usize] {
    self
      .dispatch
      .get(kind)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Steps accepting the start event.
  pub fn entry_steps(&self) -> &[usize] {
    self.dispatch(&EventKind::Start)
  }

  /// The full dispatch table.
  pub fn dispatch_table(&self) -> &BTreeMap<EventKind, Vec<usize>> {
    &self.dispatch
  }

  /// Whether a stop event can follow from an event of `kind`.
  pub fn reaches_stop(&self, kind: &EventKind) -> bool {
    self.stop_reachable.contains(kind)
  }

  /// Whether the step at `idx` can ever run.
  pub fn is_reachable(&self, idx: usize) -> bool {
    self.reachable_steps.contains(&idx)
  }
}

/// Fixpoint over kinds: a kind reaches stop if some step accepting it
/// declares an output that reaches stop.
fn stop_reachable_kinds(steps: &[StepDef]) -> BTreeSet<EventKind> {
  let mut reachable = BTreeSet::from([EventKind::Stop]);
  loop {
    let mut changed = false;
    for step in steps {
      if reachable.contains(step.accepts()) {
        continue;
      }
      if step.emits().iter().any(|kind| reachable.contains(kind)) {
        reachable.insert(step.accepts().clone());
        changed = true;
      }
    }
    if !changed {
      return reachable;
    }
  }
}

/// Kinds that can lead back to themselves through declared outputs.
fn cyclic_kinds(steps: &[StepDef]) -> BTreeSet<EventKind> {
  let mut edges: BTreeMap<&EventKind, BTreeSet<&EventKind>> = BTreeMap::new();
  for step in steps {
    edges
      .entry(step.accepts())
      .or_default()
      .extend(step.emits().iter().filter(|kind| !kind.is_stop()));
  }

  let mut cyclic = BTreeSet::new();
  for &origin in edges.keys() {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<&EventKind> = edges[origin].iter().copied().collect();
    while let Some(kind) = queue.pop_front() {
      if kind == origin {
        cyclic.insert(origin.clone());
        break;
      }
      if seen.insert(kind) {
        queue.extend(edges.get(kind).into_iter().flatten().copied());
      }
    }
  }
  cyclic
}

fn reachable_from_start(
  steps: &[StepDef],
  dispatch: &BTreeMap<EventKind, Vec<usize>>,
) -> BTreeSet<usize> {
  let mut seen_kinds = HashSet::from([EventKind::Start]);
  let mut queue = VecDeque::from([EventKind::Start]);
  let mut reachable = BTreeSet::new();

  while let Some(kind) = queue.pop_front() {
    for idx in dispatch.get(&kind).into_iter().flatten() {
      if !reachable.insert(*idx) {
        continue;
      }
      for next in steps[*idx].emits() {
        if !next.is_stop() && seen_kinds.insert(next.clone()) {
          queue.push_back(next.clone());
        }
      }
    }
  }

  reachable
}
