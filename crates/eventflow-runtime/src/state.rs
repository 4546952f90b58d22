use eventflow_event::Payload;

/// Lifecycle of a single run.
///
/// `Created -> Running -> Completed | Failed`. Terminal states are final.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
  Created,
  Running,
  Completed(Payload),
  Failed(String),
}

impl RunState {
  pub fn is_terminal(&self) -> bool {
    matches!(self, RunState::Completed(_) | RunState::Failed(_))
  }

  pub fn can_transition_to(&self, next: &RunState) -> bool {
    matches!(
      (self, next),
      (RunState::Created, RunState::Running)
        | (RunState::Running, RunState::Completed(_))
        | (RunState::Running, RunState::Failed(_))
    )
  }

  /// Move to `next` if the transition is legal.
  pub fn transition(&mut self, next: RunState) -> bool {
    if self.can_transition_to(&next) {
      *self = next;
      true
    } else {
      false
    }
  }
}
