use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Idle,
    Running,
    Paused,
    Stopping,
    Stopped,
    Finished,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Stopped | ExecutionStatus::Finished)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStatus::Idle => "idle",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Paused => "paused",
            ExecutionStatus::Stopping => "stopping",
            ExecutionStatus::Stopped => "stopped",
            ExecutionStatus::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Progress of one run. Cancellation lives in the run's `RunControl`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionState {
    pub status: ExecutionStatus,
    pub loop_count: u32,
    pub current_scene: Option<String>,
    /// 1-based index of the action in flight; 0 before the first action.
    pub action_index: usize,
    pub action_total: usize,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self {
            status: ExecutionStatus::Idle,
            loop_count: 0,
            current_scene: None,
            action_index: 0,
            action_total: 0,
        }
    }
}

/// State written by the run thread and read by the supervisor.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<Mutex<ExecutionState>>);

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ExecutionState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> ExecutionState {
        self.lock().clone()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.lock().status
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut ExecutionState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Set the status unless the run already reached a terminal one.
    /// Returns whether it changed.
    pub fn transition(&self, status: ExecutionStatus) -> bool {
        let mut state = self.lock();
        if state.status == status || state.status.is_terminal() {
            return false;
        }
        state.status = status;
        true
    }

    /// Move to `next` only from one of the `from` statuses.
    pub fn transition_from(&self, from: &[ExecutionStatus], next: ExecutionStatus) -> bool {
        let mut state = self.lock();
        if !from.contains(&state.status) {
            return false;
        }
        state.status = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_status_is_sticky() {
        let state = SharedState::new();
        assert!(state.transition(ExecutionStatus::Running));
        assert!(!state.transition(ExecutionStatus::Running));
        assert!(state.transition(ExecutionStatus::Stopped));
        assert!(!state.transition(ExecutionStatus::Running));
        assert_eq!(state.status(), ExecutionStatus::Stopped);
    }

    #[test]
    fn transition_from_checks_current_status() {
        let state = SharedState::new();
        assert!(!state.transition_from(&[ExecutionStatus::Running], ExecutionStatus::Paused));
        assert!(state.transition_from(&[ExecutionStatus::Idle], ExecutionStatus::Running));
        assert!(state.transition_from(&[ExecutionStatus::Running], ExecutionStatus::Paused));
        assert_eq!(state.status(), ExecutionStatus::Paused);
    }

    #[test]
    fn clones_share_progress() {
        let state = SharedState::new();
        let reader = state.clone();
        state.update(|s| {
            s.loop_count = 2;
            s.current_scene = Some("lobby".to_string());
        });
        let seen = reader.snapshot();
        assert_eq!(seen.loop_count, 2);
        assert_eq!(seen.current_scene.as_deref(), Some("lobby"));
    }
}
