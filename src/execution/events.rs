use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::state::ExecutionStatus;

/// Notification from a run, tagged with its project id.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    SceneChanged { project_id: String, scene: String },
    ActionExecuted { project_id: String, action: String },
    Progress { project_id: String, current: usize, total: usize },
    StatusChanged { project_id: String, status: ExecutionStatus },
    Log { project_id: String, message: String },
    Finished { project_id: String, success: bool, message: String },
}

impl ExecutionEvent {
    pub fn project_id(&self) -> &str {
        match self {
            ExecutionEvent::SceneChanged { project_id, .. }
            | ExecutionEvent::ActionExecuted { project_id, .. }
            | ExecutionEvent::Progress { project_id, .. }
            | ExecutionEvent::StatusChanged { project_id, .. }
            | ExecutionEvent::Log { project_id, .. }
            | ExecutionEvent::Finished { project_id, .. } => project_id,
        }
    }
}

impl fmt::Display for ExecutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionEvent::SceneChanged { project_id, scene } => write!(f, "[{}] scene: {}", project_id, scene),
            ExecutionEvent::ActionExecuted { project_id, action } => write!(f, "[{}] action: {}", project_id, action),
            ExecutionEvent::Progress { project_id, current, total } => {
                write!(f, "[{}] progress {}/{}", project_id, current, total)
            }
            ExecutionEvent::StatusChanged { project_id, status } => write!(f, "[{}] status: {}", project_id, status),
            ExecutionEvent::Log { project_id, message } => write!(f, "[{}] {}", project_id, message),
            ExecutionEvent::Finished { project_id, success, message } => {
                let outcome = if *success { "finished" } else { "failed" };
                write!(f, "[{}] {}: {}", project_id, outcome, message)
            }
        }
    }
}

/// Fan-out of events to any number of subscribers. Publishing never blocks;
/// subscribers whose receiver was dropped are pruned.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<ExecutionEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sender<ExecutionEvent>>> {
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self) -> Receiver<ExecutionEvent> {
        let (tx, rx) = unbounded();
        self.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: ExecutionEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Per-run publisher. Once `finish` has been called, later events from the
/// same run are dropped, so observers see exactly one `Finished` per run and
/// nothing after it.
#[derive(Clone)]
pub struct EventEmitter {
    project_id: String,
    bus: EventBus,
    finished: Arc<Mutex<bool>>,
}

impl EventEmitter {
    pub fn new(project_id: impl Into<String>, bus: EventBus) -> Self {
        Self {
            project_id: project_id.into(),
            bus,
            finished: Arc::new(Mutex::new(false)),
        }
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: ExecutionEvent) {
        // Held across publish so a concurrent `finish` cannot slip in between
        let finished = self.finished.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *finished {
            log::trace!("dropping event after finish: {}", event);
            return;
        }
        self.bus.publish(event);
    }

    pub fn scene_changed(&self, scene: &str) {
        self.emit(ExecutionEvent::SceneChanged {
            project_id: self.project_id.clone(),
            scene: scene.to_string(),
        });
    }

    pub fn action_executed(&self, action: &str) {
        self.emit(ExecutionEvent::ActionExecuted {
            project_id: self.project_id.clone(),
            action: action.to_string(),
        });
    }

    pub fn progress(&self, current: usize, total: usize) {
        self.emit(ExecutionEvent::Progress {
            project_id: self.project_id.clone(),
            current,
            total,
        });
    }

    pub fn status(&self, status: ExecutionStatus) {
        self.emit(ExecutionEvent::StatusChanged {
            project_id: self.project_id.clone(),
            status,
        });
    }

    /// Log line for observers, mirrored to the `log` facade.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("[{}] {}", self.project_id, message);
        self.emit(ExecutionEvent::Log {
            project_id: self.project_id.clone(),
            message,
        });
    }

    /// Emit the run's single `Finished` event. Returns `false` if it was
    /// already emitted.
    pub fn finish(&self, success: bool, message: impl Into<String>) -> bool {
        let mut finished = self.finished.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *finished {
            return false;
        }
        *finished = true;
        let message = message.into();
        if success {
            log::info!("[{}] finished: {}", self.project_id, message);
        } else {
            log::warn!("[{}] failed: {}", self.project_id, message);
        }
        self.bus.publish(ExecutionEvent::Finished {
            project_id: self.project_id.clone(),
            success,
            message,
        });
        true
    }
}
