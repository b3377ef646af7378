use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::Receiver;
use uuid::Uuid;

use super::engine::ProjectEngine;
use super::events::{EventBus, EventEmitter, ExecutionEvent};
use super::state::{ExecutionState, ExecutionStatus, SharedState};
use crate::config::Config;
use crate::core::control::RunControl;
use crate::core::error::StartError;
use crate::core::platform::WindowSystem;
use crate::models::project::Project;

pub const MSG_FORCE_STOPPED: &str = "force stopped";

/// Live run as seen from the supervisor.
struct EngineHandle {
    /// Distinguishes this run from a later run of the same project.
    run_id: Uuid,
    control: RunControl,
    state: SharedState,
    events: EventEmitter,
    thread: JoinHandle<()>,
}

type Registry = Arc<Mutex<HashMap<String, EngineHandle>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<String, EngineHandle>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns every running project: at most one run per project id, each on its
/// own thread, with all their events fanned out to subscribers.
pub struct Supervisor {
    system: Arc<dyn WindowSystem>,
    config: Config,
    bus: EventBus,
    engines: Registry,
}

impl Supervisor {
    pub fn new(system: Arc<dyn WindowSystem>, config: Config) -> Self {
        Self {
            system,
            config,
            bus: EventBus::new(),
            engines: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Receive events from every run started after (and during) this call.
    pub fn subscribe(&self) -> Receiver<ExecutionEvent> {
        self.bus.subscribe()
    }

    /// Resolve the project's window now and start a run on a new thread.
    pub fn start(&self, project: Arc<Project>) -> Result<(), StartError> {
        let mut engines = lock(&self.engines);
        if engines.contains_key(&project.id) {
            return Err(StartError::AlreadyRunning(project.id.clone()));
        }

        let query = project.window_query();
        let handle = self.system.find_window(&query).map_err(|e| {
            log::warn!("[{}] cannot start: {}", project.id, e);
            StartError::WindowNotFound(project.target_window_title.clone())
        })?;

        let control = RunControl::new(self.config.execution.poll_interval());
        let events = EventEmitter::new(project.id.clone(), self.bus.clone());
        let engine = ProjectEngine::new(
            project.clone(),
            handle,
            self.system.clone(),
            &self.config,
            control.clone(),
            events.clone(),
        );
        let state = engine.state();
        let run_id = Uuid::new_v4();

        let registry = Arc::clone(&self.engines);
        let project_id = project.id.clone();
        let thread = thread::Builder::new()
            .name(format!("run-{}", project.display_name()))
            .spawn(move || {
                let outcome = engine.run();
                log::debug!("[{}] run {} ended: {:?}", project_id, run_id, outcome);
                // Blocks until `start` has registered this run
                let mut engines = lock(&registry);
                if engines.get(&project_id).map_or(false, |h| h.run_id == run_id) {
                    engines.remove(&project_id);
                }
            })
            .map_err(|e| StartError::Spawn(e.to_string()))?;

        log::info!("[{}] started against window {}", project.id, handle);
        engines.insert(
            project.id.clone(),
            EngineHandle {
                run_id,
                control,
                state,
                events,
                thread,
            },
        );
        Ok(())
    }

    /// Ask the run to stop and wait for it up to the grace period; a run still
    /// alive after that is abandoned. No-op for unknown ids.
    pub fn stop(&self, project_id: &str) {
        self.stop_runs(vec![project_id.to_string()]);
    }

    /// Stop every tracked run, sharing one grace period.
    pub fn stop_all(&self) {
        let ids = self.running_projects();
        if !ids.is_empty() {
            log::info!("stopping {} running project(s)", ids.len());
        }
        self.stop_runs(ids);
    }

    pub fn pause(&self, project_id: &str) {
        let engines = lock(&self.engines);
        if let Some(handle) = engines.get(project_id) {
            let from = [ExecutionStatus::Idle, ExecutionStatus::Running];
            if handle.state.transition_from(&from, ExecutionStatus::Paused) {
                handle.control.pause();
                handle.events.status(ExecutionStatus::Paused);
                handle.events.log("paused");
            }
        }
    }

    pub fn resume(&self, project_id: &str) {
        let engines = lock(&self.engines);
        if let Some(handle) = engines.get(project_id) {
            if handle
                .state
                .transition_from(&[ExecutionStatus::Paused], ExecutionStatus::Running)
            {
                handle.control.resume();
                handle.events.status(ExecutionStatus::Running);
                handle.events.log("resumed");
            }
        }
    }

    pub fn is_running(&self, project_id: &str) -> bool {
        lock(&self.engines).contains_key(project_id)
    }

    pub fn is_paused(&self, project_id: &str) -> bool {
        lock(&self.engines)
            .get(project_id)
            .map_or(false, |h| h.control.is_paused())
    }

    /// Ids of live runs, sorted.
    pub fn running_projects(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.engines).keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn state(&self, project_id: &str) -> Option<ExecutionState> {
        lock(&self.engines).get(project_id).map(|h| h.state.snapshot())
    }

    fn stop_runs(&self, ids: Vec<String>) {
        let targets: Vec<(String, Uuid)> = {
            let engines = lock(&self.engines);
            ids.into_iter()
                .filter_map(|id| {
                    let handle = engines.get(&id)?;
                    handle.control.stop();
                    let from = [ExecutionStatus::Idle, ExecutionStatus::Running, ExecutionStatus::Paused];
                    if handle.state.transition_from(&from, ExecutionStatus::Stopping) {
                        handle.events.status(ExecutionStatus::Stopping);
                    }
                    Some((id, handle.run_id))
                })
                .collect()
        };
        if targets.is_empty() {
            return;
        }

        let is_live = |engines: &HashMap<String, EngineHandle>, (id, run_id): &(String, Uuid)| {
            engines.get(id).map_or(false, |h| h.run_id == *run_id)
        };

        let deadline = Instant::now() + self.config.execution.stop_grace();
        loop {
            let pending = {
                let engines = lock(&self.engines);
                targets.iter().filter(|t| is_live(&engines, t)).count()
            };
            if pending == 0 {
                return;
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(self.config.execution.poll_interval());
        }

        let abandoned: Vec<(String, EngineHandle)> = {
            let mut engines = lock(&self.engines);
            targets
                .iter()
                .filter(|t| is_live(&engines, t))
                .map(|t| t.0.clone())
                .collect::<Vec<String>>()
                .into_iter()
                .filter_map(|id| engines.remove(&id).map(|h| (id, h)))
                .collect()
        };
        for (id, handle) in abandoned {
            // The thread keeps running until its next checkpoint; its events
            // are muted from here on.
            log::warn!(
                "[{}] did not stop within {:?}, abandoning run {}",
                id,
                self.config.execution.stop_grace(),
                handle.run_id
            );
            if handle.state.transition(ExecutionStatus::Stopped) {
                handle.events.status(ExecutionStatus::Stopped);
            }
            handle.events.finish(false, MSG_FORCE_STOPPED);
            drop(handle.thread);
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop_all();
    }
}
