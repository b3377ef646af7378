use std::sync::Arc;
use std::time::Duration;

use crate::automation::detection::SceneClassifier;
use crate::automation::injector::BackgroundInjector;
use crate::config::Config;
use crate::core::control::RunControl;
use crate::core::error::{ActionError, Stopped};
use crate::core::platform::{WindowHandle, WindowSystem};
use crate::models::project::Project;
use crate::models::scene::Scene;

use super::events::EventEmitter;
use super::state::{ExecutionStatus, SharedState};

pub const MSG_COMPLETED: &str = "completed";
pub const MSG_WINDOW_CLOSED: &str = "window closed";
pub const MSG_NO_SCENE: &str = "no applicable scene";
pub const MSG_STOPPED: &str = "stopped by user";

/// How a run ended. Mirrors the `Finished` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    pub message: String,
}

impl RunOutcome {
    fn success(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
        }
    }
}

/// Drives one run of one project against one window: recognize, replay the
/// scene's actions, repeat while looping. Consumed by [`ProjectEngine::run`];
/// a new run needs a new engine.
pub struct ProjectEngine {
    project: Arc<Project>,
    handle: WindowHandle,
    system: Arc<dyn WindowSystem>,
    injector: BackgroundInjector,
    classifier: SceneClassifier,
    control: RunControl,
    state: SharedState,
    events: EventEmitter,
}

impl ProjectEngine {
    pub fn new(
        project: Arc<Project>,
        handle: WindowHandle,
        system: Arc<dyn WindowSystem>,
        config: &Config,
        control: RunControl,
        events: EventEmitter,
    ) -> Self {
        let injector = BackgroundInjector::new(system.clone(), config.input);
        let classifier =
            SceneClassifier::new(system.clone(), config.recognition).with_base_dir(project.base_dir.clone());
        Self {
            project,
            handle,
            system,
            injector,
            classifier,
            control,
            state: SharedState::new(),
            events,
        }
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    /// Handle to this run's progress, readable from other threads.
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Run to completion on the calling thread. Emits exactly one
    /// `Finished` event (unless the supervisor already emitted it).
    pub fn run(self) -> RunOutcome {
        log::info!(
            "[{}] running '{}' against window {}",
            self.project.id,
            self.project.display_name(),
            self.handle
        );
        // A pause requested before the thread got here wins
        if self
            .state
            .transition_from(&[ExecutionStatus::Idle], ExecutionStatus::Running)
        {
            self.events.status(ExecutionStatus::Running);
        }

        let outcome = self.run_loop();

        let status = if outcome.success {
            ExecutionStatus::Finished
        } else {
            ExecutionStatus::Stopped
        };
        self.set_status(status);
        self.events.finish(outcome.success, outcome.message.clone());
        outcome
    }

    fn set_status(&self, status: ExecutionStatus) {
        if self.state.transition(status) {
            self.events.status(status);
        }
    }

    fn run_loop(&self) -> RunOutcome {
        let mut loop_count: u32 = 0;
        loop {
            if self.control.checkpoint().is_err() {
                return RunOutcome::failure(MSG_STOPPED);
            }
            loop_count += 1;
            self.state.update(|s| s.loop_count = loop_count);
            self.events.log(format!("loop {} started", loop_count));

            if !self.system.is_valid(self.handle) {
                return RunOutcome::failure(MSG_WINDOW_CLOSED);
            }

            let scene = match self.current_scene() {
                Some(scene) => scene,
                None => return RunOutcome::failure(MSG_NO_SCENE),
            };
            self.state.update(|s| s.current_scene = Some(scene.name.clone()));
            self.events.scene_changed(&scene.name);
            self.events.log(format!("current scene: {}", scene.name));

            if self.execute_scene(scene).is_err() {
                return RunOutcome::failure(MSG_STOPPED);
            }

            if !self.project.loop_execution {
                return RunOutcome::success(MSG_COMPLETED);
            }
            let max = self.project.max_loop_count;
            if max > 0 && loop_count >= max {
                self.events.log(format!("max loop count reached: {}", max));
                return RunOutcome::success(MSG_COMPLETED);
            }

            if self
                .control
                .sleep(Duration::from_millis(self.project.recognize_interval))
                .is_err()
            {
                return RunOutcome::failure(MSG_STOPPED);
            }
        }
    }

    fn current_scene(&self) -> Option<&Scene> {
        if self.project.auto_recognize_scene {
            self.classifier.recognize(self.handle, &self.project.scenes)
        } else {
            self.project.default_scene()
        }
    }

    /// Replay enabled actions in order. Only a stop aborts the pass; any
    /// other action failure is logged and skipped.
    fn execute_scene(&self, scene: &Scene) -> Result<(), Stopped> {
        let actions = scene.enabled_actions();
        let total = actions.len();
        self.state.update(|s| {
            s.action_index = 0;
            s.action_total = total;
        });

        for (index, action) in actions.into_iter().enumerate() {
            self.control.checkpoint()?;
            self.state.update(|s| s.action_index = index + 1);
            self.events.progress(index + 1, total);
            self.events.action_executed(&action.label());

            let events = &self.events;
            let result = self
                .injector
                .execute(action, self.handle, &self.control, &mut |line| events.log(line));
            match result {
                Ok(()) => {}
                Err(ActionError::Stopped) => return Err(Stopped),
                Err(e) => self.events.log(format!("action failed: {} ({})", action.label(), e)),
            }
        }
        Ok(())
    }
}
