pub mod engine;
pub mod events;
pub mod state;
pub mod supervisor;

pub use engine::{ProjectEngine, RunOutcome};
pub use events::{EventBus, EventEmitter, ExecutionEvent};
pub use state::{ExecutionState, ExecutionStatus, SharedState};
pub use supervisor::Supervisor;
