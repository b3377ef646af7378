pub mod action;
pub mod project;
pub mod scene;

pub use action::{Action, ActionKind, ActionType};
pub use project::{load_projects, Project};
pub use scene::{Scene, SceneAnchor};
