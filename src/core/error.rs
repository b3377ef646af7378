use thiserror::Error;

/// Failures raised by the window layer. Every operation on a stale handle
/// reports `InvalidWindow` immediately instead of touching the OS.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("window not found: {0}")]
    NotFound(String),

    #[error("window handle is no longer valid")]
    InvalidWindow,

    #[error("window client area is empty")]
    ZeroClientArea,

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("message post failed: {0}")]
    PostFailed(String),
}

/// Failure of a single scripted action. Never fatal to a run on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error("cannot parse key '{0}'")]
    BadKey(String),

    #[error("stopped")]
    Stopped,
}

/// Marker returned by cancellation checkpoints once a stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stopped;

impl From<Stopped> for ActionError {
    fn from(_: Stopped) -> Self {
        ActionError::Stopped
    }
}

/// Why the supervisor refused to start a project.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("project {0} is already running")]
    AlreadyRunning(String),

    #[error("target window not found: {0}")]
    WindowNotFound(String),

    /// The OS refused to create the run thread.
    #[error("failed to spawn execution thread: {0}")]
    Spawn(String),
}
