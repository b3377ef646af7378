use super::error::WindowError;
use super::input::RawMessage;
use super::platform::{WindowHandle, WindowInfo, WindowSystem};
use super::snapshot::WindowSnapshot;

/// Window system for platforms without background message posting.
/// Enumerates nothing, so every start fails with a clean "window not found".
#[derive(Debug, Default)]
pub struct StubWindowSystem;

impl WindowSystem for StubWindowSystem {
    fn list_windows(&self) -> Vec<WindowInfo> {
        log::debug!("stub: list_windows()");
        Vec::new()
    }

    fn is_valid(&self, _handle: WindowHandle) -> bool {
        false
    }

    fn client_size(&self, _handle: WindowHandle) -> Result<(u32, u32), WindowError> {
        Err(WindowError::InvalidWindow)
    }

    fn capture(&self, _handle: WindowHandle) -> Result<WindowSnapshot, WindowError> {
        Err(WindowError::InvalidWindow)
    }

    fn child_at(&self, handle: WindowHandle, _x: i32, _y: i32) -> WindowHandle {
        handle
    }

    fn post_message(&self, _handle: WindowHandle, message: RawMessage) -> Result<(), WindowError> {
        log::debug!("stub: post_message({:?})", message);
        Err(WindowError::InvalidWindow)
    }

    fn scan_code(&self, _vk: u16) -> u32 {
        0
    }
}
