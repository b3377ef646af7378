use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, MapVirtualKeyW, MAPVK_VK_TO_VSC};
use windows::Win32::UI::WindowsAndMessaging::PostMessageW;

use super::error::WindowError;
use super::input::RawMessage;
use super::platform::{WindowHandle, WindowInfo, WindowSystem};
use super::screen_capture::capture_client;
use super::snapshot::WindowSnapshot;
use super::window;

/// `WindowSystem` backed by user32/gdi32. Posts messages only; never uses
/// SendInput, so the real cursor and keyboard focus are untouched.
#[derive(Debug, Default)]
pub struct Win32WindowSystem;

impl Win32WindowSystem {
    pub fn new() -> Self {
        Self
    }
}

fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0)
}

impl WindowSystem for Win32WindowSystem {
    fn list_windows(&self) -> Vec<WindowInfo> {
        window::list_windows()
    }

    fn is_valid(&self, handle: WindowHandle) -> bool {
        handle.0 != 0 && window::is_window_valid(hwnd(handle))
    }

    fn client_size(&self, handle: WindowHandle) -> Result<(u32, u32), WindowError> {
        if !self.is_valid(handle) {
            return Err(WindowError::InvalidWindow);
        }
        let (width, height) =
            window::get_client_size(hwnd(handle)).ok_or(WindowError::InvalidWindow)?;
        Ok((width.max(0) as u32, height.max(0) as u32))
    }

    fn capture(&self, handle: WindowHandle) -> Result<WindowSnapshot, WindowError> {
        if !self.is_valid(handle) {
            return Err(WindowError::InvalidWindow);
        }
        let image = capture_client(hwnd(handle)).map_err(WindowError::CaptureFailed)?;
        WindowSnapshot::new(image)
    }

    fn child_at(&self, handle: WindowHandle, x: i32, y: i32) -> WindowHandle {
        if !self.is_valid(handle) {
            return handle;
        }
        WindowHandle(window::child_window_at(hwnd(handle), x, y).0)
    }

    fn post_message(&self, handle: WindowHandle, message: RawMessage) -> Result<(), WindowError> {
        if !self.is_valid(handle) {
            return Err(WindowError::InvalidWindow);
        }
        unsafe {
            PostMessageW(
                hwnd(handle),
                message.msg,
                WPARAM(message.wparam),
                LPARAM(message.lparam),
            )
        }
        .map_err(|e| WindowError::PostFailed(e.to_string()))
    }

    fn scan_code(&self, vk: u16) -> u32 {
        unsafe { MapVirtualKeyW(vk as u32, MAPVK_VK_TO_VSC) }
    }
}

/// Check if ESC key is currently down (works even when app doesn't have focus)
pub fn is_escape_key_down() -> bool {
    unsafe {
        let key_state = GetAsyncKeyState(0x1B); // VK_ESCAPE
        (key_state as u16) & 0x8000 != 0
    }
}
