//! Scripted in-memory window system for tests.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use image::RgbImage;

use super::error::WindowError;
use super::input::RawMessage;
use super::platform::{WindowHandle, WindowInfo, WindowSystem};
use super::snapshot::WindowSnapshot;

struct FakeWindow {
    info: WindowInfo,
    client: (u32, u32),
    valid: bool,
    frame: Option<RgbImage>,
}

#[derive(Default)]
struct FakeState {
    windows: Vec<FakeWindow>,
    posted: Vec<(Instant, WindowHandle, RawMessage)>,
    fail_posts: bool,
    captures: usize,
}

#[derive(Default)]
pub struct FakeWindowSystem {
    state: Mutex<FakeState>,
}

impl FakeWindowSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_window(&self, title: &str, client: (u32, u32)) -> WindowHandle {
        self.add_window_with_class(title, "FakeWindow", client)
    }

    pub fn add_window_with_class(&self, title: &str, class_name: &str, client: (u32, u32)) -> WindowHandle {
        let mut state = self.lock();
        let handle = WindowHandle(0x1000 + state.windows.len() as isize);
        state.windows.push(FakeWindow {
            info: WindowInfo {
                handle,
                title: title.to_string(),
                class_name: class_name.to_string(),
                rect: (0, 0, client.0 as i32, client.1 as i32),
                minimized: false,
            },
            client,
            valid: true,
            frame: None,
        });
        handle
    }

    pub fn set_client_size(&self, handle: WindowHandle, client: (u32, u32)) {
        if let Some(w) = self.lock().windows.iter_mut().find(|w| w.info.handle == handle) {
            w.client = client;
        }
    }

    pub fn set_frame(&self, handle: WindowHandle, frame: RgbImage) {
        if let Some(w) = self.lock().windows.iter_mut().find(|w| w.info.handle == handle) {
            w.frame = Some(frame);
        }
    }

    pub fn close(&self, handle: WindowHandle) {
        if let Some(w) = self.lock().windows.iter_mut().find(|w| w.info.handle == handle) {
            w.valid = false;
        }
    }

    pub fn fail_posts(&self, fail: bool) {
        self.lock().fail_posts = fail;
    }

    pub fn posted(&self) -> Vec<RawMessage> {
        self.lock().posted.iter().map(|(_, _, m)| *m).collect()
    }

    pub fn posted_timed(&self) -> Vec<(Instant, RawMessage)> {
        self.lock().posted.iter().map(|(t, _, m)| (*t, *m)).collect()
    }

    pub fn clear_posted(&self) {
        self.lock().posted.clear();
    }

    pub fn capture_count(&self) -> usize {
        self.lock().captures
    }
}

impl WindowSystem for FakeWindowSystem {
    fn list_windows(&self) -> Vec<WindowInfo> {
        self.lock()
            .windows
            .iter()
            .filter(|w| w.valid)
            .map(|w| w.info.clone())
            .collect()
    }

    fn is_valid(&self, handle: WindowHandle) -> bool {
        self.lock().windows.iter().any(|w| w.info.handle == handle && w.valid)
    }

    fn client_size(&self, handle: WindowHandle) -> Result<(u32, u32), WindowError> {
        self.lock()
            .windows
            .iter()
            .find(|w| w.info.handle == handle && w.valid)
            .map(|w| w.client)
            .ok_or(WindowError::InvalidWindow)
    }

    fn capture(&self, handle: WindowHandle) -> Result<WindowSnapshot, WindowError> {
        let mut state = self.lock();
        state.captures += 1;
        let window = state
            .windows
            .iter()
            .find(|w| w.info.handle == handle && w.valid)
            .ok_or(WindowError::InvalidWindow)?;
        let frame = window
            .frame
            .clone()
            .ok_or_else(|| WindowError::CaptureFailed("no frame".to_string()))?;
        WindowSnapshot::new(frame)
    }

    fn child_at(&self, handle: WindowHandle, _x: i32, _y: i32) -> WindowHandle {
        handle
    }

    fn post_message(&self, handle: WindowHandle, message: RawMessage) -> Result<(), WindowError> {
        let mut state = self.lock();
        if !state.windows.iter().any(|w| w.info.handle == handle && w.valid) {
            return Err(WindowError::InvalidWindow);
        }
        if state.fail_posts {
            return Err(WindowError::PostFailed("queue full".to_string()));
        }
        state.posted.push((Instant::now(), handle, message));
        Ok(())
    }

    fn scan_code(&self, vk: u16) -> u32 {
        // Deterministic stand-in for MapVirtualKey
        vk as u32 + 0x100
    }
}
