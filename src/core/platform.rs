use std::fmt;

use super::error::WindowError;
use super::input::RawMessage;
use super::snapshot::WindowSnapshot;

/// Opaque OS window identifier (an `HWND` on Windows). Not owned by us:
/// check [`WindowSystem::is_valid`] before every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A visible top-level window as seen during enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub class_name: String,
    /// Outer rectangle in screen coordinates: left, top, right, bottom.
    pub rect: (i32, i32, i32, i32),
    pub minimized: bool,
}

impl WindowInfo {
    pub fn width(&self) -> i32 {
        self.rect.2 - self.rect.0
    }

    pub fn height(&self) -> i32 {
        self.rect.3 - self.rect.1
    }
}

/// How to pick a target window out of the enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowQuery {
    pub title: String,
    pub class_name: Option<String>,
    pub exact: bool,
}

impl WindowQuery {
    /// Case-insensitive substring match on the title.
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            class_name: None,
            exact: false,
        }
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        self.class_name = if class_name.is_empty() { None } else { Some(class_name) };
        self
    }

    pub fn matches(&self, info: &WindowInfo) -> bool {
        let title_ok = if self.exact {
            info.title == self.title
        } else {
            info.title.to_lowercase().contains(&self.title.to_lowercase())
        };
        let class_ok = match &self.class_name {
            Some(class_name) => info.class_name.eq_ignore_ascii_case(class_name),
            None => true,
        };
        title_ok && class_ok
    }
}

impl fmt::Display for WindowQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.title)?;
        if let Some(class_name) = &self.class_name {
            write!(f, " (class {})", class_name)?;
        }
        Ok(())
    }
}

/// Everything the engine needs from the OS window layer.
///
/// Implementations are stateless or read-only and are shared across project
/// threads; two projects must not target the same window.
pub trait WindowSystem: Send + Sync {
    /// Visible, titled top-level windows in OS enumeration order.
    fn list_windows(&self) -> Vec<WindowInfo>;

    /// Never panics or errors; a stale handle is simply `false`.
    fn is_valid(&self, handle: WindowHandle) -> bool;

    fn client_size(&self, handle: WindowHandle) -> Result<(u32, u32), WindowError>;

    /// Background-safe capture of the client area: works while occluded or
    /// unfocused.
    fn capture(&self, handle: WindowHandle) -> Result<WindowSnapshot, WindowError>;

    /// Deepest descendant under a client-relative point, or `handle` itself
    /// when there is none or the point is outside the client area.
    fn child_at(&self, handle: WindowHandle, x: i32, y: i32) -> WindowHandle;

    /// Queue a message on the window without waiting for it to be processed.
    fn post_message(&self, handle: WindowHandle, message: RawMessage) -> Result<(), WindowError>;

    /// Hardware scan code for a virtual key, placed in key message lparams.
    fn scan_code(&self, vk: u16) -> u32;

    /// First enumerated window matching the query. Enumeration order is
    /// OS-defined.
    fn find_window(&self, query: &WindowQuery) -> Result<WindowHandle, WindowError> {
        self.list_windows()
            .into_iter()
            .find(|info| query.matches(info))
            .map(|info| info.handle)
            .ok_or_else(|| WindowError::NotFound(query.to_string()))
    }
}
