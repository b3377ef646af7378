use windows::{
    Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT, TRUE},
    Win32::Graphics::Gdi::{ClientToScreen, ScreenToClient},
    Win32::UI::WindowsAndMessaging::{
        ChildWindowFromPointEx, EnumWindows, GetClassNameW, GetClientRect, GetWindowRect,
        GetWindowTextW, IsIconic, IsWindow, IsWindowVisible, CWP_SKIPINVISIBLE,
        CWP_SKIPTRANSPARENT,
    },
};

use super::platform::{WindowHandle, WindowInfo};

// Nested child windows are rarely deeper than this
const MAX_CHILD_DEPTH: usize = 16;

unsafe extern "system" fn collect_hwnd(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = &mut *(lparam.0 as *mut Vec<HWND>);
    handles.push(hwnd);
    TRUE
}

/// Enumerate visible top-level windows that have a title.
pub fn list_windows() -> Vec<WindowInfo> {
    let mut handles: Vec<HWND> = Vec::new();
    unsafe {
        let _ = EnumWindows(
            Some(collect_hwnd),
            LPARAM(&mut handles as *mut Vec<HWND> as isize),
        );
    }

    handles
        .into_iter()
        .filter(|hwnd| unsafe { IsWindowVisible(*hwnd).as_bool() })
        .filter_map(|hwnd| {
            let title = get_window_title(hwnd);
            if title.is_empty() {
                return None;
            }
            Some(WindowInfo {
                handle: WindowHandle(hwnd.0),
                title,
                class_name: get_class_name(hwnd),
                rect: get_window_rect(hwnd).unwrap_or_default(),
                minimized: unsafe { IsIconic(hwnd).as_bool() },
            })
        })
        .collect()
}

pub fn get_window_title(hwnd: HWND) -> String {
    let mut buf = [0u16; 512];
    let len = unsafe { GetWindowTextW(hwnd, &mut buf) };
    if len <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..len as usize])
}

pub fn get_class_name(hwnd: HWND) -> String {
    let mut buf = [0u16; 256];
    let len = unsafe { GetClassNameW(hwnd, &mut buf) };
    if len <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..len as usize])
}

/// Check if window handle is valid
pub fn is_window_valid(hwnd: HWND) -> bool {
    unsafe { IsWindow(hwnd).as_bool() }
}

/// Get window rectangle
pub fn get_window_rect(hwnd: HWND) -> Option<(i32, i32, i32, i32)> {
    unsafe {
        let mut rect = RECT::default();
        if GetWindowRect(hwnd, &mut rect).is_ok() {
            Some((rect.left, rect.top, rect.right, rect.bottom))
        } else {
            None
        }
    }
}

/// Client area size in pixels
pub fn get_client_size(hwnd: HWND) -> Option<(i32, i32)> {
    unsafe {
        let mut rect = RECT::default();
        if GetClientRect(hwnd, &mut rect).is_ok() {
            Some((rect.right - rect.left, rect.bottom - rect.top))
        } else {
            None
        }
    }
}

/// Walk down the child hierarchy under a client-relative point without
/// relying on what is currently visible on screen.
pub fn child_window_at(hwnd: HWND, x: i32, y: i32) -> HWND {
    let Some((width, height)) = get_client_size(hwnd) else {
        return hwnd;
    };
    if x < 0 || y < 0 || x >= width || y >= height {
        return hwnd;
    }

    let mut current = hwnd;
    let mut point = POINT { x, y };
    for _ in 0..MAX_CHILD_DEPTH {
        let child = unsafe {
            ChildWindowFromPointEx(current, point, CWP_SKIPINVISIBLE | CWP_SKIPTRANSPARENT)
        };
        if child.0 == 0 || child.0 == current.0 {
            break;
        }
        // Re-express the point in the child's client coordinates
        let mut screen = point;
        unsafe {
            if !ClientToScreen(current, &mut screen).as_bool() {
                break;
            }
            if !ScreenToClient(child, &mut screen).as_bool() {
                break;
            }
        }
        point = screen;
        current = child;
    }
    current
}
