pub mod control;
pub mod coords;
pub mod error;
pub mod input;
pub mod platform;
pub mod snapshot;
pub mod stub;

#[cfg(windows)]
pub mod screen_capture;
#[cfg(windows)]
pub mod win32;
#[cfg(windows)]
pub mod window;

#[cfg(test)]
pub mod fake;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use self::platform::{WindowHandle, WindowSystem};

/// Create the window system appropriate for the current OS.
pub fn create_window_system() -> Arc<dyn WindowSystem> {
    #[cfg(windows)]
    {
        Arc::new(win32::Win32WindowSystem::new())
    }
    #[cfg(not(windows))]
    {
        log::warn!("background window automation is only available on Windows");
        Arc::new(stub::StubWindowSystem)
    }
}

/// Emergency-stop key state; always `false` where it cannot be polled.
pub fn escape_pressed() -> bool {
    #[cfg(windows)]
    {
        win32::is_escape_key_down()
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Save a live capture as an image file, for authoring anchors and scene
/// templates.
pub fn capture_to_file(system: &dyn WindowSystem, handle: WindowHandle, path: &Path) -> anyhow::Result<()> {
    let snapshot = system
        .capture(handle)
        .with_context(|| format!("capturing window {}", handle))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    snapshot
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!(
        "saved {}x{} capture of {} to {}",
        snapshot.width(),
        snapshot.height(),
        handle,
        path.display()
    );
    Ok(())
}
