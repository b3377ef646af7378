use std::path::Path;
use std::time::Instant;

use image::{GrayImage, RgbImage};

use super::error::WindowError;

/// Immutable RGB capture of a window's client area. Never zero-sized.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    image: RgbImage,
    captured_at: Instant,
}

impl WindowSnapshot {
    pub fn new(image: RgbImage) -> Result<Self, WindowError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(WindowError::CaptureFailed("empty image".to_string()));
        }
        Ok(Self {
            image,
            captured_at: Instant::now(),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Single-channel intensity copy used by template matching.
    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }

    pub fn save(&self, path: &Path) -> image::ImageResult<()> {
        self.image.save(path)
    }
}
