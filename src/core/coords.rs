use serde::{Deserialize, Serialize};

/// Point in client-relative units, `(0, 0)` top-left and `(1, 1)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelPoint {
    pub x: f32,
    pub y: f32,
}

impl RelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rectangle in client-relative units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RelRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

/// Pixel rectangle inside an image: left, top, width, height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

fn clamp01(value: f32) -> f32 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else if value > 1.0 {
        1.0
    } else {
        value
    }
}

/// Convert a relative point to client pixels: `round(x * W), round(y * H)`.
/// Callers pass the client size queried right before posting.
pub fn denormalize_point(point: RelPoint, client: (u32, u32)) -> (i32, i32) {
    let (width, height) = client;
    let px = (clamp01(point.x) as f64 * width as f64).round() as i32;
    let py = (clamp01(point.y) as f64 * height as f64).round() as i32;
    (px, py)
}

/// Scale a relative region of interest onto an image of `width` x `height`.
/// The result always lies inside the image and is at least one pixel wide.
pub fn denormalize_rect(rect: RelRect, width: u32, height: u32) -> Option<PixelRect> {
    if width == 0 || height == 0 {
        return None;
    }
    let w = width as f64;
    let h = height as f64;

    let x1 = (w * rect.x as f64).floor() as i64;
    let y1 = (h * rect.y as f64).floor() as i64;
    let x2 = (w * (rect.x as f64 + rect.w as f64)).floor() as i64;
    let y2 = (h * (rect.y as f64 + rect.h as f64)).floor() as i64;

    // Boundary protection
    let x1 = x1.clamp(0, width as i64 - 1);
    let y1 = y1.clamp(0, height as i64 - 1);
    let x2 = x2.min(width as i64).max(x1 + 1);
    let y2 = y2.min(height as i64).max(y1 + 1);

    Some(PixelRect {
        left: x1 as u32,
        top: y1 as u32,
        width: (x2 - x1) as u32,
        height: (y2 - y1) as u32,
    })
}

/// Linear interpolation between two pixel points, truncating toward zero.
pub fn lerp_point(from: (i32, i32), to: (i32, i32), step: u32, steps: u32) -> (i32, i32) {
    if steps == 0 {
        return to;
    }
    let step = step.min(steps) as i64;
    let steps = steps as i64;
    let x = from.0 as i64 + (to.0 as i64 - from.0 as i64) * step / steps;
    let y = from.1 as i64 + (to.1 as i64 - from.1 as i64) * step / steps;
    (x as i32, y as i32)
}
