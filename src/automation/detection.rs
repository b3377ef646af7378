use std::path::PathBuf;
use std::sync::Arc;

use image::{imageops, DynamicImage, GrayImage, RgbImage};

use super::matching::{best_color_match_score, compare_frames};
use crate::config::RecognitionSettings;
use crate::core::coords::denormalize_rect;
use crate::core::platform::{WindowHandle, WindowSystem};
use crate::core::snapshot::WindowSnapshot;
use crate::models::project::resolve_against;
use crate::models::scene::Scene;

/// Which comparison produced a scene's candidate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPath {
    Anchor,
    FullFrame,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneMatch {
    pub score: f32,
    pub path: MatchPath,
}

/// Picks the scene a window is showing.
///
/// Within one scene an anchor hit is authoritative: its full-frame template
/// is never consulted. Across scenes the strictly highest candidate score
/// wins whichever path produced it, and ties keep the earlier scene. Anchors
/// are matched in colour, whole frames in intensity. Holds no mutable state.
pub struct SceneClassifier {
    system: Arc<dyn WindowSystem>,
    base_dir: Option<PathBuf>,
    limits: RecognitionSettings,
}

impl SceneClassifier {
    pub fn new(system: Arc<dyn WindowSystem>, limits: RecognitionSettings) -> Self {
        Self {
            system,
            base_dir: None,
            limits,
        }
    }

    /// Directory relative template paths resolve against.
    pub fn with_base_dir(mut self, base_dir: Option<PathBuf>) -> Self {
        self.base_dir = base_dir;
        self
    }

    /// Capture `handle` once and classify the capture. A failed capture
    /// yields `None` without consulting the default scene.
    pub fn recognize<'s>(&self, handle: WindowHandle, scenes: &'s [Scene]) -> Option<&'s Scene> {
        let snapshot = match self.system.capture(handle) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("recognition capture of {} failed: {}", handle, e);
                return None;
            }
        };
        self.classify(&snapshot, scenes)
    }

    /// Pure classification of one snapshot.
    pub fn classify<'s>(&self, snapshot: &WindowSnapshot, scenes: &'s [Scene]) -> Option<&'s Scene> {
        log::debug!(
            "classifying {}x{} capture taken {:?} ago",
            snapshot.width(),
            snapshot.height(),
            snapshot.captured_at().elapsed()
        );
        let gray = snapshot.to_gray();

        let mut best: Option<(&'s Scene, f32)> = None;
        for scene in scenes.iter().filter(|s| s.enabled) {
            let found = match self.evaluate(snapshot.image(), &gray, scene) {
                Some(found) => found,
                None => continue,
            };
            log::debug!("scene '{}' scored {:.3} via {:?}", scene.name, found.score, found.path);
            if best.map_or(true, |(_, score)| found.score > score) {
                best = Some((scene, found.score));
            }
        }

        if let Some((scene, _)) = best {
            return Some(scene);
        }
        let fallback = scenes.iter().find(|s| s.enabled && s.is_default);
        if let Some(scene) = fallback {
            log::debug!("no scene matched, falling back to default '{}'", scene.name);
        }
        fallback
    }

    /// Candidate score for one scene, or `None` when it does not qualify.
    /// `gray` is the intensity copy of `color`.
    pub fn evaluate(&self, color: &RgbImage, gray: &GrayImage, scene: &Scene) -> Option<SceneMatch> {
        if let Some(score) = self.anchor_score(color, scene) {
            return Some(SceneMatch {
                score,
                path: MatchPath::Anchor,
            });
        }

        let reference = self.load_template(scene.full_frame_path()?)?.to_luma8();
        let max_size = (self.limits.max_compare_width, self.limits.max_compare_height);
        let score = compare_frames(gray, &reference, max_size);
        if score > scene.recognition_threshold {
            Some(SceneMatch {
                score,
                path: MatchPath::FullFrame,
            })
        } else {
            None
        }
    }

    /// Highest anchor score, if at least one anchor reached its own threshold.
    fn anchor_score(&self, frame: &RgbImage, scene: &Scene) -> Option<f32> {
        let (width, height) = frame.dimensions();
        let mut best: Option<f32> = None;
        let mut hit = false;

        for anchor in &scene.anchors {
            let template = match self.load_template(&anchor.image_path) {
                Some(template) => template.to_rgb8(),
                None => continue,
            };
            let roi = match denormalize_rect(anchor.roi(), width, height) {
                Some(roi) => roi,
                None => continue,
            };
            if roi.width < template.width() || roi.height < template.height() {
                log::debug!(
                    "anchor {} skipped: ROI {}x{} smaller than template {}x{}",
                    anchor.image_path,
                    roi.width,
                    roi.height,
                    template.width(),
                    template.height()
                );
                continue;
            }

            let region = imageops::crop_imm(frame, roi.left, roi.top, roi.width, roi.height).to_image();
            let score = match best_color_match_score(&region, &template) {
                Some(score) => score,
                None => continue,
            };
            log::debug!("anchor {} scored {:.3} (threshold {:.2})", anchor.image_path, score, anchor.threshold);

            best = Some(best.map_or(score, |b: f32| b.max(score)));
            if score >= anchor.threshold {
                hit = true;
            }
        }

        if hit {
            best
        } else {
            None
        }
    }

    fn load_template(&self, path: &str) -> Option<DynamicImage> {
        if path.trim().is_empty() {
            return None;
        }
        let resolved = resolve_against(self.base_dir.as_deref(), path);
        match image::open(&resolved) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("template {} unusable: {}", resolved.display(), e);
                None
            }
        }
    }
}
