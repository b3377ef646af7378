use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::Action;
use crate::core::coords::RelRect;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_anchor_threshold() -> f32 {
    0.85
}

fn default_scene_threshold() -> f32 {
    0.8
}

fn default_one() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_scene_name() -> String {
    "Default scene".to_string()
}

/// A small template expected somewhere inside a region of the client area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAnchor {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_path: String,
    #[serde(default = "default_anchor_threshold")]
    pub threshold: f32,
    // Region of interest, relative to the client area
    #[serde(default)]
    pub roi_x: f32,
    #[serde(default)]
    pub roi_y: f32,
    #[serde(default = "default_one")]
    pub roi_w: f32,
    #[serde(default = "default_one")]
    pub roi_h: f32,
}

impl SceneAnchor {
    pub fn new(image_path: impl Into<String>, threshold: f32, roi: RelRect) -> Self {
        Self {
            id: new_id(),
            name: String::new(),
            image_path: image_path.into(),
            threshold,
            roi_x: roi.x,
            roi_y: roi.y,
            roi_w: roi.w,
            roi_h: roi.h,
        }
    }

    pub fn roi(&self) -> RelRect {
        RelRect::new(self.roi_x, self.roi_y, self.roi_w, self.roi_h)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default = "default_scene_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Full-frame reference image.
    #[serde(default)]
    pub recognition_image_path: Option<String>,
    #[serde(default = "default_scene_threshold")]
    pub recognition_threshold: f32,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub anchors: Vec<SceneAnchor>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            recognition_image_path: None,
            recognition_threshold: default_scene_threshold(),
            actions: Vec::new(),
            is_default: false,
            enabled: true,
            anchors: Vec::new(),
        }
    }

    pub fn default_scene() -> Self {
        Self {
            is_default: true,
            ..Self::new(default_scene_name())
        }
    }

    /// Append an action at the end of the running order.
    pub fn push_action(&mut self, mut action: Action) -> &Action {
        action.order = self.actions.len() as i32;
        self.actions.push(action);
        &self.actions[self.actions.len() - 1]
    }

    /// Enabled actions in ascending `order`; equal orders keep list order.
    pub fn enabled_actions(&self) -> Vec<&Action> {
        let mut actions: Vec<&Action> = self.actions.iter().filter(|a| a.enabled).collect();
        actions.sort_by_key(|a| a.order);
        actions
    }

    /// Full-frame template path, if one is set.
    pub fn full_frame_path(&self) -> Option<&str> {
        self.recognition_image_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::action::ActionKind;

    #[test]
    fn enabled_actions_follow_order_field() {
        let mut scene = Scene::new("main");
        scene.actions = vec![
            Action::new("third", ActionKind::Wait { duration_ms: 1 }).with_order(2),
            Action::new("first", ActionKind::Wait { duration_ms: 1 }).with_order(0),
            Action::new("skipped", ActionKind::Wait { duration_ms: 1 }).with_order(1).disabled(),
            Action::new("second", ActionKind::Wait { duration_ms: 1 }).with_order(1),
        ];

        let names: Vec<&str> = scene.enabled_actions().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn anchor_defaults_cover_whole_client() {
        let anchor: SceneAnchor = serde_json::from_str(r#"{"image_path": "btn.png"}"#).unwrap();
        assert_eq!(anchor.roi(), RelRect::full());
        assert_eq!(anchor.threshold, 0.85);
    }

    #[test]
    fn blank_full_frame_path_is_ignored() {
        let mut scene: Scene = serde_json::from_str(r#"{"recognition_image_path": null}"#).unwrap();
        assert_eq!(scene.recognition_threshold, 0.8);
        assert!(scene.enabled);
        assert_eq!(scene.full_frame_path(), None);
        scene.recognition_image_path = Some("  ".to_string());
        assert_eq!(scene.full_frame_path(), None);
    }
}
