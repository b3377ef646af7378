use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::{Action, ActionKind};
use super::scene::Scene;
use crate::core::coords::RelPoint;
use crate::core::platform::WindowQuery;

/// File the group registry lives in; shares the project directory.
const GROUPS_FILE: &str = "groups.json";

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_true() -> bool {
    true
}

fn default_recognize_interval() -> u64 {
    2000
}

fn default_group() -> String {
    "default".to_string()
}

/// A target window plus the scenes to run against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_window_title: String,
    #[serde(default)]
    pub target_window_class: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default = "default_true")]
    pub auto_recognize_scene: bool,
    /// Milliseconds between loop iterations.
    #[serde(default = "default_recognize_interval")]
    pub recognize_interval: u64,
    #[serde(default)]
    pub loop_execution: bool,
    /// 0 loops forever.
    #[serde(default)]
    pub max_loop_count: u32,
    #[serde(default = "default_group")]
    pub group_id: String,
    /// Directory the project was loaded from; relative template paths
    /// resolve against it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Project {
    pub fn new(name: impl Into<String>, target_window_title: impl Into<String>) -> Self {
        let now = Local::now().naive_local();
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            target_window_title: target_window_title.into(),
            target_window_class: String::new(),
            scenes: vec![Scene::default_scene()],
            created_at: Some(now),
            updated_at: Some(now),
            auto_recognize_scene: true,
            recognize_interval: default_recognize_interval(),
            loop_execution: false,
            max_loop_count: 0,
            group_id: default_group(),
            base_dir: None,
        }
    }

    /// Example written by `scene-pilot init`: click the centre, wait, press enter.
    pub fn example() -> Self {
        let mut project = Self::new("Example", "Untitled - Notepad");
        project.auto_recognize_scene = false;
        let scene = &mut project.scenes[0];
        scene.push_action(Action::new(
            "click centre",
            ActionKind::Click {
                at: RelPoint::new(0.5, 0.5),
            },
        ));
        scene.push_action(Action::new("settle", ActionKind::Wait { duration_ms: 500 }));
        scene.push_action(Action::new("confirm", ActionKind::KeyPress { keys: "enter".into() }));
        project
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading project {}", path.display()))?;
        let mut project: Project = serde_json::from_str(&contents)
            .with_context(|| format!("parsing project {}", path.display()))?;
        if project.scenes.is_empty() {
            project.scenes.push(Scene::default_scene());
        }
        project.base_dir = path.parent().map(Path::to_path_buf);
        Ok(project)
    }

    pub fn save(&mut self, path: &Path) -> anyhow::Result<()> {
        self.updated_at = Some(Local::now().naive_local());
        let json = serde_json::to_string_pretty(self).context("serializing project")?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        fs::write(path, json).with_context(|| format!("writing project {}", path.display()))?;
        Ok(())
    }

    /// The scene flagged default, else the first scene.
    pub fn default_scene(&self) -> Option<&Scene> {
        self.scenes
            .iter()
            .find(|s| s.is_default)
            .or_else(|| self.scenes.first())
    }

    pub fn enabled_scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter().filter(|s| s.enabled)
    }

    pub fn window_query(&self) -> WindowQuery {
        WindowQuery::title(self.target_window_title.clone()).with_class(self.target_window_class.clone())
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

pub(crate) fn resolve_against(base_dir: Option<&Path>, path: &str) -> PathBuf {
    let candidate = PathBuf::from(path);
    match base_dir {
        Some(base) if candidate.is_relative() => base.join(candidate),
        _ => candidate,
    }
}

/// Load every project file in `dir`. Unreadable files are logged and skipped.
pub fn load_projects(dir: &Path) -> anyhow::Result<Vec<Project>> {
    let entries = fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().map_or(false, |ext| ext == "json")
                && path.file_name().map_or(true, |name| name != GROUPS_FILE)
        })
        .collect();
    paths.sort();

    let mut projects = Vec::with_capacity(paths.len());
    for path in paths {
        match Project::load(&path) {
            Ok(project) => projects.push(project),
            Err(e) => log::warn!("skipping {}: {:#}", path.display(), e),
        }
    }
    Ok(projects)
}

/// ISO-8601 local timestamps without offset. Blank or unparseable values
/// read as `None`.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }

    pub(super) fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
    }
}
