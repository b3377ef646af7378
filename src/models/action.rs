use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::automation::keys::KeyCombo;
use crate::core::coords::RelPoint;

/// Wire names of the action kinds in project files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Click,
    DoubleClick,
    RightClick,
    Drag,
    KeyPress,
    InputText,
    Wait,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionType::Click => "click",
            ActionType::DoubleClick => "double click",
            ActionType::RightClick => "right click",
            ActionType::Drag => "drag",
            ActionType::KeyPress => "key press",
            ActionType::InputText => "input text",
            ActionType::Wait => "wait",
        };
        f.write_str(name)
    }
}

/// What an action does. Each kind carries only the fields it uses.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Click { at: RelPoint },
    DoubleClick { at: RelPoint },
    RightClick { at: RelPoint },
    Drag { from: RelPoint, to: RelPoint },
    KeyPress { keys: KeyCombo },
    InputText { text: String },
    Wait { duration_ms: u64 },
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::Click { .. } => ActionType::Click,
            ActionKind::DoubleClick { .. } => ActionType::DoubleClick,
            ActionKind::RightClick { .. } => ActionType::RightClick,
            ActionKind::Drag { .. } => ActionType::Drag,
            ActionKind::KeyPress { .. } => ActionType::KeyPress,
            ActionKind::InputText { .. } => ActionType::InputText,
            ActionKind::Wait { .. } => ActionType::Wait,
        }
    }
}

/// One scripted input event inside a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ActionRecord", into = "ActionRecord")]
pub struct Action {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: ActionKind,
    /// Pause after the action succeeds. Not interruptible.
    pub delay_after_ms: u64,
    pub order: i32,
    pub enabled: bool,
}

impl Action {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            kind,
            delay_after_ms: 0,
            order: 0,
            enabled: true,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_delay_after(mut self, delay_after_ms: u64) -> Self {
        self.delay_after_ms = delay_after_ms;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }

    /// Name for logs; falls back to the kind when the author left it blank.
    pub fn label(&self) -> String {
        if self.name.trim().is_empty() {
            self.action_type().to_string()
        } else {
            self.name.clone()
        }
    }
}

fn default_center() -> f32 {
    0.5
}

fn default_wait_time() -> u64 {
    1000
}

fn default_delay_after() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_action_type() -> ActionType {
    ActionType::Click
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Flat on-disk layout: every kind's fields are present, unused ones ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActionRecord {
    #[serde(default = "new_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_action_type")]
    action_type: ActionType,
    #[serde(default = "default_center")]
    relative_x: f32,
    #[serde(default = "default_center")]
    relative_y: f32,
    #[serde(default = "default_center")]
    end_relative_x: f32,
    #[serde(default = "default_center")]
    end_relative_y: f32,
    #[serde(default)]
    key: KeyCombo,
    #[serde(default)]
    text: String,
    #[serde(default = "default_wait_time")]
    wait_time: u64,
    #[serde(default = "default_delay_after")]
    delay_after: u64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    order: i32,
    #[serde(default = "default_true")]
    enabled: bool,
}

impl From<ActionRecord> for Action {
    fn from(r: ActionRecord) -> Self {
        let at = RelPoint::new(r.relative_x, r.relative_y);
        let kind = match r.action_type {
            ActionType::Click => ActionKind::Click { at },
            ActionType::DoubleClick => ActionKind::DoubleClick { at },
            ActionType::RightClick => ActionKind::RightClick { at },
            ActionType::Drag => ActionKind::Drag {
                from: at,
                to: RelPoint::new(r.end_relative_x, r.end_relative_y),
            },
            ActionType::KeyPress => ActionKind::KeyPress { keys: r.key },
            ActionType::InputText => ActionKind::InputText { text: r.text },
            ActionType::Wait => ActionKind::Wait {
                duration_ms: r.wait_time,
            },
        };
        Action {
            id: r.id,
            name: r.name,
            description: r.description,
            kind,
            delay_after_ms: r.delay_after,
            order: r.order,
            enabled: r.enabled,
        }
    }
}

impl From<Action> for ActionRecord {
    fn from(a: Action) -> Self {
        let mut record = ActionRecord {
            id: a.id,
            name: a.name,
            action_type: a.kind.action_type(),
            relative_x: 0.5,
            relative_y: 0.5,
            end_relative_x: 0.5,
            end_relative_y: 0.5,
            key: KeyCombo::default(),
            text: String::new(),
            wait_time: default_wait_time(),
            delay_after: a.delay_after_ms,
            description: a.description,
            order: a.order,
            enabled: a.enabled,
        };
        match a.kind {
            ActionKind::Click { at } | ActionKind::DoubleClick { at } | ActionKind::RightClick { at } => {
                record.relative_x = at.x;
                record.relative_y = at.y;
            }
            ActionKind::Drag { from, to } => {
                record.relative_x = from.x;
                record.relative_y = from.y;
                record.end_relative_x = to.x;
                record.end_relative_y = to.y;
            }
            ActionKind::KeyPress { keys } => record.key = keys,
            ActionKind::InputText { text } => record.text = text,
            ActionKind::Wait { duration_ms } => record.wait_time = duration_ms,
        }
        record
    }
}
