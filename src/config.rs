use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "scene-pilot.json";

/// Runtime tuning. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputTiming,
    #[serde(default)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub recognition: RecognitionSettings,
}

/// Gaps between the messages of one action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputTiming {
    /// Between press and release for clicks and the main key.
    pub click_gap_ms: u64,
    pub modifier_gap_ms: u64,
    pub drag_steps: u32,
    pub drag_step_delay_ms: u64,
    pub char_delay_ms: u64,
}

impl Default for InputTiming {
    fn default() -> Self {
        Self {
            click_gap_ms: 50,
            modifier_gap_ms: 20,
            drag_steps: 20,
            drag_step_delay_ms: 20,
            char_delay_ms: 20,
        }
    }
}

impl InputTiming {
    pub fn click_gap(&self) -> Duration {
        Duration::from_millis(self.click_gap_ms)
    }

    pub fn modifier_gap(&self) -> Duration {
        Duration::from_millis(self.modifier_gap_ms)
    }

    pub fn drag_step_delay(&self) -> Duration {
        Duration::from_millis(self.drag_step_delay_ms)
    }

    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }

    /// All gaps zeroed; used by tests that only care about message order.
    pub fn immediate() -> Self {
        Self {
            click_gap_ms: 0,
            modifier_gap_ms: 0,
            drag_steps: 4,
            drag_step_delay_ms: 0,
            char_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Stop/pause polling granularity; clamped to 100ms.
    pub poll_interval_ms: u64,
    /// How long `stop` waits before abandoning a run.
    pub stop_grace_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            stop_grace_ms: 3000,
        }
    }
}

impl ExecutionSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    pub max_compare_width: u32,
    pub max_compare_height: u32,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            max_compare_width: 640,
            max_compare_height: 480,
        }
    }
}

impl Config {
    /// Load settings from file; a missing or corrupt file yields defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Config>(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("ignoring {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!("no config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
