use serde::{Deserialize, Serialize};

use crate::controller::jump::{DEBOUNCE_WINDOW, DEFAULT_THRESHOLD};
use crate::device::constants::DEFAULT_NAME_PREFIX;
use crate::sim::types::Button;

/// Startup settings. Every field is optional in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    // kilograms
    pub threshold: f32,
    pub debounce_ms: u64,
    pub jump_button: Button,
    pub device_name_prefix: String,
    pub simulate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            threshold: DEFAULT_THRESHOLD,
            debounce_ms: DEBOUNCE_WINDOW,
            jump_button: Button::Space,
            device_name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            simulate: false,
        }
    }
}

/// Values given on the command line, they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub threshold: Option<f32>,
    pub simulate: bool,
}

impl Config {
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if overrides.simulate {
            self.simulate = true;
        }
    }
}
