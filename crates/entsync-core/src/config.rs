//! Engine configuration: defaults, JSON documents, and environment overrides.

use serde::{Deserialize, Serialize};

use crate::errors::SyncResult;
use crate::models::classes;

pub const ENV_MINI_SWITCH_MODELS: &str = "ENTSYNC_MINI_SWITCH_MODELS";
pub const ENV_ABBREVIATE_GIGABIT: &str = "ENTSYNC_ABBREVIATE_GIGABIT";
pub const ENV_LOGICAL_PORT_CLASS: &str = "ENTSYNC_LOGICAL_PORT_CLASS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model-name markers of switches whose ports are always electrical.
    pub mini_switch_models: Vec<String>,
    /// Rewrite `GigabitEthernet` to `Gi` in discovered names.
    pub abbreviate_gigabit_names: bool,
    /// Persisted classes below this one are left out of the structure snapshot.
    pub logical_port_class: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mini_switch_models: vec!["2960".to_string()],
            abbreviate_gigabit_names: true,
            logical_port_class: classes::GENERIC_LOGICAL_PORT.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Defaults overridden by `ENTSYNC_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = std::env::var(ENV_MINI_SWITCH_MODELS) {
            config.mini_switch_models = parse_list(&val);
        }
        if let Ok(val) = std::env::var(ENV_ABBREVIATE_GIGABIT) {
            config.abbreviate_gigabit_names = parse_flag(&val, true);
        }
        if let Ok(val) = std::env::var(ENV_LOGICAL_PORT_CLASS) {
            let val = val.trim();
            if !val.is_empty() {
                config.logical_port_class = val.to_string();
            }
        }
        config
    }

    pub fn is_mini_switch(&self, model_name: &str) -> bool {
        self.mini_switch_models
            .iter()
            .any(|marker| !marker.is_empty() && model_name.contains(marker.as_str()))
    }
}

/// `0|false|no|off` disable, `1|true|yes|on` enable, anything else keeps the default.
pub fn parse_flag(value: &str, default: bool) -> bool {
    let v = value.trim().to_lowercase();
    match v.as_str() {
        "0" | "false" | "no" | "off" => false,
        "1" | "true" | "yes" | "on" => true,
        _ => default,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
