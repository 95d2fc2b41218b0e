//! Loading machine settings from JSON.
//!
//! Handlers are code and cannot be configured; everything else a machine is
//! built from can. Pass a loaded [`FsmConfig`] to
//! [`FsmBuilder::from_config`](crate::builder::FsmBuilder::from_config) and
//! register handlers on the returned builder.

use crate::core::{StateHistory, TransitionTable};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::ConfigError;

/// Version identifier for the configuration format
pub const CONFIG_VERSION: u32 = 1;

/// Serializable machine settings.
///
/// # Example
///
/// ```rust
/// use settle::config::FsmConfig;
///
/// let config = FsmConfig::from_json(
///     r#"{
///         "name": "light",
///         "state_order": ["Red", "Green", "Yellow"],
///         "transitions": { "Red": ["Green"], "Green": ["Yellow"], "Yellow": ["Red"] }
///     }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.name, "light");
/// assert!(!config.broadcast);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FsmConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: u32,

    pub name: String,

    /// States cycled through by next/previous navigation
    #[serde(default)]
    pub state_order: Vec<String>,

    /// Allow-table for the default filter; absent means any direct request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<TransitionTable>,

    #[serde(default)]
    pub broadcast: bool,

    /// Number of transitions kept in history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_history_limit() -> usize {
    StateHistory::DEFAULT_LIMIT
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            name: String::new(),
            state_order: Vec::new(),
            transitions: None,
            broadcast: false,
            history_limit: StateHistory::DEFAULT_LIMIT,
        }
    }
}

impl FsmConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the settings a builder would otherwise reject later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                supported: CONFIG_VERSION,
            });
        }
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("name is empty".to_string()));
        }
        if let Some(state) = crate::engine::navigation::first_duplicate(&self.state_order) {
            return Err(ConfigError::Invalid(format!(
                "state '{}' appears more than once in state_order",
                state
            )));
        }
        Ok(())
    }
}
