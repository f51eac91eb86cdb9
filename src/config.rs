//! Configuration loading and management
//!
//! Handles parsing of `.taskraffle.toml` configuration files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::query::SortBy;
use crate::task::Priority;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Raffle presentation
    #[serde(default)]
    pub raffle: RaffleConfig,
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Task ID prefix
    #[serde(default = "default_task_id_prefix")]
    pub id_prefix: String,

    /// Minimum task ID suffix length
    #[serde(default = "default_task_id_min_len")]
    pub id_min_len: usize,

    /// Priority for new tasks when none is given
    #[serde(default = "default_task_priority")]
    pub default_priority: Priority,

    /// Type for new tasks when none is given
    #[serde(default = "default_task_type")]
    pub default_type: String,

    /// Sort order used by `list` and `raffle`
    #[serde(default = "default_sort")]
    pub default_sort: SortBy,
}

fn default_task_id_prefix() -> String {
    "task".to_string()
}

fn default_task_id_min_len() -> usize {
    3
}

fn default_task_priority() -> Priority {
    Priority::Medium
}

fn default_task_type() -> String {
    "General".to_string()
}

fn default_sort() -> SortBy {
    SortBy::Date
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_task_id_prefix(),
            id_min_len: default_task_id_min_len(),
            default_priority: default_task_priority(),
            default_type: default_task_type(),
            default_sort: default_sort(),
        }
    }
}

/// Raffle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleConfig {
    /// Pause before the winner is shown, in milliseconds (0 disables)
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
}

fn default_reveal_delay_ms() -> u64 {
    2000
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            reveal_delay_ms: default_reveal_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a `.taskraffle.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let config: Config = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate().map(|()| config)
    }

    /// Load configuration from the root, or return defaults
    pub fn load_from_root(root: &Path) -> Self {
        let config_path = root.join(crate::storage::CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.tasks.validate()
    }
}

impl TasksConfig {
    fn validate(&self) -> Result<()> {
        let prefix = self.id_prefix.trim();
        let problem = if prefix.is_empty() {
            Some("tasks.id_prefix cannot be empty")
        } else if !prefix.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            Some("tasks.id_prefix must be alphanumeric")
        } else if !(3..=16).contains(&self.id_min_len) {
            Some("tasks.id_min_len must be between 3 and 16")
        } else if self.default_type.trim().is_empty() {
            Some("tasks.default_type cannot be empty")
        } else {
            None
        };
        match problem {
            Some(message) => Err(Error::InvalidConfig(message.to_string())),
            None => Ok(()),
        }
    }
}
