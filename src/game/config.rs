//! Match Configuration
//!
//! Tunables for one match, loadable from JSON. Every field has a default so a
//! partial file only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::pose::Pose;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON did not parse.
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Win threshold outside (0, 1].
    #[error("cat_win_threshold must be in (0, 1], got {0}")]
    Threshold(f32),

    /// Percentage above 100.
    #[error("{field} must be at most 100, got {value}")]
    Percentage {
        /// Offending field.
        field: &'static str,
        /// Configured value.
        value: u32,
    },
}

/// Match tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Character customization length (seconds).
    pub customization_seconds: u32,
    /// Preparation length (seconds).
    pub prepare_seconds: u32,
    /// Gameplay length (seconds).
    pub gameplay_seconds: u32,
    /// Fraction of total progression weight the cats need, in (0, 1].
    pub cat_win_threshold: f32,
    /// Chance (percent) that each item survives setup.
    pub item_remain_percentage: u32,
    /// A d100 roll above this randomizes a prop.
    pub env_actor_randomness_percentage: u32,
    /// Setup seed. Derived from the match id and players when absent.
    pub rng_seed: Option<u64>,
    /// Cat spawn points, used in order.
    pub cat_spawn_points: Vec<Pose>,
    /// Human spawn points, used in order.
    pub human_spawn_points: Vec<Pose>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            customization_seconds: 30,
            prepare_seconds: 10,
            gameplay_seconds: 300,
            cat_win_threshold: 0.8,
            item_remain_percentage: 75,
            env_actor_randomness_percentage: 50,
            rng_seed: None,
            cat_spawn_points: Vec::new(),
            human_spawn_points: Vec::new(),
        }
    }
}

impl MatchConfig {
    /// Parse from a JSON string and validate.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file and validate.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cat_win_threshold > 0.0 && self.cat_win_threshold <= 1.0) {
            return Err(ConfigError::Threshold(self.cat_win_threshold));
        }
        if self.item_remain_percentage > 100 {
            return Err(ConfigError::Percentage {
                field: "item_remain_percentage",
                value: self.item_remain_percentage,
            });
        }
        if self.env_actor_randomness_percentage > 100 {
            return Err(ConfigError::Percentage {
                field: "env_actor_randomness_percentage",
                value: self.env_actor_randomness_percentage,
            });
        }
        Ok(())
    }
}
