use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::grid::{GridSpec, LatLng};

/// Errors from loading or validating a [`GameConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Startup constants. Nothing here is reconfigured while a session runs.
///
/// Every field has a default, so a YAML file only needs to name what it overrides.
/// Keys are accepted in snake_case or camelCase; unknown keys are an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Grid origin; also where a fresh player starts.
    pub origin: LatLng,
    /// Edge length of one cell, in degrees.
    #[serde(alias = "tileSize")]
    pub tile_size: f64,
    /// Chebyshev reach of the player's interact action.
    #[serde(alias = "interactionRadius")]
    pub interaction_radius: u32,
    /// Merging up to this value raises the goal notification.
    #[serde(alias = "targetToken")]
    pub target_token: u64,
    /// Chebyshev radius kept live around the player.
    #[serde(alias = "neighborhoodRadius")]
    pub neighborhood_radius: u32,
    /// Chance a never-touched cell holds a `1`.
    #[serde(alias = "spawnProbability")]
    pub spawn_probability: f64,
    /// Extra cells spawned around the viewport on each side.
    #[serde(alias = "viewportPadding")]
    pub viewport_padding: u32,
    /// Interval between manual movement steps while a key is held.
    #[serde(alias = "keyRepeatMs")]
    pub key_repeat_ms: u64,
    /// Cells shown (rows, columns) when the view is centred on the player.
    #[serde(alias = "viewSpan")]
    pub view_span: (u32, u32),
    /// Storage key of the save blob.
    #[serde(alias = "saveKey")]
    pub save_key: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            origin: LatLng::new(36.997936938057016, -122.05703507501151),
            tile_size: 0.0001,
            interaction_radius: 3,
            target_token: 32,
            neighborhood_radius: 48,
            spawn_probability: 0.15,
            viewport_padding: 1,
            key_repeat_ms: 100,
            view_span: (12, 24),
            save_key: "geoGameSave".into(),
        }
    }
}

impl GameConfig {
    /// Parse from YAML and validate.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tile_size must be positive, got {}",
                self.tile_size
            )));
        }
        if !self.origin.is_finite() {
            return Err(ConfigError::Invalid("origin must be finite".into()));
        }
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(ConfigError::Invalid(format!(
                "spawn_probability must be within [0, 1], got {}",
                self.spawn_probability
            )));
        }
        if !self.target_token.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "target_token must be a power of two, got {}",
                self.target_token
            )));
        }
        if self.key_repeat_ms == 0 {
            return Err(ConfigError::Invalid("key_repeat_ms must be non-zero".into()));
        }
        if self.save_key.is_empty() {
            return Err(ConfigError::Invalid("save_key must not be empty".into()));
        }
        Ok(())
    }

    pub fn grid(&self) -> GridSpec {
        GridSpec::new(self.origin, self.tile_size)
    }

    pub fn key_repeat(&self) -> Duration {
        Duration::from_millis(self.key_repeat_ms)
    }
}
