use crate::RoomError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use zonesim_kernel::WorldConfig;

/// Room settings, read from YAML. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Location key this room simulates.
    pub location: String,
    /// Fixed simulation step.
    pub update_rate_ms: f32,
    pub patch_rate_ms: f32,
    pub save_interval_ms: f32,
    pub max_clients: usize,
    /// RNG seed; entropy when absent.
    pub seed: Option<u64>,
    pub world: WorldConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            location: "lh_town".into(),
            update_rate_ms: 100.0,
            patch_rate_ms: 100.0,
            save_interval_ms: 1000.0,
            max_clients: 20,
            seed: None,
            world: WorldConfig::default(),
        }
    }
}

impl RoomConfig {
    pub fn from_yaml(text: &str) -> Result<Self, RoomError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RoomError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    fn validate(&self) -> Result<(), RoomError> {
        for (name, value) in [
            ("update_rate_ms", self.update_rate_ms),
            ("patch_rate_ms", self.patch_rate_ms),
            ("save_interval_ms", self.save_interval_ms),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(RoomError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}
