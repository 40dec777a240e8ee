//! Engine configuration. Keys keep the camelCase spellings of the
//! game config file this engine is embedded against.

use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Seed for every noise source the generator consumes.
    pub world_seed: u32,
    /// Activation radius in world units; the deactivation radius and
    /// chunk budget derive from it.
    pub chunk_activation_distance: f32,
    /// Whether the mesher culls faces against opaque neighbors.
    pub enable_hidden_surface_removal: bool,
    /// Consumed by the window shell, not by the engine core.
    pub window_aspect: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_seed: 0,
            chunk_activation_distance: 250.0,
            enable_hidden_surface_removal: true,
            window_aspect: 2.0,
        }
    }
}

impl EngineConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
