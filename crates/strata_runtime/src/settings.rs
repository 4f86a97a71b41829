//! Runtime settings
//!
//! Loaded from a JSON file when present, defaults otherwise.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub frame_rate_hz: u32,
    pub physics_rate_hz: u32,
    pub voxel_size: f32,
    /// Streaming radius in world units.
    pub region_radius: f32,
    /// Sectors per region axis.
    pub region_size: i32,
    /// Sector persistence root; in-memory only when absent.
    pub persist_root: Option<PathBuf>,
    /// Frames the headless demo runs before shutting down.
    pub demo_frames: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_rate_hz: 60,
            physics_rate_hz: 60,
            voxel_size: 1.0,
            region_radius: 64.0,
            region_size: 2,
            persist_root: None,
            demo_frames: 240,
        }
    }
}

impl Settings {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(settings) => settings,
                Err(err) => {
                    tracing::warn!(%err, path = %path.display(), "settings unreadable; using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_from_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"physics_rate_hz": 120}"#).unwrap();
        assert_eq!(settings.physics_rate_hz, 120);
        assert_eq!(settings.frame_rate_hz, 60);
        assert!(settings.persist_root.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load_or_default("/definitely/not/here.json");
        assert_eq!(settings.demo_frames, 240);
    }
}
