//! Runtime tunables.
//!
//! A JSON file can override the motion and sizing knobs. Score
//! thresholds are part of the progression ladder and are deliberately not
//! configurable.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// Exponential damping factor applied to drag input per frame.
    pub damping: f32,
    /// Closest the camera may orbit to the origin.
    pub min_distance: f32,
    /// Furthest the camera may orbit from the origin.
    pub max_distance: f32,
    /// Radians of yaw per pixel of horizontal drag.
    pub drag_sensitivity: f32,
    /// Distance change per scroll line.
    pub zoom_sensitivity: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            damping: 0.25,
            min_distance: 3.0,
            max_distance: 10.0,
            drag_sensitivity: 0.008,
            zoom_sensitivity: 0.5,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Idle spin speed of the cube, radians per second.
    pub rotation_speed: f32,
    /// Uniform scale applied while the cube is pressed.
    pub press_scale: f32,
    /// Cube edge length.
    pub cube_size: f32,
    /// Height of the score display above the origin.
    pub score_height: f32,
    pub orbit: OrbitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            // 0.01 rad per frame at 60 fps.
            rotation_speed: 0.6,
            press_scale: 1.2,
            cube_size: 1.7,
            score_height: 2.5,
            orbit: OrbitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_expected_tuning() {
        let config = AppConfig::default();
        assert_eq!(config.press_scale, 1.2);
        assert_eq!(config.cube_size, 1.7);
        assert_eq!(config.orbit.min_distance, 3.0);
        assert_eq!(config.orbit.max_distance, 10.0);
        assert_eq!(config.orbit.damping, 0.25);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"rotation_speed": 1.5}"#).unwrap();
        assert_eq!(config.rotation_speed, 1.5);
        assert_eq!(config.press_scale, 1.2);
    }
}
