//! Scene configuration.
//!
//! Defaults are the scene's built-in constants. A YAML file may override any
//! subset of fields; anything it leaves out keeps its default.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which fixed object layout the scene starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenePreset {
    /// One cube spinning about Y at the origin.
    SpinningCube,
    /// An orbiting cube plus a counter-rotating scaled cube.
    #[default]
    TwoCubes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Cube Scene".into(),
            width: 800,
            height: 600,
        }
    }
}

/// Fixed camera placement and lens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 3.0, -8.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 0.4 * PI,
            near: 1.0,
            far: 1000.0,
        }
    }
}

/// Single directional light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Direction towards the light.
    pub direction: Vec3,
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.25, 0.5, -1.0),
            ambient: [0.2, 0.2, 0.2, 1.0],
            diffuse: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
    /// Wait limit for each keyed-mutex acquire, in milliseconds.
    pub sync_timeout_ms: u64,
    pub text_color: [u8; 4],
    /// Glyph height in pixels.
    pub font_size: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sync_timeout_ms: 5,
            text_color: [255, 255, 255, 255],
            font_size: 24.0,
        }
    }
}

/// Everything the scene needs at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub preset: ScenePreset,
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub overlay: OverlayConfig,
    pub clear_color: [f32; 4],
    /// Radians per second added to the scene angle.
    pub angular_rate: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            preset: ScenePreset::default(),
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            overlay: OverlayConfig::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            angular_rate: 1.0,
        }
    }
}

impl SceneConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!("loaded scene config from {}", path.display());
        Ok(config)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.window.width as f32 / self.window.height.max(1) as f32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }
        let cam = &self.camera;
        if !(cam.fov_y > 0.0 && cam.fov_y < PI) {
            return Err(ConfigError::Invalid(format!(
                "fov_y {} must lie in (0, pi)",
                cam.fov_y
            )));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return Err(ConfigError::Invalid(format!(
                "clip planes near={} far={} must satisfy 0 < near < far",
                cam.near, cam.far
            )));
        }
        if (cam.target - cam.eye).length_squared() == 0.0 {
            return Err(ConfigError::Invalid("camera eye equals target".into()));
        }
        if !self.angular_rate.is_finite() {
            return Err(ConfigError::Invalid("angular_rate must be finite".into()));
        }
        let font_size = self.overlay.font_size;
        if !(font_size.is_finite() && font_size >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "overlay font_size {font_size} must be at least 1 pixel"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SceneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.overlay.sync_timeout_ms, 5);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = SceneConfig::from_yaml_str(
            "preset: spinning-cube\nwindow:\n  width: 1024\nangular_rate: 2.5\n",
        )
        .unwrap();
        assert_eq!(config.preset, ScenePreset::SpinningCube);
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.angular_rate, 2.5);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn rejects_inverted_clip_planes() {
        let err = SceneConfig::from_yaml_str("camera:\n  near: 10.0\n  far: 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = SceneConfig::from_yaml_str("window: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn rejects_degenerate_font_size() {
        let err = SceneConfig::from_yaml_str("overlay:\n  font_size: 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let ok = SceneConfig::from_yaml_str("overlay:\n  font_size: 32\n").unwrap();
        assert_eq!(ok.overlay.font_size, 32.0);
    }

    #[test]
    fn aspect_ratio_default() {
        let config = SceneConfig::default();
        assert!((config.aspect_ratio() - 800.0 / 600.0).abs() < 1e-6);
    }
}
