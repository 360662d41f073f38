use serde::{Deserialize, Serialize};

use crate::error::{GeocError, Result};

/// Host tunables. Every field has a default, so an empty document is valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub animation: AnimationConfig,
    pub idle: IdleConfig,
    pub render: RenderConfig,
    pub perspective: Perspective,
    pub input: InputConfig,
}

/// Time slicing of animated transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Ticks a transform is spread over (per axis for rotations).
    pub frame_count: u32,
    pub tick_interval_ms: u32,
    /// Upper bound on linear memory reserved for in-flight index arrays.
    pub scratch_limit_bytes: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_count: 25,
            tick_interval_ms: 30,
            scratch_limit_bytes: 4096,
        }
    }
}

/// Continuous yaw rotation toggled by a rotate request with nothing selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Radians added to the yaw per tick.
    pub yaw_step: f32,
    pub interval_ms: u32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            yaw_step: 0.03,
            interval_ms: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Extra delay before re-arming the next frame; 0 draws on every refresh.
    pub throttle_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Perspective {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    #[serde(skip)]
    pub aspect_ratio: f32,
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            fov: 1.4,
            near: 0.1,
            far: 100.0,
            aspect_ratio: 1.0,
        }
    }
}

impl Perspective {
    pub fn matrix(&self) -> [f32; 16] {
        crate::math::projection_matrix(self.fov, self.aspect_ratio, self.near, self.far)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fov > 0.0 && self.fov < std::f32::consts::PI) {
            return Err(GeocError::Config(format!("perspective.fov must be in (0, pi), got {}", self.fov)));
        }
        if !(self.near > 0.0 && self.near < self.far) {
            return Err(GeocError::Config(format!(
                "perspective requires 0 < near < far, got near={} far={}",
                self.near, self.far
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Wheel delta is divided by this before reaching `setZoom`.
    pub zoom_sensitivity: f32,
    /// Change in two-finger distance, in CSS pixels, is divided by this.
    pub pinch_sensitivity: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            zoom_sensitivity: 0.1,
            pinch_sensitivity: 2000.0,
        }
    }
}

impl HostConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: HostConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GeocError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.animation.frame_count == 0 {
            return Err(GeocError::Config("animation.frame_count must be at least 1".into()));
        }
        if self.animation.tick_interval_ms == 0 || self.idle.interval_ms == 0 {
            return Err(GeocError::Config("timer intervals must be at least 1 ms".into()));
        }
        if !self.idle.yaw_step.is_finite() {
            return Err(GeocError::Config("idle.yaw_step must be finite".into()));
        }
        if !(self.input.zoom_sensitivity.is_finite() && self.input.zoom_sensitivity != 0.0) {
            return Err(GeocError::Config("input.zoom_sensitivity must be finite and non-zero".into()));
        }
        if !(self.input.pinch_sensitivity.is_finite() && self.input.pinch_sensitivity != 0.0) {
            return Err(GeocError::Config("input.pinch_sensitivity must be finite and non-zero".into()));
        }
        self.perspective.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = HostConfig::from_toml_str("").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.animation.frame_count, 25);
        assert_eq!(config.animation.tick_interval_ms, 30);
        assert_eq!(config.render.throttle_ms, 0);
    }

    #[test]
    fn test_partial_override() {
        let config = HostConfig::from_toml_str(
            "[animation]\nframe_count = 10\n\n[perspective]\nfar = 250.0\n",
        )
        .unwrap();
        assert_eq!(config.animation.frame_count, 10);
        assert_eq!(config.animation.tick_interval_ms, 30);
        assert_eq!(config.perspective.far, 250.0);
        assert_eq!(config.perspective.near, 0.1);
    }

    #[test]
    fn test_rejects_zero_frames() {
        let err = HostConfig::from_toml_str("[animation]\nframe_count = 0\n").unwrap_err();
        assert!(matches!(err, GeocError::Config(_)));
    }

    #[test]
    fn test_rejects_inverted_clip_planes() {
        let err = HostConfig::from_toml_str("[perspective]\nnear = 10.0\nfar = 1.0\n").unwrap_err();
        assert!(err.to_string().contains("near"));
    }

    #[test]
    fn test_pinch_sensitivity() {
        assert_eq!(HostConfig::default().input.pinch_sensitivity, 2000.0);
        let config = HostConfig::from_toml_str("[input]\npinch_sensitivity = 500.0\n").unwrap();
        assert_eq!(config.input.pinch_sensitivity, 500.0);
        assert_eq!(config.input.zoom_sensitivity, 0.1);
        assert!(HostConfig::from_toml_str("[input]\npinch_sensitivity = 0.0\n").is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            HostConfig::from_toml_str("[animation\n"),
            Err(GeocError::Config(_))
        ));
    }

    #[test]
    fn test_serialized_config_parses_back() {
        let mut config = HostConfig::default();
        config.idle.yaw_step = 0.05;
        config.render.throttle_ms = 15;
        let text = config.to_toml_string().unwrap();
        assert_eq!(HostConfig::from_toml_str(&text).unwrap(), config);
    }
}
