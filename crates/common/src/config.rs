//! Scene configuration with defaults and YAML persistence.
//!
//! Every field has a default matching the reference scene, so a config file
//! only needs to list what it overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::geometry::Ground;
use crate::types::{PointLight, Rgb, rgb_from_hex};

/// Errors that can occur when loading, saving, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level scene configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub ground: GroundConfig,
    pub grass: GrassConfig,
    pub player: PlayerConfig,
    pub lighting: LightingConfig,
    pub assets: AssetPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// 1 disables multisampling; 4 matches an antialiased canvas.
    pub msaa_samples: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Meadow".into(),
            width: 1280,
            height: 720,
            msaa_samples: 4,
            vsync: true,
        }
    }
}

/// Perspective camera plus orbit-control tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of pending orbit motion applied per update. 1.0 disables damping.
    pub damping_factor: f32,
    /// Radians of orbit per pixel of drag.
    pub rotate_speed: f32,
    /// Distance multiplier per wheel notch.
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(-5.0, 5.0, 7.0),
            target: Vec3::new(0.0, -2.0, 0.0),
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
            damping_factor: 0.05,
            rotate_speed: 0.005,
            zoom_speed: 0.95,
            min_distance: 1.0,
            max_distance: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroundConfig {
    #[serde(flatten)]
    pub disc: Ground,
    pub segments: u32,
    /// Floor texture tiling across the disc.
    pub texture_repeat: f32,
    pub color: Rgb,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            disc: Ground::default(),
            segments: 64,
            texture_repeat: 4.0,
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// How blade positions are distributed over the field radius.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// Random unit-sphere direction flattened onto the ground plane.
    /// Dense at the rim, sparse toward the centre.
    #[default]
    ProjectedSphere,
    /// Every blade exactly on the rim.
    Ring,
    /// Uniform density over the disc.
    AreaUniform,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrassConfig {
    /// Slots in the instance buffer.
    pub capacity: usize,
    /// Blades actually placed; the rest stay collapsed.
    pub count: usize,
    pub radius: f32,
    pub placement: PlacementPolicy,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Vertical offset of the whole batch.
    pub height_offset: f32,
    pub seed: u64,
    pub collider_radius: f32,
    pub initial_player_position: Vec3,
    pub sway_amplitude: f32,
    /// Distance from the player at which sway reaches full strength.
    pub sway_falloff: f32,
    pub noise_floor: f32,
    pub noise_range: f32,
    /// Local blade height mapped to the tip colour.
    pub color_height: f32,
    pub root_color: Rgb,
    pub tip_color: Rgb,
}

impl Default for GrassConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            count: 10_000,
            radius: 10.0,
            placement: PlacementPolicy::ProjectedSphere,
            min_scale: 0.25,
            max_scale: 0.5,
            height_offset: -2.0,
            seed: 0x6d65_6164_6f77,
            collider_radius: 1.1,
            initial_player_position: Vec3::new(0.0, -1.0, 0.0),
            sway_amplitude: 0.1,
            sway_falloff: 4.0,
            noise_floor: 0.4,
            noise_range: 0.6,
            color_height: 2.0,
            root_color: [24.0 / 255.0, 30.0 / 255.0, 41.0 / 255.0],
            tip_color: [88.0 / 255.0, 176.0 / 255.0, 110.0 / 255.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    pub tick_hz: f32,
    /// Fraction of the remaining distance covered per tick.
    pub smoothing: f32,
    /// Height of the follower above the raycast hit.
    pub hover_height: f32,
    pub model_scale: f32,
    /// Optional clamp on roll change per tick, in radians. `None` keeps
    /// the raw positional delta.
    pub max_roll_per_tick: Option<f32>,
    pub visible: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60.0,
            smoothing: 0.1,
            hover_height: 1.0,
            model_scale: 0.25,
            max_roll_per_tick: None,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    pub background_color: Rgb,
    pub lights: Vec<PointLight>,
    /// Ambient term used until an environment map provides one.
    pub fallback_ambient: Rgb,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            background_color: rgb_from_hex(0x222222),
            lights: vec![
                PointLight {
                    position: Vec3::new(2.0, 2.0, 2.0),
                    color: rgb_from_hex(0xffffff),
                    intensity: 1.0,
                    range: 10.0,
                },
                PointLight {
                    position: Vec3::new(-2.0, 2.0, -2.0),
                    color: rgb_from_hex(0x8888ff),
                    intensity: 1.0,
                    range: 10.0,
                },
            ],
            fallback_ambient: [0.25, 0.25, 0.25],
        }
    }
}

/// File locations for external assets. `None` selects the builtin stand-in
/// (or leaves the feature out where there is none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetPaths {
    pub grass_model: Option<PathBuf>,
    pub player_model: Option<PathBuf>,
    pub floor_texture: Option<PathBuf>,
    pub background: Option<PathBuf>,
    pub environment: Option<PathBuf>,
    pub debug_textures: BTreeMap<String, PathBuf>,
}

impl SceneConfig {
    /// Load a config from a YAML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&contents)?;
        tracing::info!("loaded scene config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Serialize)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values the scene cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.grass;
        if g.count > g.capacity {
            return Err(ConfigError::Invalid(format!(
                "grass.count ({}) exceeds grass.capacity ({})",
                g.count, g.capacity
            )));
        }
        if g.radius <= 0.0 {
            return Err(ConfigError::Invalid("grass.radius must be positive".into()));
        }
        if g.min_scale < 0.0 || g.max_scale < g.min_scale {
            return Err(ConfigError::Invalid(
                "grass scale range must satisfy 0 <= min_scale <= max_scale".into(),
            ));
        }
        if g.sway_falloff.is_nan() || g.sway_falloff <= 0.0 {
            return Err(ConfigError::Invalid("grass.sway_falloff must be positive".into()));
        }
        if g.color_height.is_nan() || g.color_height <= 0.0 {
            return Err(ConfigError::Invalid("grass.color_height must be positive".into()));
        }
        if let Some(limit) = self.player.max_roll_per_tick {
            if !limit.is_finite() || limit < 0.0 {
                return Err(ConfigError::Invalid(
                    "player.max_roll_per_tick must be finite and non-negative".into(),
                ));
            }
        }
        let c = &self.camera;
        if c.min_distance.is_nan()
            || c.max_distance.is_nan()
            || c.min_distance <= 0.0
            || c.min_distance > c.max_distance
        {
            return Err(ConfigError::Invalid(
                "camera distances must satisfy 0 < min_distance <= max_distance".into(),
            ));
        }
        if self.player.tick_hz <= 0.0 {
            return Err(ConfigError::Invalid("player.tick_hz must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.player.smoothing) {
            return Err(ConfigError::Invalid(
                "player.smoothing must lie in [0, 1]".into(),
            ));
        }
        if !matches!(self.window.msaa_samples, 1 | 4) {
            return Err(ConfigError::Invalid(
                "window.msaa_samples must be 1 or 4".into(),
            ));
        }
        if self.camera.near <= 0.0 || self.camera.far <= self.camera.near {
            return Err(ConfigError::Invalid(
                "camera clip planes must satisfy 0 < near < far".into(),
            ));
        }
        Ok(())
    }
}
