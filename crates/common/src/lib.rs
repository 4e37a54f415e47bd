//! Shared types, geometry, and configuration for the meadow workspace.
//!
//! # Invariants
//! - Everything here is plain data; no GPU or window handles.
//! - Config defaults reproduce the reference scene exactly.

pub mod config;
pub mod geometry;
pub mod types;

pub use config::{
    AssetPaths, CameraConfig, ConfigError, GrassConfig, GroundConfig, LightingConfig,
    PlacementPolicy, PlayerConfig, SceneConfig, WindowConfig,
};
pub use geometry::{BoundingSphere, Ground, Ray, RayHit};
pub use types::{PointLight, Rgb, Transform, rgb_from_hex};

pub fn crate_info() -> &'static str {
    "meadow-common v0.1.0"
}
