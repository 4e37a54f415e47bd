//! wgpu render backend for the meadow scene.
//!
//! Draws the equirectangular background, the lit ground disc and follower,
//! and the instanced grass field in one pass.
//!
//! # Invariants
//! - The renderer never mutates scene state.
//! - Grass instances are re-uploaded only when the field revision changes.

mod gpu;
mod shaders;

pub use gpu::{FrameStats, MAX_LIGHTS, WgpuRenderer};
pub use shaders::{BACKGROUND_SHADER, GRASS_SHADER, LIT_SHADER};
