//! Rendering adapter: renderer-agnostic interface and the math every
//! backend shares.
//!
//! # Invariants
//! - Renderers read a [`RenderScene`] snapshot and never mutate scene state.
//! - [`grass_shader`] is the reference for the GPU grass program; the two
//!   must agree.

pub mod camera;
pub mod frustum;
pub mod grass_shader;
mod renderer;

pub use camera::OrbitCamera;
pub use frustum::Frustum;
pub use renderer::{DebugTextRenderer, RenderScene, RenderView, Renderer};

pub fn crate_info() -> &'static str {
    "meadow-render v0.1.0"
}
