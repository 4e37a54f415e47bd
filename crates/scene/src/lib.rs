//! Scene context and frame pipeline.
//!
//! # Invariants
//! - One frame runs input, fixed ticks, grass update, then camera damping,
//!   always in that order.
//! - The player-position uniform is written only by a tick whose ray hit
//!   the ground.
//! - Loaded assets are applied on the caller's thread.

mod context;
mod ticker;

pub use context::{AssetChange, FrameReport, SceneContext, SceneError};
pub use ticker::FixedTicker;

pub fn crate_info() -> &'static str {
    "meadow-scene v0.1.0"
}
