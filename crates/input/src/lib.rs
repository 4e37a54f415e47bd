//! Input: window events translated into scene actions.
//!
//! # Invariants
//! - Pointer coordinates leave this crate in NDC only.
//! - Pointer-down updates the raycast position exactly like pointer-move.

pub mod action;
pub mod pointer;

pub use action::Action;
pub use pointer::Pointer;

pub fn crate_info() -> &'static str {
    "meadow-input v0.1.0"
}
