//! Developer tooling: scene inspector and placement statistics.
//!
//! # Invariants
//! - Tools only read scene state.

pub mod inspector;
pub mod placement;

pub use inspector::{BladeInfo, SceneInspector, SceneSummary};
pub use placement::{PlacementStats, placement_stats};

pub fn crate_info() -> &'static str {
    "meadow-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
