use glam::Vec2;

/// A high-level action produced by the windowing layer.
///
/// The scene consumes actions, never raw window events, so the same scene
/// logic runs under the desktop app and headless drivers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Pointer moved or was pressed; coordinates in normalized device space.
    Point(Vec2),
    /// Orbit the camera by a drag delta in physical pixels.
    Orbit(Vec2),
    /// Zoom by wheel notches; positive zooms in.
    Zoom(f32),
    /// Window size changed (physical pixels).
    Resize { width: u32, height: u32 },
    /// Toggle the debug overlay.
    ToggleOverlay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_point_carries_ndc() {
        let a = Action::Point(Vec2::new(0.5, -0.25));
        assert!(matches!(a, Action::Point(p) if p.x == 0.5 && p.y == -0.25));
    }

    #[test]
    fn action_resize() {
        let a = Action::Resize {
            width: 800,
            height: 600,
        };
        assert!(matches!(a, Action::Resize { width: 800, .. }));
    }
}
