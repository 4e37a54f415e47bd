use glam::Vec2;

use crate::action::Action;

/// Tracks the window size and last pointer position, translating pixel
/// coordinates into normalized device coordinates (x right, y up, [-1, 1]).
#[derive(Debug, Clone, Copy)]
pub struct Pointer {
    width: u32,
    height: u32,
    ndc: Vec2,
    dragging: bool,
    last_pixel: Option<Vec2>,
}

impl Pointer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            ndc: Vec2::ZERO,
            dragging: false,
            last_pixel: None,
        }
    }

    /// Current pointer position in NDC. Starts at the window centre.
    pub fn ndc(&self) -> Vec2 {
        self.ndc
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Action {
        self.width = width.max(1);
        self.height = height.max(1);
        tracing::debug!(width = self.width, height = self.height, "pointer surface resized");
        Action::Resize {
            width: self.width,
            height: self.height,
        }
    }

    /// Convert a pixel position to NDC without updating state.
    pub fn to_ndc(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (x / self.width as f32) * 2.0 - 1.0,
            -(y / self.height as f32) * 2.0 + 1.0,
        )
    }

    /// Cursor moved. Yields a point action, plus an orbit action while dragging.
    pub fn moved(&mut self, x: f32, y: f32) -> (Action, Option<Action>) {
        let pixel = Vec2::new(x, y);
        self.ndc = self.to_ndc(x, y);
        let orbit = match (self.dragging, self.last_pixel) {
            (true, Some(last)) => Some(Action::Orbit(pixel - last)),
            _ => None,
        };
        self.last_pixel = Some(pixel);
        (Action::Point(self.ndc), orbit)
    }

    /// Primary button pressed at the last known cursor position.
    pub fn pressed(&mut self) -> Action {
        self.dragging = true;
        Action::Point(self.ndc)
    }

    pub fn released(&mut self) {
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_maps_to_origin() {
        let p = Pointer::new(800, 600);
        assert_eq!(p.to_ndc(400.0, 300.0), Vec2::ZERO);
    }

    #[test]
    fn corners_map_to_unit_square() {
        let p = Pointer::new(800, 600);
        assert_eq!(p.to_ndc(0.0, 0.0), Vec2::new(-1.0, 1.0));
        assert_eq!(p.to_ndc(800.0, 600.0), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn move_updates_ndc_without_orbit() {
        let mut p = Pointer::new(100, 100);
        let (point, orbit) = p.moved(75.0, 25.0);
        assert_eq!(point, Action::Point(Vec2::new(0.5, 0.5)));
        assert!(orbit.is_none());
        assert_eq!(p.ndc(), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn drag_emits_orbit_delta() {
        let mut p = Pointer::new(100, 100);
        p.moved(10.0, 10.0);
        assert_eq!(p.pressed(), Action::Point(p.ndc()));
        let (_, orbit) = p.moved(14.0, 7.0);
        assert_eq!(orbit, Some(Action::Orbit(Vec2::new(4.0, -3.0))));
        p.released();
        let (_, orbit) = p.moved(20.0, 20.0);
        assert!(orbit.is_none());
    }

    #[test]
    fn zero_size_is_clamped() {
        let mut p = Pointer::new(0, 0);
        assert_eq!(p.size(), (1, 1));
        p.resize(1920, 0);
        assert_eq!(p.size(), (1920, 1));
        assert_eq!(p.aspect(), 1920.0);
    }
}
