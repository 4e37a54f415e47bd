//! View-frustum planes for culling bounding spheres.

use glam::{Mat4, Vec4};
use meadow_common::BoundingSphere;

/// Six inward-facing planes `(normal, d)`, normalized, extracted from a
/// view-projection matrix with a `[0, 1]` depth range.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];
        let mut planes = [
            rows[3] + rows[0], // left
            rows[3] - rows[0], // right
            rows[3] + rows[1], // bottom
            rows[3] - rows[1], // top
            rows[2],           // near
            rows[3] - rows[2], // far
        ];
        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }
        Self { planes }
    }

    /// Conservative test; an empty sphere is never visible.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        if sphere.is_empty() {
            return false;
        }
        self.planes
            .iter()
            .all(|p| p.truncate().dot(sphere.center) + p.w >= -sphere.radius)
    }
}
