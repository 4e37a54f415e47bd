//! Rays, the ground disc, and bounding spheres.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// A ray defined by origin and normalized direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction is normalized here.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point along the ray at parameter `t`.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Nearest intersection of a ray with a surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub distance: f32,
}

/// Flat, thin cylindrical floor. Static after construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ground {
    pub center: Vec3,
    pub radius: f32,
    pub thickness: f32,
}

impl Default for Ground {
    fn default() -> Self {
        Self {
            center: Vec3::new(0.0, -2.0, 0.0),
            radius: 25.0,
            thickness: 0.01,
        }
    }
}

impl Ground {
    pub fn top(&self) -> f32 {
        self.center.y + self.thickness * 0.5
    }

    pub fn bottom(&self) -> f32 {
        self.center.y - self.thickness * 0.5
    }

    /// Nearest intersection with the caps or the side wall, if any.
    pub fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        let mut best: Option<f32> = None;
        let mut consider = |t: f32| {
            if t >= 0.0 && best.is_none_or(|b| t < b) {
                best = Some(t);
            }
        };

        if ray.direction.y.abs() > f32::EPSILON {
            for plane_y in [self.top(), self.bottom()] {
                let t = (plane_y - ray.origin.y) / ray.direction.y;
                let p = ray.at(t);
                let dx = p.x - self.center.x;
                let dz = p.z - self.center.z;
                if dx * dx + dz * dz <= self.radius * self.radius {
                    consider(t);
                }
            }
        }

        let ox = ray.origin.x - self.center.x;
        let oz = ray.origin.z - self.center.z;
        let a = ray.direction.x * ray.direction.x + ray.direction.z * ray.direction.z;
        if a > f32::EPSILON {
            let b = 2.0 * (ox * ray.direction.x + oz * ray.direction.z);
            let c = ox * ox + oz * oz - self.radius * self.radius;
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                let sq = disc.sqrt();
                for t in [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)] {
                    let y = ray.at(t).y;
                    if y >= self.bottom() && y <= self.top() {
                        consider(t);
                    }
                }
            }
        }

        best.map(|t| RayHit {
            point: ray.at(t),
            distance: t,
        })
    }
}

/// Sphere bounding volume. A negative radius marks an empty sphere.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn empty() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: -1.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }

    /// Sphere centred on the points' bounding-box centre.
    pub fn from_points(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::empty();
        }
        let (min, max) = points
            .iter()
            .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f32, f32::max);
        Self { center, radius }
    }

    /// Apply an affine transform. Non-uniform scale grows the radius by the
    /// largest axis scale.
    pub fn transformed(&self, m: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let max_scale = m
            .x_axis
            .truncate()
            .length()
            .max(m.y_axis.truncate().length())
            .max(m.z_axis.truncate().length());
        Self {
            center: m.transform_point3(self.center),
            radius: self.radius * max_scale,
        }
    }

    /// Smallest sphere enclosing both.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let delta = other.center - self.center;
        let dist = delta.length();
        if dist + other.radius <= self.radius {
            return *self;
        }
        if dist + self.radius <= other.radius {
            return *other;
        }
        let radius = (dist + self.radius + other.radius) * 0.5;
        let center = self.center + delta / dist * (radius - self.radius);
        Self { center, radius }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        !self.is_empty() && p.distance(self.center) <= self.radius + 1e-4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X * 3.0);
        assert_eq!(ray.at(5.0), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn straight_down_hits_top_cap() {
        let ground = Ground::default();
        let ray = Ray::new(Vec3::new(1.0, 10.0, -2.0), Vec3::NEG_Y);
        let hit = ground.raycast(&ray).expect("hit");
        assert!((hit.point - Vec3::new(1.0, ground.top(), -2.0)).length() < 1e-5);
        assert!((hit.distance - (10.0 - ground.top())).abs() < 1e-4);
    }

    #[test]
    fn ray_outside_disc_misses() {
        let ground = Ground::default();
        let ray = Ray::new(Vec3::new(30.0, 10.0, 0.0), Vec3::NEG_Y);
        assert!(ground.raycast(&ray).is_none());
    }

    #[test]
    fn ray_pointing_away_misses() {
        let ground = Ground::default();
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        assert!(ground.raycast(&ray).is_none());
    }

    #[test]
    fn ray_from_below_hits_bottom_cap() {
        let ground = Ground::default();
        let ray = Ray::new(Vec3::new(0.0, -10.0, 0.0), Vec3::Y);
        let hit = ground.raycast(&ray).expect("hit");
        assert!((hit.point.y - ground.bottom()).abs() < 1e-5);
    }

    #[test]
    fn grazing_ray_hits_side_wall() {
        let ground = Ground::default();
        let ray = Ray::new(Vec3::new(-40.0, -2.0, 0.0), Vec3::X);
        let hit = ground.raycast(&ray).expect("hit");
        assert!((hit.point.x + 25.0).abs() < 1e-3);
    }

    #[test]
    fn sphere_union_encloses_both() {
        let a = BoundingSphere::new(Vec3::ZERO, 1.0);
        let b = BoundingSphere::new(Vec3::new(4.0, 0.0, 0.0), 1.0);
        let u = a.union(&b);
        assert!((u.radius - 3.0).abs() < 1e-5);
        assert!((u.center - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert!(u.contains_point(Vec3::new(-1.0, 0.0, 0.0)));
        assert!(u.contains_point(Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn sphere_union_with_empty_is_identity() {
        let a = BoundingSphere::new(Vec3::ONE, 2.0);
        assert_eq!(BoundingSphere::empty().union(&a), a);
        assert_eq!(a.union(&BoundingSphere::empty()), a);
    }

    #[test]
    fn transformed_sphere_scales_radius() {
        let s = BoundingSphere::new(Vec3::ZERO, 1.0);
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 3.0, 2.0),
            glam::Quat::IDENTITY,
            Vec3::new(0.0, -2.0, 0.0),
        );
        let t = s.transformed(&m);
        assert_eq!(t.center, Vec3::new(0.0, -2.0, 0.0));
        assert!((t.radius - 3.0).abs() < 1e-5);
    }

    #[test]
    fn from_points_covers_all() {
        let pts = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 0.0), Vec3::ZERO];
        let s = BoundingSphere::from_points(&pts);
        for p in pts {
            assert!(s.contains_point(p));
        }
    }
}
