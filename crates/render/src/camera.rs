use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use meadow_common::{CameraConfig, Ray};

/// Polar angle keeps this far from the poles so `look_at` stays defined.
const POLE_EPSILON: f32 = 1e-3;

/// Perspective camera orbiting a target, with damped rotation.
///
/// Input accumulates into pending deltas; [`OrbitCamera::update`] applies a
/// fraction of them each frame. Camera motion lives entirely on the UI side.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    radius: f32,
    /// Azimuth around +Y, measured from +Z toward +X.
    theta: f32,
    /// Angle down from +Y.
    phi: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    damping: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    min_distance: f32,
    max_distance: f32,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let offset = config.position - config.target;
        let radius = offset.length().max(f32::EPSILON);
        let theta = offset.x.atan2(offset.z);
        let phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        Self {
            target: config.target,
            radius,
            theta,
            phi,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
            fov_degrees: config.fov_degrees,
            aspect,
            near: config.near,
            far: config.far,
            damping: config.damping_factor.clamp(f32::EPSILON, 1.0),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
        }
    }

    pub fn position(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + self.radius
                * Vec3::new(
                    sin_phi * self.theta.sin(),
                    self.phi.cos(),
                    sin_phi * self.theta.cos(),
                )
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Queue a rotation from a pointer drag, in pixels.
    pub fn orbit(&mut self, delta: Vec2) {
        self.pending_theta -= delta.x * self.rotate_speed;
        self.pending_phi -= delta.y * self.rotate_speed;
    }

    /// Queue a zoom. Positive notches move closer.
    pub fn zoom(&mut self, notches: f32) {
        self.pending_scale *= self.zoom_speed.powf(notches);
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
            tracing::debug!(aspect = self.aspect, "camera aspect updated");
        }
    }

    /// Apply one frame of damped motion. Returns whether the camera moved.
    pub fn update(&mut self) -> bool {
        let before = (self.theta, self.phi, self.radius);

        self.theta += self.pending_theta * self.damping;
        self.phi = (self.phi + self.pending_phi * self.damping)
            .clamp(POLE_EPSILON, std::f32::consts::PI - POLE_EPSILON);
        self.radius = (self.radius * self.pending_scale).clamp(self.min_distance, self.max_distance);

        self.pending_theta *= 1.0 - self.damping;
        self.pending_phi *= 1.0 - self.damping;
        self.pending_scale = 1.0;
        if self.pending_theta.abs() < 1e-6 {
            self.pending_theta = 0.0;
        }
        if self.pending_phi.abs() < 1e-6 {
            self.pending_phi = 0.0;
        }

        before != (self.theta, self.phi, self.radius)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the eye through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let far = inverse * glam::Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let far = far.xyz() / far.w;
        let eye = self.position();
        Ray::new(eye, far - eye)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meadow_common::Ground;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&CameraConfig::default(), 16.0 / 9.0)
    }

    #[test]
    fn starts_at_configured_position() {
        let cam = camera();
        assert!((cam.position() - Vec3::new(-5.0, 5.0, 7.0)).length() < 1e-4);
        assert!(!cam.view_projection().col(0).x.is_nan());
    }

    #[test]
    fn centre_ray_points_at_target() {
        let cam = camera();
        let ray = cam.ray_from_ndc(Vec2::ZERO);
        let to_target = (cam.target - cam.position()).normalize();
        assert!(ray.direction.dot(to_target) > 0.99999);
    }

    #[test]
    fn centre_ray_hits_ground_centre() {
        let cam = camera();
        let hit = Ground::default()
            .raycast(&cam.ray_from_ndc(Vec2::ZERO))
            .expect("hit");
        assert!((hit.point - Vec3::new(0.0, -2.0, 0.0)).length() < 0.02);
    }

    #[test]
    fn corner_rays_diverge_with_aspect() {
        let mut cam = camera();
        let narrow = cam.ray_from_ndc(Vec2::new(1.0, 0.0)).direction;
        cam.set_aspect(3000, 1000);
        let wide = cam.ray_from_ndc(Vec2::new(1.0, 0.0)).direction;
        let centre = cam.ray_from_ndc(Vec2::ZERO).direction;
        assert!(wide.dot(centre) < narrow.dot(centre));
        assert!((cam.aspect - 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_size_resize_keeps_aspect() {
        let mut cam = camera();
        cam.set_aspect(0, 600);
        assert!((cam.aspect - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn damped_orbit_converges() {
        let mut cam = camera();
        let start = cam.theta;
        cam.orbit(Vec2::new(-100.0, 0.0));
        assert!(cam.update());
        let first = cam.theta - start;
        assert!((first - 100.0 * 0.005 * 0.05).abs() < 1e-5);
        for _ in 0..1000 {
            cam.update();
        }
        assert!((cam.theta - start - 0.5).abs() < 1e-3);
        assert!(!cam.update());
        assert!((cam.distance() - (cam.position() - cam.target).length()).abs() < 1e-4);
    }

    #[test]
    fn polar_angle_never_reaches_pole() {
        let mut cam = camera();
        cam.orbit(Vec2::new(0.0, 1.0e6));
        for _ in 0..100 {
            cam.update();
        }
        assert!(cam.phi >= POLE_EPSILON);
        assert!(!cam.view_matrix().col(0).x.is_nan());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = camera();
        cam.zoom(500.0);
        cam.update();
        assert!((cam.distance() - 1.0).abs() < 1e-5);
        cam.zoom(-500.0);
        cam.update();
        assert!((cam.distance() - 100.0).abs() < 1e-3);
    }
}
