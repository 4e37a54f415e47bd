//! Pointer-follower controller.
//!
//! Each fixed tick casts the pointer ray at the ground. On a hit the follower
//! eases toward a point hovering above it and rolls by the distance it
//! travelled, like a ball. A miss leaves everything untouched.

use glam::{EulerRot, Mat4, Quat, Vec3};
use meadow_common::{Ground, PlayerConfig, Ray};

/// The object that chases the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Follower {
    pub position: Vec3,
    /// Euler angles (XYZ order) in radians. Only X and Z change.
    pub rotation: Vec3,
    pub scale: f32,
}

impl Follower {
    pub fn new(position: Vec3, scale: f32) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), rotation, self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackingState {
    /// The last tick's ray missed the ground (or no tick has run).
    Idle,
    Tracking { target: Vec3 },
}

#[derive(Debug, Clone)]
pub struct PlayerController {
    follower: Follower,
    state: TrackingState,
    smoothing: f32,
    hover_height: f32,
    max_roll_per_tick: Option<f32>,
    ticks: u64,
}

impl PlayerController {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            follower: Follower::new(Vec3::ZERO, config.model_scale),
            state: TrackingState::Idle,
            smoothing: config.smoothing,
            hover_height: config.hover_height,
            max_roll_per_tick: config.max_roll_per_tick,
            ticks: 0,
        }
    }

    /// Advance one fixed tick. Returns the new follower position when the
    /// ray hit the ground, `None` on a miss.
    pub fn tick(&mut self, ray: &Ray, ground: &Ground) -> Option<Vec3> {
        self.ticks += 1;
        let Some(hit) = ground.raycast(ray) else {
            self.state = TrackingState::Idle;
            return None;
        };

        let target = hit.point + Vec3::new(0.0, self.hover_height, 0.0);
        let old = self.follower.position;
        let new = old.lerp(target, self.smoothing);

        let mut roll_z = old.x - new.x;
        let mut roll_x = old.z - new.z;
        if let Some(limit) = self.max_roll_per_tick {
            roll_z = roll_z.clamp(-limit, limit);
            roll_x = roll_x.clamp(-limit, limit);
        }
        self.follower.position = new;
        self.follower.rotation.z += roll_z;
        self.follower.rotation.x -= roll_x;
        self.state = TrackingState::Tracking { target };

        tracing::trace!(?target, position = ?new, "follower tick");
        Some(new)
    }

    pub fn follower(&self) -> &Follower {
        &self.follower
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

pub fn crate_info() -> &'static str {
    "meadow-player v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_at(x: f32, z: f32) -> Ray {
        Ray::new(Vec3::new(x, 10.0, z), Vec3::NEG_Y)
    }

    #[test]
    fn starts_idle_at_origin() {
        let player = PlayerController::new(&PlayerConfig::default());
        assert_eq!(player.state(), TrackingState::Idle);
        assert_eq!(player.follower().position, Vec3::ZERO);
        assert_eq!(player.follower().scale, 0.25);
    }

    #[test]
    fn hit_moves_ten_percent_toward_hover_target() {
        let ground = Ground::default();
        let mut player = PlayerController::new(&PlayerConfig::default());
        let pos = player.tick(&down_at(4.0, -2.0), &ground).unwrap();
        let target = Vec3::new(4.0, ground.top() + 1.0, -2.0);
        assert!((pos - target * 0.1).length() < 1e-5);
        assert_eq!(player.state(), TrackingState::Tracking { target });
    }

    #[test]
    fn roll_follows_displacement() {
        let ground = Ground::default();
        let mut player = PlayerController::new(&PlayerConfig::default());
        player.tick(&down_at(4.0, -2.0), &ground);
        let rot = player.follower().rotation;
        // Moved +0.4 in x and -0.2 in z.
        assert!((rot.z - -0.4).abs() < 1e-5);
        assert!((rot.x - -0.2).abs() < 1e-5);
        assert_eq!(rot.y, 0.0);
    }

    #[test]
    fn miss_is_a_no_op() {
        let ground = Ground::default();
        let mut player = PlayerController::new(&PlayerConfig::default());
        player.tick(&down_at(1.0, 1.0), &ground);
        let before = *player.follower();
        assert!(player.tick(&down_at(100.0, 0.0), &ground).is_none());
        assert_eq!(*player.follower(), before);
        assert_eq!(player.state(), TrackingState::Idle);
        assert_eq!(player.ticks(), 2);
    }

    #[test]
    fn converges_on_target() {
        let ground = Ground::default();
        let mut player = PlayerController::new(&PlayerConfig::default());
        for _ in 0..200 {
            player.tick(&down_at(3.0, 3.0), &ground);
        }
        let target = Vec3::new(3.0, ground.top() + 1.0, 3.0);
        assert!((player.follower().position - target).length() < 1e-3);
    }

    #[test]
    fn optional_roll_clamp() {
        let ground = Ground::default();
        let config = PlayerConfig {
            max_roll_per_tick: Some(0.05),
            ..PlayerConfig::default()
        };
        let mut player = PlayerController::new(&config);
        player.tick(&down_at(20.0, 0.0), &ground);
        assert!((player.follower().rotation.z - -0.05).abs() < 1e-6);
        // Position is never clamped.
        assert!((player.follower().position.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn matrix_applies_scale() {
        let f = Follower::new(Vec3::new(1.0, 2.0, 3.0), 0.25);
        let p = f.matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.25, 2.0, 3.0)).length() < 1e-6);
    }
}
