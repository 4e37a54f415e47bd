//! Blade placement over the field disc.

use std::f32::consts::TAU;

use glam::Vec3;
use meadow_common::{PlacementPolicy, Transform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Point on the ground plane at exactly `radius` from the origin.
pub fn circle_point(theta: f32, radius: f32) -> Vec3 {
    Vec3::new(radius * theta.cos(), 0.0, radius * theta.sin())
}

/// Seeded source of blade transforms.
#[derive(Debug, Clone)]
pub struct Placer {
    policy: PlacementPolicy,
    radius: f32,
    min_scale: f32,
    max_scale: f32,
    rng: ChaCha8Rng,
}

impl Placer {
    pub fn new(
        policy: PlacementPolicy,
        radius: f32,
        scale_range: (f32, f32),
        seed: u64,
    ) -> Self {
        Self {
            policy,
            radius,
            min_scale: scale_range.0,
            max_scale: scale_range.1,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn policy(&self) -> PlacementPolicy {
        self.policy
    }

    /// Position on the ground plane according to the policy.
    pub fn next_position(&mut self) -> Vec3 {
        let theta = self.rng.random::<f32>() * TAU;
        let distance = match self.policy {
            PlacementPolicy::ProjectedSphere => {
                // Height of a uniform point on the unit sphere; only its
                // horizontal extent survives the projection.
                let u = self.rng.random::<f32>() * 2.0 - 1.0;
                (1.0 - u * u).max(0.0).sqrt() * self.radius
            }
            PlacementPolicy::Ring => self.radius,
            PlacementPolicy::AreaUniform => self.rng.random::<f32>().sqrt() * self.radius,
        };
        circle_point(theta, distance)
    }

    /// Full blade transform: position, then yaw in `[0, 2π)`, then scale in
    /// `[min, max)`.
    pub fn next_transform(&mut self) -> Transform {
        let position = self.next_position();
        let yaw = self.rng.random::<f32>() * TAU;
        let scale = self.min_scale + self.rng.random::<f32>() * (self.max_scale - self.min_scale);
        Transform::from_yaw_scale(position, yaw, scale)
    }

    /// Random 24-bit colour tag.
    pub fn next_color(&mut self) -> [f32; 3] {
        meadow_common::rgb_from_hex(self.rng.random_range(0..0x0100_0000))
    }
}
