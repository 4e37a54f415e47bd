//! CPU mirror of the grass vertex and fragment programs.
//!
//! Every function here matches its WGSL counterpart line for line, so tests
//! and headless tools can reason about what the GPU draws.

use glam::{Mat4, Vec2, Vec3};
use meadow_common::Rgb;
use meadow_field::GrassUniforms;

fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Lattice hash in `[0, 1)`.
pub fn hash(n: Vec2) -> f32 {
    fract((n.dot(Vec2::new(12.9898, 4.1414))).sin() * 43758.5453)
}

/// Smoothstep-weighted bilinear value noise in `[0, 1]`.
pub fn value_noise(p: Vec2) -> f32 {
    let b = p.floor();
    let f = Vec2::new(fract(p.x), fract(p.y));
    let f = f * f * (Vec2::splat(3.0) - 2.0 * f);
    let bottom = lerp(hash(b), hash(b + Vec2::X), f.x);
    let top = lerp(hash(b + Vec2::Y), hash(b + Vec2::ONE), f.x);
    lerp(bottom, top, f.y)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Output of the vertex stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacedVertex {
    /// World position after sway or push.
    pub world: Vec3,
    /// Height above the blade root, forwarded to the fragment stage.
    pub height: f32,
}

/// World position before any displacement.
pub fn rest_position(local: Vec3, instance: &Mat4, uniforms: &GrassUniforms) -> Vec3 {
    (uniforms.model * *instance).transform_point3(local)
}

/// Vertex stage: sway away from the player, pushed out inside the collider.
pub fn displace(local: Vec3, instance: &Mat4, uniforms: &GrassUniforms) -> DisplacedVertex {
    let height = local.y.max(0.0);
    let world = rest_position(local, instance, uniforms);
    let noise = value_noise(Vec2::new(local.x, local.z)) * uniforms.noise_range + uniforms.noise_floor;

    let to_player = uniforms.player_position - world;
    let distance = to_player.length();

    let sway = Vec3::new(
        uniforms.sway_amplitude * uniforms.time.cos() * noise * height,
        0.0,
        0.0,
    ) * (distance / uniforms.sway_falloff).min(1.0);

    let mut normal = to_player.normalize_or_zero();
    normal.y = normal.y.abs();
    let push = -normal * (uniforms.collider_radius - distance);

    let offset = if distance < uniforms.collider_radius {
        push
    } else {
        sway
    };
    DisplacedVertex {
        world: world + offset,
        height,
    }
}

/// Fragment stage: root-to-tip gradient by height.
///
/// The gradient parameter itself is clamped, so blades taller than
/// `color_height` hold the tip colour instead of extrapolating past it.
pub fn blade_color(height: f32, uniforms: &GrassUniforms) -> Rgb {
    let t = (height / uniforms.color_height).clamp(0.0, 1.0);
    let mut out = [0.0; 3];
    for (c, o) in out.iter_mut().enumerate() {
        *o = lerp(uniforms.root_color[c], uniforms.tip_color[c], t).clamp(0.0, 1.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn far_player() -> GrassUniforms {
        GrassUniforms {
            player_position: Vec3::new(50.0, 0.0, 50.0),
            time: 0.7,
            ..GrassUniforms::default()
        }
    }

    fn blade_at(x: f32, z: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, 0.0, z))
    }

    #[test]
    fn hash_and_noise_stay_in_unit_range() {
        for i in 0..200 {
            let p = Vec2::new(i as f32 * 0.37 - 20.0, i as f32 * -0.11 + 3.0);
            let h = hash(p);
            assert!((0.0..=1.0).contains(&h));
            let n = value_noise(p);
            assert!((0.0..=1.0).contains(&n));
        }
    }

    #[test]
    fn noise_matches_hash_on_lattice_points() {
        let p = Vec2::new(3.0, -2.0);
        assert_eq!(value_noise(p), hash(p));
    }

    #[test]
    fn root_vertices_never_sway() {
        let u = far_player();
        for local in [Vec3::ZERO, Vec3::new(0.05, 0.0, 0.0), Vec3::new(0.1, -0.3, 0.2)] {
            let out = displace(local, &blade_at(2.0, 1.0), &u);
            assert_eq!(out.world, rest_position(local, &blade_at(2.0, 1.0), &u));
            assert_eq!(out.height, 0.0);
        }
    }

    #[test]
    fn tip_sways_along_x_only() {
        let u = far_player();
        let local = Vec3::new(0.0, 2.0, 0.0);
        let rest = rest_position(local, &blade_at(2.0, 1.0), &u);
        let out = displace(local, &blade_at(2.0, 1.0), &u);
        let delta = out.world - rest;
        assert_ne!(delta.x, 0.0);
        assert_eq!(delta.y, 0.0);
        assert_eq!(delta.z, 0.0);
        let noise = value_noise(Vec2::ZERO) * 0.6 + 0.4;
        assert!((delta.x - 0.1 * 0.7_f32.cos() * noise * 2.0).abs() < 1e-5);
    }

    #[test]
    fn sway_fades_near_the_player() {
        let local = Vec3::new(0.0, 1.0, 0.0);
        let instance = blade_at(0.0, 0.0);
        let mut u = GrassUniforms {
            time: 0.0,
            ..GrassUniforms::default()
        };
        let rest = rest_position(local, &instance, &u);
        u.player_position = rest + Vec3::new(2.0, 0.0, 0.0);
        let near = displace(local, &instance, &u).world - rest;
        u.player_position = rest + Vec3::new(8.0, 0.0, 0.0);
        let far = displace(local, &instance, &u).world - rest;
        assert!((near.x - far.x * 0.5).abs() < 1e-6);
    }

    #[test]
    fn push_replaces_sway_inside_collider() {
        let local = Vec3::new(0.0, 1.0, 0.0);
        let instance = blade_at(1.0, 1.0);
        let mut u = GrassUniforms {
            time: 0.3,
            ..GrassUniforms::default()
        };
        let rest = rest_position(local, &instance, &u);
        u.player_position = rest + Vec3::new(0.5, 0.2, 0.0);

        let d = (u.player_position - rest).length();
        assert!(d < u.collider_radius);
        let mut n = (u.player_position - rest).normalize();
        n.y = n.y.abs();
        let expected = rest - n * (u.collider_radius - d);
        let out = displace(local, &instance, &u);
        assert!((out.world - expected).length() < 1e-5);
        assert!(out.world.x < rest.x);
    }

    #[test]
    fn push_normal_is_reflected_upward() {
        let local = Vec3::new(0.0, 1.0, 0.0);
        let instance = blade_at(0.0, 0.0);
        let mut u = GrassUniforms::default();
        let rest = rest_position(local, &instance, &u);
        u.player_position = rest + Vec3::new(0.0, -0.5, 0.0);
        let out = displace(local, &instance, &u);
        // Player below: the reflected normal still points up, so the blade
        // is pushed down rather than up.
        assert!(out.world.y < rest.y);
    }

    #[test]
    fn outside_collider_only_sway_applies() {
        let local = Vec3::new(0.0, 1.0, 0.0);
        let instance = blade_at(0.0, 0.0);
        let mut u = GrassUniforms {
            time: 1.0,
            ..GrassUniforms::default()
        };
        let rest = rest_position(local, &instance, &u);
        u.player_position = rest + Vec3::new(0.0, 0.0, u.collider_radius + 0.05);
        let delta = displace(local, &instance, &u).world - rest;
        assert_eq!(delta.y, 0.0);
        assert_eq!(delta.z, 0.0);
    }

    #[test]
    fn coincident_player_does_not_produce_nan() {
        let local = Vec3::new(0.0, 1.0, 0.0);
        let instance = blade_at(0.0, 0.0);
        let mut u = GrassUniforms::default();
        let rest = rest_position(local, &instance, &u);
        u.player_position = rest;
        let out = displace(local, &instance, &u);
        assert!(out.world.is_finite());
        assert_eq!(out.world, rest);
    }

    #[test]
    fn colour_rises_with_height_and_clamps() {
        let u = GrassUniforms::default();
        let mut previous = blade_color(0.0, &u);
        assert_eq!(previous, u.root_color);
        for i in 1..=20 {
            let c = blade_color(i as f32 * 0.1, &u);
            for ch in 0..3 {
                assert!(c[ch] >= previous[ch]);
            }
            previous = c;
        }
        assert_eq!(blade_color(2.0, &u), u.tip_color);
        assert_eq!(blade_color(5.0, &u), u.tip_color);
        assert_eq!(blade_color(-1.0, &u), u.root_color);
    }
}
