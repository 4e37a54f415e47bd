use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// A transform that collapses every vertex onto `position`.
    pub fn collapsed() -> Self {
        Self {
            scale: Vec3::ZERO,
            ..Self::default()
        }
    }

    /// Position, rotation about +Y, and a uniform scale.
    pub fn from_yaw_scale(position: Vec3, yaw: f32, scale: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw),
            scale: Vec3::splat(scale),
        }
    }

    /// Compose into a model matrix (scale, then rotation, then translation).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Linear RGB colour in `[0, 1]`.
pub type Rgb = [f32; 3];

/// Convert a packed `0xRRGGBB` value into linear channel fractions.
pub fn rgb_from_hex(hex: u32) -> Rgb {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// Omni light with a finite range. Contribution reaches zero at `range`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Rgb,
    pub intensity: f32,
    pub range: f32,
}

impl PointLight {
    /// Distance attenuation in `[0, 1]`.
    pub fn attenuation(&self, distance: f32) -> f32 {
        if self.range <= 0.0 {
            return 1.0;
        }
        let falloff = (1.0 - (distance / self.range).powi(4)).clamp(0.0, 1.0);
        falloff * falloff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn collapsed_transform_maps_everything_to_origin() {
        let m = Transform::collapsed().matrix();
        let p = m.transform_point3(Vec3::new(3.0, -1.0, 7.5));
        assert_eq!(p, Vec3::ZERO);
    }

    #[test]
    fn yaw_scale_transform_keeps_blade_upright() {
        let t = Transform::from_yaw_scale(Vec3::new(1.0, 0.0, 2.0), 1.3, 0.5);
        let tip = t.matrix().transform_point3(Vec3::Y);
        assert!((tip - Vec3::new(1.0, 0.5, 2.0)).length() < 1e-5);
    }

    #[test]
    fn hex_colour_channels() {
        assert_eq!(rgb_from_hex(0xff0000), [1.0, 0.0, 0.0]);
        let c = rgb_from_hex(0x8888ff);
        assert!((c[0] - 136.0 / 255.0).abs() < 1e-6);
        assert_eq!(c[2], 1.0);
    }

    #[test]
    fn light_attenuation_reaches_zero_at_range() {
        let light = PointLight {
            position: Vec3::ZERO,
            color: [1.0; 3],
            intensity: 1.0,
            range: 10.0,
        };
        assert_eq!(light.attenuation(0.0), 1.0);
        assert_eq!(light.attenuation(10.0), 0.0);
        assert_eq!(light.attenuation(25.0), 0.0);
        assert!(light.attenuation(3.0) > light.attenuation(6.0));
    }
}
