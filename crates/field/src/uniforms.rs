use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use meadow_common::{GrassConfig, Rgb};

/// Values shared by every grass vertex in a frame. The scene is the only
/// writer; the GPU program and the CPU reference read them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrassUniforms {
    /// Batch model matrix.
    pub model: Mat4,
    /// Seconds since the field was built.
    pub time: f32,
    pub player_position: Vec3,
    pub collider_radius: f32,
    pub sway_amplitude: f32,
    pub sway_falloff: f32,
    pub noise_floor: f32,
    pub noise_range: f32,
    pub color_height: f32,
    pub root_color: Rgb,
    pub tip_color: Rgb,
}

impl GrassUniforms {
    pub fn from_config(config: &GrassConfig) -> Self {
        Self {
            model: Mat4::from_translation(Vec3::new(0.0, config.height_offset, 0.0)),
            time: 0.0,
            player_position: config.initial_player_position,
            collider_radius: config.collider_radius,
            sway_amplitude: config.sway_amplitude,
            sway_falloff: config.sway_falloff,
            noise_floor: config.noise_floor,
            noise_range: config.noise_range,
            color_height: config.color_height,
            root_color: config.root_color,
            tip_color: config.tip_color,
        }
    }

    pub fn to_raw(&self) -> GrassUniformsRaw {
        GrassUniformsRaw {
            model: self.model.to_cols_array_2d(),
            player_position: self.player_position.to_array(),
            time: self.time,
            collider_radius: self.collider_radius,
            sway_amplitude: self.sway_amplitude,
            sway_falloff: self.sway_falloff,
            color_height: self.color_height,
            noise_floor: self.noise_floor,
            noise_range: self.noise_range,
            _pad: [0.0; 2],
            root_color: [self.root_color[0], self.root_color[1], self.root_color[2], 1.0],
            tip_color: [self.tip_color[0], self.tip_color[1], self.tip_color[2], 1.0],
        }
    }
}

impl Default for GrassUniforms {
    fn default() -> Self {
        Self::from_config(&GrassConfig::default())
    }
}

/// GPU layout of [`GrassUniforms`], matching the WGSL `GrassUniforms` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GrassUniformsRaw {
    pub model: [[f32; 4]; 4],
    pub player_position: [f32; 3],
    pub time: f32,
    pub collider_radius: f32,
    pub sway_amplitude: f32,
    pub sway_falloff: f32,
    pub color_height: f32,
    pub noise_floor: f32,
    pub noise_range: f32,
    pub _pad: [f32; 2],
    pub root_color: [f32; 4],
    pub tip_color: [f32; 4],
}

/// Per-instance vertex data: blade matrix plus colour tag.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_layout_sizes() {
        assert_eq!(std::mem::size_of::<GrassUniformsRaw>(), 144);
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 80);
    }

    #[test]
    fn defaults_follow_config() {
        let u = GrassUniforms::default();
        assert_eq!(u.player_position, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(u.collider_radius, 1.1);
        assert_eq!(u.model.w_axis.y, -2.0);
        let raw = u.to_raw();
        assert_eq!(raw.player_position, [0.0, -1.0, 0.0]);
        assert_eq!(raw.model[3][1], -2.0);
        assert_eq!(raw.tip_color[3], 1.0);
    }
}
