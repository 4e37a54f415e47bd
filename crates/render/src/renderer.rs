use glam::{Mat4, Vec3};
use meadow_common::{Ground, PointLight, Rgb};
use meadow_field::GrassField;

use crate::camera::OrbitCamera;
use crate::frustum::Frustum;

/// Camera parameters for one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
    pub view_projection: Mat4,
}

impl RenderView {
    pub fn from_camera(camera: &OrbitCamera) -> Self {
        Self {
            eye: camera.position(),
            target: camera.target,
            fov_degrees: camera.fov_degrees,
            view_projection: camera.view_projection(),
        }
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection)
    }
}

/// Read-only snapshot of everything drawn in a frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderScene<'a> {
    pub background: Rgb,
    pub ambient: Rgb,
    pub ground: &'a Ground,
    pub lights: &'a [PointLight],
    /// Follower model matrix, if the follower is shown.
    pub follower: Option<Mat4>,
    pub grass: Option<&'a GrassField>,
    pub elapsed: f32,
    pub tick: u64,
}

/// Renderer-agnostic interface.
///
/// A renderer reads the scene snapshot and view, then produces output. It
/// never mutates scene state.
pub trait Renderer {
    type Output;

    fn render(&mut self, scene: &RenderScene<'_>, view: &RenderView) -> Self::Output;
}

/// Plain-text description of a frame, for the CLI and tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&mut self, scene: &RenderScene<'_>, view: &RenderView) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "=== Meadow (tick={}, t={:.2}s) ===\n",
            scene.tick, scene.elapsed
        ));
        out.push_str(&format!(
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}\n",
            view.eye.x, view.eye.y, view.eye.z, view.target.x, view.target.y, view.target.z,
            view.fov_degrees
        ));
        let c = scene.ground.center;
        out.push_str(&format!(
            "Ground: centre=({:.1}, {:.1}, {:.1}) radius={:.1}\n",
            c.x, c.y, c.z, scene.ground.radius
        ));
        out.push_str(&format!("Lights: {}\n", scene.lights.len()));

        match scene.follower {
            Some(m) => {
                let p = m.w_axis;
                out.push_str(&format!("Follower: pos=({:.2}, {:.2}, {:.2})\n", p.x, p.y, p.z));
            }
            None => out.push_str("Follower: hidden\n"),
        }

        match scene.grass {
            Some(field) => {
                let visible = view.frustum().intersects_sphere(&field.world_bounds());
                let p = field.uniforms().player_position;
                out.push_str(&format!(
                    "Grass: {}/{} blades, revision={}, visible={visible}\n",
                    field.len(),
                    field.capacity(),
                    field.revision()
                ));
                out.push_str(&format!(
                    "  uniforms: time={:.2} player=({:.2}, {:.2}, {:.2}) radius={:.2}\n",
                    field.uniforms().time,
                    p.x,
                    p.y,
                    p.z,
                    field.uniforms().collider_radius
                ));
            }
            None => out.push_str("Grass: not built\n"),
        }
        out
    }
}
