use std::fmt;

use meadow_player::TrackingState;
use meadow_scene::SceneContext;
use serde::Serialize;

/// Scene inspector for developer tooling.
///
/// Read-only queries against a running scene, shared by the desktop HUD
/// and the CLI.
pub struct SceneInspector;

impl SceneInspector {
    /// Produce a summary of the scene state.
    pub fn summary(scene: &SceneContext) -> SceneSummary {
        let grass = scene.grass();
        let p = scene.follower_position();
        let target = match scene.player().state() {
            TrackingState::Idle => None,
            TrackingState::Tracking { target } => Some(target.to_array()),
        };
        SceneSummary {
            tick: scene.total_ticks(),
            frame: scene.frames(),
            elapsed: scene.elapsed(),
            instance_count: grass.map_or(0, |g| g.len()),
            instance_capacity: grass.map_or(scene.config().grass.capacity, |g| g.capacity()),
            grass_built: grass.is_some(),
            revision: grass.map_or(0, |g| g.revision()),
            grass_time: grass.map_or(0.0, |g| g.uniforms().time),
            player_position: [p.x, p.y, p.z],
            tracking_target: target,
            assets_loaded: scene.store().len(),
            assets_in_flight: scene.assets_in_flight(),
        }
    }

    /// Placed blade at `index`, if any.
    pub fn inspect_blade(scene: &SceneContext, index: usize) -> Option<BladeInfo> {
        let grass = scene.grass()?;
        if index >= grass.len() {
            return None;
        }
        let blade = grass.instances().get(index)?;
        let (axis, angle) = blade.transform.rotation.to_axis_angle();
        Some(BladeInfo {
            index,
            position: blade.transform.position.to_array(),
            yaw: angle * axis.y.signum(),
            scale: blade.transform.scale.x,
            color: blade.color,
        })
    }
}

/// Summary of scene state for the inspector.
#[derive(Debug, Clone, Serialize)]
pub struct SceneSummary {
    pub tick: u64,
    pub frame: u64,
    pub elapsed: f32,
    pub instance_count: usize,
    pub instance_capacity: usize,
    pub grass_built: bool,
    pub revision: u64,
    pub grass_time: f32,
    pub player_position: [f32; 3],
    /// `None` while the pointer ray misses the ground.
    pub tracking_target: Option<[f32; 3]>,
    pub assets_loaded: usize,
    pub assets_in_flight: usize,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.player_position;
        write!(
            f,
            "Scene: tick={} frame={} t={:.2}s grass={}/{} revision={} player=({:.2}, {:.2}, {:.2}) {}",
            self.tick,
            self.frame,
            self.elapsed,
            self.instance_count,
            self.instance_capacity,
            self.revision,
            p[0],
            p[1],
            p[2],
            if self.tracking_target.is_some() {
                "tracking"
            } else {
                "idle"
            },
        )
    }
}

/// Detailed info about a single blade.
#[derive(Debug, Clone, Serialize)]
pub struct BladeInfo {
    pub index: usize,
    pub position: [f32; 3],
    pub yaw: f32,
    pub scale: f32,
    pub color: [f32; 3],
}

impl fmt::Display for BladeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Blade [{}] pos=({:.2}, {:.2}, {:.2}) yaw={:.2} scale={:.2}",
            self.index,
            self.position[0],
            self.position[1],
            self.position[2],
            self.yaw,
            self.scale,
        )
    }
}
