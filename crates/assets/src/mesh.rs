//! CPU-side triangle meshes and the builtin stand-in shapes.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use meadow_common::BoundingSphere;

use crate::AssetError;

/// Indexed triangle mesh with per-vertex attributes. All attribute arrays
/// have the same length once [`MeshData::fill_defaults`] has run.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Bounding sphere in the mesh's local space.
    pub fn bounds(&self) -> BoundingSphere {
        let points: Vec<Vec3> = self.positions.iter().map(|p| Vec3::from_array(*p)).collect();
        BoundingSphere::from_points(&points)
    }

    /// Pad missing attributes: up normals, zero uvs, white colours, and a
    /// sequential index list for non-indexed geometry.
    pub fn fill_defaults(&mut self) {
        let n = self.positions.len();
        if self.normals.len() != n {
            self.normals = vec![[0.0, 1.0, 0.0]; n];
        }
        if self.uvs.len() != n {
            self.uvs = vec![[0.0, 0.0]; n];
        }
        if self.colors.len() != n {
            self.colors = vec![[1.0, 1.0, 1.0, 1.0]; n];
        }
        if self.indices.is_empty() {
            self.indices = (0..n as u32).collect();
        }
    }

    /// Check that the mesh is drawable.
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.positions.is_empty() || self.indices.is_empty() {
            return Err(AssetError::EmptyMesh(self.name.clone()));
        }
        if self.indices.len() % 3 != 0 {
            return Err(AssetError::InvalidMesh {
                name: self.name.clone(),
                reason: format!("index count {} is not a multiple of 3", self.indices.len()),
            });
        }
        let n = self.positions.len() as u32;
        if let Some(bad) = self.indices.iter().find(|&&i| i >= n) {
            return Err(AssetError::InvalidMesh {
                name: self.name.clone(),
                reason: format!("index {bad} out of range for {n} vertices"),
            });
        }
        Ok(())
    }

    /// A single tapered, slightly curved blade rooted at the origin.
    /// Local height runs from 0 at the root to `height` at the tip.
    pub fn grass_blade(segments: u32, height: f32, width: f32) -> Self {
        let segments = segments.max(1);
        let mut mesh = Self::named("builtin_grass_blade");
        let lean = 0.15 * height;

        for i in 0..segments {
            let t = i as f32 / segments as f32;
            let y = t * height;
            let half = width * 0.5 * (1.0 - t);
            let z = lean * t * t;
            mesh.push_vertex([-half, y, z], [0.0, 0.0, 1.0], [0.0, t]);
            mesh.push_vertex([half, y, z], [0.0, 0.0, 1.0], [1.0, t]);
        }
        let tip = mesh.positions.len() as u32;
        mesh.push_vertex([0.0, height, lean], [0.0, 0.0, 1.0], [0.5, 1.0]);

        for i in 0..segments.saturating_sub(1) {
            let a = i * 2;
            mesh.indices
                .extend_from_slice(&[a, a + 1, a + 2, a + 2, a + 1, a + 3]);
        }
        let last = (segments - 1) * 2;
        mesh.indices.extend_from_slice(&[last, last + 1, tip]);
        mesh
    }

    /// UV sphere painted in two halves with a dark equator band, so rolling
    /// is visible.
    pub fn follower_ball(radius: f32, rings: u32, sectors: u32) -> Self {
        let rings = rings.max(2);
        let sectors = sectors.max(3);
        let mut mesh = Self::named("builtin_follower");
        let top = [0.85, 0.1, 0.1, 1.0];
        let bottom = [0.95, 0.95, 0.95, 1.0];
        let band = [0.08, 0.08, 0.08, 1.0];

        for iy in 0..=rings {
            let v = iy as f32 / rings as f32;
            let phi = v * PI;
            for ix in 0..=sectors {
                let u = ix as f32 / sectors as f32;
                let theta = u * TAU;
                let n = [
                    -theta.cos() * phi.sin(),
                    phi.cos(),
                    theta.sin() * phi.sin(),
                ];
                let color = if n[1].abs() < 0.08 {
                    band
                } else if n[1] > 0.0 {
                    top
                } else {
                    bottom
                };
                mesh.positions
                    .push([n[0] * radius, n[1] * radius, n[2] * radius]);
                mesh.normals.push(n);
                mesh.uvs.push([u, 1.0 - v]);
                mesh.colors.push(color);
            }
        }

        let stride = sectors + 1;
        for iy in 0..rings {
            for ix in 0..sectors {
                let a = iy * stride + ix + 1;
                let b = iy * stride + ix;
                let c = (iy + 1) * stride + ix;
                let d = (iy + 1) * stride + ix + 1;
                if iy != 0 {
                    mesh.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != rings - 1 {
                    mesh.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        mesh
    }

    /// Closed cylinder centred on the origin, caps facing +Y and -Y.
    pub fn cylinder(radius: f32, height: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let mut mesh = Self::named("builtin_cylinder");
        let half = height * 0.5;
        let ring = |j: u32| {
            let theta = j as f32 / segments as f32 * TAU;
            (theta.sin(), theta.cos())
        };

        // Side wall
        for j in 0..=segments {
            let (s, c) = ring(j);
            let u = j as f32 / segments as f32;
            mesh.push_vertex([radius * s, -half, radius * c], [s, 0.0, c], [u, 0.0]);
            mesh.push_vertex([radius * s, half, radius * c], [s, 0.0, c], [u, 1.0]);
        }
        for j in 0..segments {
            let b1 = j * 2;
            let t1 = b1 + 1;
            let b2 = b1 + 2;
            let t2 = b1 + 3;
            mesh.indices.extend_from_slice(&[b1, b2, t1, t1, b2, t2]);
        }

        // Caps
        for (y, ny) in [(half, 1.0_f32), (-half, -1.0)] {
            let centre = mesh.positions.len() as u32;
            mesh.push_vertex([0.0, y, 0.0], [0.0, ny, 0.0], [0.5, 0.5]);
            for j in 0..=segments {
                let (s, c) = ring(j);
                mesh.push_vertex(
                    [radius * s, y, radius * c],
                    [0.0, ny, 0.0],
                    [s * 0.5 + 0.5, c * 0.5 * ny + 0.5],
                );
            }
            for j in 0..segments {
                let p1 = centre + 1 + j;
                let p2 = p1 + 1;
                if ny > 0.0 {
                    mesh.indices.extend_from_slice(&[centre, p1, p2]);
                } else {
                    mesh.indices.extend_from_slice(&[centre, p2, p1]);
                }
            }
        }
        mesh
    }

    fn named(name: &str) -> Self {
        Self {
            name: name.into(),
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            colors: Vec::new(),
            indices: Vec::new(),
        }
    }

    fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) {
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        self.colors.push([1.0, 1.0, 1.0, 1.0]);
    }
}
