//! Background asset loading.
//!
//! Requests go to a single worker thread over a channel; results are drained
//! by the owner once per frame. Nothing waits on a load unless the caller
//! explicitly asks to.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::manifest::{AssetKey, AssetKind, AssetManifest, AssetSource, Builtin};
use crate::mesh::MeshData;
use crate::texture::TextureData;
use crate::AssetError;

/// A loaded asset, shared cheaply between the scene and the renderer.
#[derive(Debug, Clone)]
pub enum Asset {
    Mesh(Arc<MeshData>),
    Texture(Arc<TextureData>),
}

impl Asset {
    pub fn as_mesh(&self) -> Option<&Arc<MeshData>> {
        match self {
            Self::Mesh(m) => Some(m),
            Self::Texture(_) => None,
        }
    }

    pub fn as_texture(&self) -> Option<&Arc<TextureData>> {
        match self {
            Self::Texture(t) => Some(t),
            Self::Mesh(_) => None,
        }
    }
}

/// Outcome of one request.
#[derive(Debug)]
pub struct LoadedAsset {
    pub key: AssetKey,
    pub source: AssetSource,
    pub result: Result<Asset, AssetError>,
    pub elapsed: Duration,
}

struct LoadRequest {
    key: AssetKey,
    source: AssetSource,
}

/// Owns the worker thread. Dropping the loader closes the request channel,
/// which ends the worker once its current load finishes.
pub struct AssetLoader {
    requests: Sender<LoadRequest>,
    results: Receiver<LoadedAsset>,
    in_flight: usize,
}

impl AssetLoader {
    pub fn spawn() -> Result<Self, AssetError> {
        let (request_tx, request_rx) = unbounded::<LoadRequest>();
        let (result_tx, result_rx) = unbounded::<LoadedAsset>();

        std::thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    let start = Instant::now();
                    let result = load_blocking(&request.key, &request.source);
                    let loaded = LoadedAsset {
                        key: request.key,
                        source: request.source,
                        result,
                        elapsed: start.elapsed(),
                    };
                    if result_tx.send(loaded).is_err() {
                        break;
                    }
                }
                tracing::debug!("asset loader worker exiting");
            })
            .map_err(AssetError::Spawn)?;

        Ok(Self {
            requests: request_tx,
            results: result_rx,
            in_flight: 0,
        })
    }

    pub fn request(&mut self, key: AssetKey, source: AssetSource) -> Result<(), AssetError> {
        tracing::debug!(%key, %source, "queueing asset load");
        self.requests
            .send(LoadRequest { key, source })
            .map_err(|_| AssetError::LoaderClosed)?;
        self.in_flight += 1;
        Ok(())
    }

    pub fn request_manifest(&mut self, manifest: &AssetManifest) -> Result<(), AssetError> {
        for (key, source) in manifest.entries() {
            self.request(key.clone(), source.clone())?;
        }
        Ok(())
    }

    /// Drain everything that finished since the last poll.
    pub fn poll(&mut self) -> Vec<LoadedAsset> {
        let done: Vec<LoadedAsset> = self.results.try_iter().collect();
        self.in_flight -= done.len().min(self.in_flight);
        done
    }

    /// Block until every outstanding request finishes or the timeout passes.
    pub fn wait_all(&mut self, timeout: Duration) -> Vec<LoadedAsset> {
        let deadline = Instant::now() + timeout;
        let mut done = Vec::new();
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(loaded) => {
                    self.in_flight -= 1;
                    done.push(loaded);
                }
                Err(_) => break,
            }
        }
        done
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

/// Load one asset on the calling thread.
pub fn load_blocking(key: &AssetKey, source: &AssetSource) -> Result<Asset, AssetError> {
    let asset = match (key.kind(), source) {
        (AssetKind::Mesh, AssetSource::Builtin(Builtin::GrassBlade)) => {
            Asset::Mesh(Arc::new(MeshData::grass_blade(5, 2.0, 0.12)))
        }
        (AssetKind::Mesh, AssetSource::Builtin(Builtin::FollowerBall)) => {
            Asset::Mesh(Arc::new(MeshData::follower_ball(1.0, 16, 24)))
        }
        (AssetKind::Texture, AssetSource::Builtin(Builtin::CheckerFloor)) => Asset::Texture(
            Arc::new(TextureData::checker(256, 8, [200, 200, 200], [120, 120, 120])),
        ),
        (AssetKind::Mesh, AssetSource::File(path)) => Asset::Mesh(Arc::new(import_gltf(path)?)),
        (AssetKind::Texture, AssetSource::File(path)) => {
            let bytes = read(path)?;
            let name = path.display().to_string();
            Asset::Texture(Arc::new(TextureData::decode(&name, &bytes)?))
        }
        (_, AssetSource::Builtin(builtin)) => {
            return Err(AssetError::WrongKind {
                key: key.to_string(),
                origin: format!("{builtin:?}"),
            });
        }
    };
    Ok(asset)
}

/// Import the first primitive of the first mesh in a glTF/GLB file.
/// Node transforms are ignored; the geometry is used as authored.
pub fn import_gltf(path: &Path) -> Result<MeshData, AssetError> {
    let (document, buffers, _images) = gltf::import(path)?;
    let mesh = document
        .meshes()
        .next()
        .ok_or_else(|| AssetError::EmptyMesh(path.display().to_string()))?;
    let primitive = mesh
        .primitives()
        .next()
        .ok_or_else(|| AssetError::EmptyMesh(path.display().to_string()))?;
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| AssetError::InvalidMesh {
            name: path.display().to_string(),
            reason: "primitive has no POSITION attribute".into(),
        })?
        .collect();

    let mut data = MeshData {
        name: mesh.name().unwrap_or("gltf_mesh").to_string(),
        positions,
        normals: reader.read_normals().map(|n| n.collect()).unwrap_or_default(),
        uvs: reader
            .read_tex_coords(0)
            .map(|uv| uv.into_f32().collect())
            .unwrap_or_default(),
        colors: reader
            .read_colors(0)
            .map(|c| c.into_rgba_f32().collect())
            .unwrap_or_default(),
        indices: reader
            .read_indices()
            .map(|i| i.into_u32().collect())
            .unwrap_or_default(),
    };
    data.fill_defaults();
    data.validate()?;
    tracing::info!(
        path = %path.display(),
        vertices = data.vertex_count(),
        indices = data.index_count(),
        "imported glTF mesh"
    );
    Ok(data)
}

fn read(path: &Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builtins_load_synchronously() {
        let blade = load_blocking(&AssetKey::GrassModel, &AssetSource::Builtin(Builtin::GrassBlade))
            .unwrap();
        assert!(blade.as_mesh().is_some());
        let floor = load_blocking(
            &AssetKey::FloorTexture,
            &AssetSource::Builtin(Builtin::CheckerFloor),
        )
        .unwrap();
        assert_eq!(floor.as_texture().map(|t| t.width), Some(256));
    }

    #[test]
    fn builtin_of_wrong_kind_is_rejected() {
        let err = load_blocking(
            &AssetKey::GrassModel,
            &AssetSource::Builtin(Builtin::CheckerFloor),
        )
        .unwrap_err();
        assert!(matches!(err, AssetError::WrongKind { .. }));
    }

    #[test]
    fn missing_file_fails_without_panicking() {
        let source = AssetSource::File(PathBuf::from("/nonexistent/floor.png"));
        let err = load_blocking(&AssetKey::FloorTexture, &source).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
        let source = AssetSource::File(PathBuf::from("/nonexistent/grass.glb"));
        assert!(load_blocking(&AssetKey::GrassModel, &source).is_err());
    }

    #[test]
    fn worker_delivers_results() {
        let mut loader = AssetLoader::spawn().unwrap();
        let manifest = AssetManifest::from_paths(&meadow_common::AssetPaths::default());
        loader.request_manifest(&manifest).unwrap();
        loader
            .request(
                AssetKey::Background,
                AssetSource::File(PathBuf::from("/nonexistent/sky.jpg")),
            )
            .unwrap();
        assert_eq!(loader.in_flight(), 4);

        let done = loader.wait_all(Duration::from_secs(10));
        assert_eq!(done.len(), 4);
        assert_eq!(loader.in_flight(), 0);
        let failures: Vec<_> = done.iter().filter(|d| d.result.is_err()).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key, AssetKey::Background);
    }

    #[test]
    fn texture_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floor.png");
        image::RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();
        let asset = load_blocking(&AssetKey::FloorTexture, &AssetSource::File(path)).unwrap();
        let tex = asset.as_texture().unwrap();
        assert_eq!((tex.width, tex.height), (8, 8));
    }
}
