//! Asset pipeline: manifest, background loader, glTF meshes, textures.
//!
//! Assets are identified by content-addressed hashes and by the scene slot
//! ([`AssetKey`]) they fill. Every slot has a builtin stand-in so the scene
//! renders before, or without, any files on disk.

pub mod loader;
pub mod manifest;
pub mod mesh;
pub mod store;
pub mod texture;

use std::path::PathBuf;

pub use loader::{Asset, AssetLoader, LoadedAsset, import_gltf, load_blocking};
pub use manifest::{AssetKey, AssetKind, AssetManifest, AssetSource, Builtin};
pub use mesh::MeshData;
pub use store::{AssetStore, content_id};
pub use texture::{PixelFormat, TextureData};

/// Content-addressed asset ID computed from the asset data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("glTF import error: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("mesh has no geometry: {0}")]
    EmptyMesh(String),
    #[error("invalid mesh {name}: {reason}")]
    InvalidMesh { name: String, reason: String },
    #[error("{origin} cannot fill slot {key}")]
    WrongKind { key: String, origin: String },
    #[error("asset loader thread has stopped")]
    LoaderClosed,
    #[error("failed to spawn asset loader: {0}")]
    Spawn(#[source] std::io::Error),
}

pub fn crate_info() -> &'static str {
    "meadow-assets v0.1.0"
}
