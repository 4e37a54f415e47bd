//! Content-addressed cache of loaded assets.
//!
//! Assets are indexed by a hash of their decoded contents, so two slots that
//! resolve to identical data share one entry. Slots map onto ids; replacing a
//! slot's asset leaves other slots untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::loader::Asset;
use crate::manifest::AssetKey;
use crate::mesh::MeshData;
use crate::texture::TextureData;
use crate::AssetId;

#[derive(Debug, Default)]
pub struct AssetStore {
    assets: BTreeMap<AssetId, Asset>,
    slots: BTreeMap<AssetKey, AssetId>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `asset` into `key`'s slot and return its content id. Returns the
    /// previous id for the slot if it changed.
    pub fn insert(&mut self, key: AssetKey, asset: Asset) -> (AssetId, Option<AssetId>) {
        let id = content_id(&asset);
        self.assets.entry(id).or_insert(asset);
        let previous = self.slots.insert(key, id).filter(|old| *old != id);
        if let Some(old) = previous {
            if !self.slots.values().any(|v| *v == old) {
                self.assets.remove(&old);
            }
        }
        (id, previous)
    }

    pub fn id(&self, key: &AssetKey) -> Option<AssetId> {
        self.slots.get(key).copied()
    }

    pub fn get(&self, key: &AssetKey) -> Option<&Asset> {
        self.slots.get(key).and_then(|id| self.assets.get(id))
    }

    pub fn get_by_id(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    pub fn mesh(&self, key: &AssetKey) -> Option<&Arc<MeshData>> {
        self.get(key).and_then(Asset::as_mesh)
    }

    pub fn texture(&self, key: &AssetKey) -> Option<&Arc<TextureData>> {
        self.get(key).and_then(Asset::as_texture)
    }

    pub fn keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.slots.keys()
    }

    /// Number of distinct assets held.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Hash of an asset's decoded contents.
pub fn content_id(asset: &Asset) -> AssetId {
    let mut hasher = Sha256::new();
    match asset {
        Asset::Mesh(mesh) => {
            hasher.update(b"mesh");
            for p in &mesh.positions {
                p.iter().for_each(|v| hasher.update(v.to_le_bytes()));
            }
            for n in &mesh.normals {
                n.iter().for_each(|v| hasher.update(v.to_le_bytes()));
            }
            for uv in &mesh.uvs {
                uv.iter().for_each(|v| hasher.update(v.to_le_bytes()));
            }
            for c in &mesh.colors {
                c.iter().for_each(|v| hasher.update(v.to_le_bytes()));
            }
            for i in &mesh.indices {
                hasher.update(i.to_le_bytes());
            }
        }
        Asset::Texture(tex) => {
            hasher.update(b"texture");
            hasher.update(tex.width.to_le_bytes());
            hasher.update(tex.height.to_le_bytes());
            hasher.update([tex.format.bytes_per_pixel() as u8]);
            hasher.update(&tex.bytes);
        }
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    AssetId(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(a: u8) -> Asset {
        Asset::Texture(Arc::new(TextureData::checker(8, 2, [a, a, a], [0, 0, 0])))
    }

    #[test]
    fn identical_content_is_stored_once() {
        let mut store = AssetStore::new();
        let (a, _) = store.insert(AssetKey::FloorTexture, checker(200));
        let (b, _) = store.insert(AssetKey::DebugTexture("copy".into()), checker(200));
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert!(store.texture(&AssetKey::DebugTexture("copy".into())).is_some());
    }

    #[test]
    fn replacing_a_slot_drops_unreferenced_content() {
        let mut store = AssetStore::new();
        let (first, prev) = store.insert(AssetKey::FloorTexture, checker(200));
        assert!(prev.is_none());
        let (second, prev) = store.insert(AssetKey::FloorTexture, checker(50));
        assert_ne!(first, second);
        assert_eq!(prev, Some(first));
        assert_eq!(store.len(), 1);
        assert!(store.get_by_id(first).is_none());
    }

    #[test]
    fn reinserting_same_content_reports_no_change() {
        let mut store = AssetStore::new();
        store.insert(AssetKey::FloorTexture, checker(200));
        let (_, prev) = store.insert(AssetKey::FloorTexture, checker(200));
        assert!(prev.is_none());
    }

    #[test]
    fn kind_accessors() {
        let mut store = AssetStore::new();
        store.insert(
            AssetKey::GrassModel,
            Asset::Mesh(Arc::new(MeshData::grass_blade(3, 1.0, 0.1))),
        );
        assert!(store.mesh(&AssetKey::GrassModel).is_some());
        assert!(store.texture(&AssetKey::GrassModel).is_none());
        assert!(store.get(&AssetKey::PlayerModel).is_none());
        assert_eq!(store.keys().count(), 1);
    }
}
