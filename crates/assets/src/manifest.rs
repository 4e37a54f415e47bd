use std::fmt;
use std::path::PathBuf;

use meadow_common::AssetPaths;

/// Logical slot an asset fills in the scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKey {
    GrassModel,
    PlayerModel,
    FloorTexture,
    Background,
    Environment,
    DebugTexture(String),
}

impl AssetKey {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::GrassModel | Self::PlayerModel => AssetKind::Mesh,
            _ => AssetKind::Texture,
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GrassModel => write!(f, "grass_model"),
            Self::PlayerModel => write!(f, "player_model"),
            Self::FloorTexture => write!(f, "floor_texture"),
            Self::Background => write!(f, "background"),
            Self::Environment => write!(f, "environment"),
            Self::DebugTexture(name) => write!(f, "debug_texture:{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Mesh,
    Texture,
}

/// Procedural stand-ins available without any files on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    GrassBlade,
    FollowerBall,
    CheckerFloor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Builtin(Builtin),
    File(PathBuf),
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(b) => write!(f, "builtin:{b:?}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Everything the scene asks the loader for, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetManifest {
    entries: Vec<(AssetKey, AssetSource)>,
}

impl AssetManifest {
    /// Map configured paths onto sources. Models and the floor fall back to
    /// builtins; background and environment are simply omitted.
    pub fn from_paths(paths: &AssetPaths) -> Self {
        let mut manifest = Self::default();
        manifest.push(
            AssetKey::FloorTexture,
            file_or(&paths.floor_texture, Builtin::CheckerFloor),
        );
        for (name, path) in &paths.debug_textures {
            manifest.push(
                AssetKey::DebugTexture(name.clone()),
                AssetSource::File(path.clone()),
            );
        }
        if let Some(path) = &paths.background {
            manifest.push(AssetKey::Background, AssetSource::File(path.clone()));
        }
        if let Some(path) = &paths.environment {
            manifest.push(AssetKey::Environment, AssetSource::File(path.clone()));
        }
        manifest.push(
            AssetKey::PlayerModel,
            file_or(&paths.player_model, Builtin::FollowerBall),
        );
        manifest.push(
            AssetKey::GrassModel,
            file_or(&paths.grass_model, Builtin::GrassBlade),
        );
        manifest
    }

    pub fn push(&mut self, key: AssetKey, source: AssetSource) {
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, source));
    }

    pub fn get(&self, key: &AssetKey) -> Option<&AssetSource> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn entries(&self) -> &[(AssetKey, AssetSource)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn file_or(path: &Option<PathBuf>, builtin: Builtin) -> AssetSource {
    match path {
        Some(p) => AssetSource::File(p.clone()),
        None => AssetSource::Builtin(builtin),
    }
}
