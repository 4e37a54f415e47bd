use std::sync::Arc;
use std::time::Duration;

use glam::{Mat4, Vec2, Vec3};
use meadow_assets::{
    Asset, AssetError, AssetKey, AssetLoader, AssetManifest, AssetStore, LoadedAsset, MeshData,
    TextureData, load_blocking,
};
use meadow_common::{ConfigError, Ground, PointLight, Rgb, SceneConfig};
use meadow_field::GrassField;
use meadow_input::Action;
use meadow_player::PlayerController;
use meadow_render::{OrbitCamera, RenderScene, RenderView};

use crate::ticker::FixedTicker;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// A loaded asset the renderer has to pick up.
#[derive(Debug, Clone)]
pub enum AssetChange {
    GrassMesh(Arc<MeshData>),
    FollowerMesh(Arc<MeshData>),
    FloorTexture(Arc<TextureData>),
    Background(Arc<TextureData>),
    /// The environment map only feeds the ambient term.
    Ambient(Rgb),
    DebugTexture(String),
}

/// What one call to [`SceneContext::frame`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub actions: usize,
    pub ticks: u32,
    pub grass_changed: bool,
    pub camera_moved: bool,
}

/// Everything the running scene owns, passed explicitly to whoever drives
/// it. Only the UI thread touches it; the asset worker talks back through
/// its channel.
pub struct SceneContext {
    config: SceneConfig,
    camera: OrbitCamera,
    ground: Ground,
    lights: Vec<PointLight>,
    background: Rgb,
    ambient: Rgb,
    player: PlayerController,
    pointer: Vec2,
    pending: Vec<Action>,
    ticker: FixedTicker,
    grass: Option<GrassField>,
    /// Seconds since the grass field was built.
    grass_clock: f32,
    elapsed: f32,
    frames: u64,
    overlay: bool,
    manifest: AssetManifest,
    store: AssetStore,
    loader: Option<AssetLoader>,
}

impl SceneContext {
    pub fn new(config: SceneConfig) -> Result<Self, SceneError> {
        config.validate()?;
        let aspect = config.window.width.max(1) as f32 / config.window.height.max(1) as f32;
        let camera = OrbitCamera::new(&config.camera, aspect);
        let player = PlayerController::new(&config.player);
        let ticker = FixedTicker::new(config.player.tick_hz);
        let manifest = AssetManifest::from_paths(&config.assets);

        tracing::info!(
            capacity = config.grass.capacity,
            count = config.grass.count,
            assets = manifest.len(),
            "scene context created"
        );

        Ok(Self {
            ground: config.ground.disc,
            lights: config.lighting.lights.clone(),
            background: config.lighting.background_color,
            ambient: config.lighting.fallback_ambient,
            camera,
            player,
            pointer: Vec2::ZERO,
            pending: Vec::new(),
            ticker,
            grass: None,
            grass_clock: 0.0,
            elapsed: 0.0,
            frames: 0,
            overlay: true,
            manifest,
            store: AssetStore::new(),
            loader: None,
            config,
        })
    }

    /// Spawn the loader thread and queue every manifest entry.
    pub fn start_loading(&mut self) -> Result<(), SceneError> {
        let mut loader = AssetLoader::spawn()?;
        loader.request_manifest(&self.manifest)?;
        self.loader = Some(loader);
        Ok(())
    }

    /// Apply whatever the loader finished since the last call.
    pub fn poll_assets(&mut self) -> Vec<AssetChange> {
        let done = match self.loader.as_mut() {
            Some(loader) => loader.poll(),
            None => return Vec::new(),
        };
        self.apply_all(done)
    }

    /// Wait for outstanding background loads, up to `timeout`.
    pub fn wait_for_assets(&mut self, timeout: Duration) -> Vec<AssetChange> {
        let done = match self.loader.as_mut() {
            Some(loader) => loader.wait_all(timeout),
            None => return Vec::new(),
        };
        self.apply_all(done)
    }

    /// Load the whole manifest on the calling thread.
    pub fn load_all_blocking(&mut self) -> Vec<AssetChange> {
        let done: Vec<LoadedAsset> = self
            .manifest
            .entries()
            .iter()
            .map(|(key, source)| {
                let start = std::time::Instant::now();
                LoadedAsset {
                    key: key.clone(),
                    source: source.clone(),
                    result: load_blocking(key, source),
                    elapsed: start.elapsed(),
                }
            })
            .collect();
        self.apply_all(done)
    }

    fn apply_all(&mut self, done: Vec<LoadedAsset>) -> Vec<AssetChange> {
        done.into_iter()
            .filter_map(|loaded| self.apply_loaded_asset(loaded))
            .collect()
    }

    /// Store a finished load and update the scene. Failures are logged and
    /// leave the feature out.
    pub fn apply_loaded_asset(&mut self, loaded: LoadedAsset) -> Option<AssetChange> {
        let LoadedAsset {
            key,
            source,
            result,
            elapsed,
        } = loaded;
        let asset = match result {
            Ok(asset) => asset,
            Err(e) => {
                tracing::warn!(%key, %source, "asset load failed: {e}");
                return None;
            }
        };
        let (id, _) = self.store.insert(key.clone(), asset.clone());
        tracing::info!(%key, %source, %id, ?elapsed, "asset loaded");

        match (key, asset) {
            (AssetKey::GrassModel, Asset::Mesh(mesh)) => {
                self.build_grass(&mesh);
                Some(AssetChange::GrassMesh(mesh))
            }
            (AssetKey::PlayerModel, Asset::Mesh(mesh)) => Some(AssetChange::FollowerMesh(mesh)),
            (AssetKey::FloorTexture, Asset::Texture(tex)) => Some(AssetChange::FloorTexture(tex)),
            (AssetKey::Background, Asset::Texture(tex)) => Some(AssetChange::Background(tex)),
            (AssetKey::Environment, Asset::Texture(tex)) => {
                self.ambient = tex.mean_rgb();
                tracing::debug!(ambient = ?self.ambient, "ambient from environment map");
                Some(AssetChange::Ambient(self.ambient))
            }
            (AssetKey::DebugTexture(name), Asset::Texture(_)) => {
                Some(AssetChange::DebugTexture(name))
            }
            (key, _) => {
                tracing::warn!(%key, "asset kind does not match its slot");
                None
            }
        }
    }

    /// Build the field in one batch from the blade mesh bounds.
    fn build_grass(&mut self, blade: &MeshData) {
        match GrassField::build(&self.config.grass, blade.bounds()) {
            Ok(field) => {
                self.grass = Some(field);
                self.grass_clock = 0.0;
            }
            Err(e) => tracing::warn!("grass field not built: {e}"),
        }
    }

    /// Queue an input action for the next frame.
    pub fn apply(&mut self, action: Action) {
        self.pending.push(action);
    }

    /// Run one frame: input actions, due fixed ticks, grass update, then
    /// camera damping. Rendering reads the result afterwards.
    pub fn frame(&mut self, dt: f32) -> FrameReport {
        let _span = tracing::trace_span!("frame", n = self.frames).entered();
        let mut report = FrameReport::default();

        let actions = std::mem::take(&mut self.pending);
        report.actions = actions.len();
        for action in actions {
            self.handle_action(action);
        }

        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        report.ticks = self.ticker.advance(dt);
        for _ in 0..report.ticks {
            self.player_tick();
        }

        self.elapsed += dt;
        if let Some(grass) = self.grass.as_mut() {
            self.grass_clock += dt;
            report.grass_changed = grass.update(self.grass_clock);
        }

        report.camera_moved = self.camera.update();
        self.frames += 1;
        report
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Point(ndc) => self.pointer = ndc,
            Action::Orbit(delta) => self.camera.orbit(delta),
            Action::Zoom(notches) => self.camera.zoom(notches),
            Action::Resize { width, height } => self.camera.set_aspect(width, height),
            Action::ToggleOverlay => self.overlay = !self.overlay,
        }
    }

    fn player_tick(&mut self) {
        let ray = self.camera.ray_from_ndc(self.pointer);
        if let Some(position) = self.player.tick(&ray, &self.ground) {
            if let Some(grass) = self.grass.as_mut() {
                grass.set_player_position(position);
            }
        }
    }

    /// Snapshot for renderers.
    pub fn render_scene(&self) -> RenderScene<'_> {
        RenderScene {
            background: self.background,
            ambient: self.ambient,
            ground: &self.ground,
            lights: &self.lights,
            follower: self.follower_matrix(),
            grass: self.grass.as_ref(),
            elapsed: self.elapsed,
            tick: self.ticker.total_ticks(),
        }
    }

    pub fn render_view(&self) -> RenderView {
        RenderView::from_camera(&self.camera)
    }

    pub fn follower_matrix(&self) -> Option<Mat4> {
        self.config
            .player
            .visible
            .then(|| self.player.follower().matrix())
    }

    pub fn follower_position(&self) -> Vec3 {
        self.player.follower().position
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn ground(&self) -> &Ground {
        &self.ground
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn grass(&self) -> Option<&GrassField> {
        self.grass.as_ref()
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn ambient(&self) -> Rgb {
        self.ambient
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn assets_in_flight(&self) -> usize {
        self.loader.as_ref().map_or(0, AssetLoader::in_flight)
    }

    pub fn total_ticks(&self) -> u64 {
        self.ticker.total_ticks()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay
    }
}
