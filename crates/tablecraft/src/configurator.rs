//! # Configurator — One Object per Open Viewer
//!
//! Ties the moving parts together so callers deal with parameters rather
//! than slots:
//!
//! ```text
//!  ConfiguratorParams ──► TableAssembly ──┬──► TexturePipeline.request(surface)
//!                                         └──► SceneComposer.configure(assembly)
//!
//!  every frame: update(now)
//!    TexturePipeline.poll() ──► committed image ──► SceneComposer.set_surface
//!    SceneComposer.update(now) ──► Scene
//! ```
//!
//! The viewer and the headless example both drive a [`Configurator`]; neither
//! touches the pipeline or the composer directly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::assembly::TableAssembly;
use crate::capability::RenderingCapabilityProfile;
use crate::config::{AssetConfig, ConfiguratorParams, Settings};
use crate::scene::{AssetLoader, GltfFileLoader, Scene, SceneComposer};
use crate::texture::{CommandConverter, ImageSource, LegacyConverter, StandardImageSource, TextureError, TexturePipeline};

pub struct Configurator {
    capability: RenderingCapabilityProfile,
    assets: AssetConfig,
    params: ConfiguratorParams,
    assembly: TableAssembly,
    textures: TexturePipeline,
    composer: SceneComposer,
}

impl Configurator {
    /// Build a configurator and start loading the table in `settings`.
    pub fn new(
        settings: &Settings,
        capability: RenderingCapabilityProfile,
        source: Arc<dyn ImageSource>,
        converter: Arc<dyn LegacyConverter>,
        loader: Arc<dyn AssetLoader>,
        now: Instant,
    ) -> Self {
        let textures = TexturePipeline::new(source, converter, settings.assets.clone(), capability);
        let composer = SceneComposer::new(loader, capability);
        let assembly = TableAssembly::from_params(&settings.table, &settings.assets);

        let mut configurator = Self {
            capability,
            assets: settings.assets.clone(),
            params: settings.table.clone(),
            assembly: assembly.clone(),
            textures,
            composer,
        };
        configurator.start(assembly, now);
        configurator
    }

    /// Files and HTTP for textures, glTF files for models.
    pub fn with_standard_io(
        settings: &Settings,
        capability: RenderingCapabilityProfile,
        now: Instant,
    ) -> Result<Self, TextureError> {
        Ok(Self::new(
            settings,
            capability,
            Arc::new(StandardImageSource::new()?),
            Arc::new(CommandConverter::default()),
            Arc::new(GltfFileLoader),
            now,
        ))
    }

    /// Switch to new customer parameters.
    pub fn apply(&mut self, params: ConfiguratorParams, now: Instant) {
        if params == self.params {
            return;
        }
        self.params = params;
        let assembly = TableAssembly::from_params(&self.params, &self.assets);
        self.start(assembly, now);
    }

    /// Apply a reloaded settings file. Returns true if anything changed.
    ///
    /// Viewer settings only take effect on restart and are ignored here.
    pub fn reload(&mut self, settings: &Settings, now: Instant) -> bool {
        let assets_changed = settings.assets != self.assets;
        let params_changed = settings.table != self.params;
        if !assets_changed && !params_changed {
            return false;
        }
        if assets_changed {
            log::info!("Asset settings changed; reloading the texture");
            self.assets = settings.assets.clone();
            self.textures.set_assets(self.assets.clone());
        }
        self.params = settings.table.clone();
        let assembly = TableAssembly::from_params(&self.params, &self.assets);
        self.start(assembly, now);
        true
    }

    /// Advance loads and placement. Returns true if the scene changed.
    pub fn update(&mut self, now: Instant) -> bool {
        self.textures.poll();
        self.sync_surface();
        self.composer.update(now)
    }

    /// Block on the wall clock until the texture and the placement have
    /// settled, or `timeout` passes. Returns whether the top is positioned.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.textures.wait(timeout);
        self.sync_surface();
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.composer.settle(remaining)
    }

    pub fn scene(&self) -> &Scene {
        self.composer.scene()
    }

    pub fn params(&self) -> &ConfiguratorParams {
        &self.params
    }

    pub fn assembly(&self) -> &TableAssembly {
        &self.assembly
    }

    pub fn textures(&self) -> &TexturePipeline {
        &self.textures
    }

    pub fn composer(&self) -> &SceneComposer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut SceneComposer {
        &mut self.composer
    }

    pub fn capability(&self) -> &RenderingCapabilityProfile {
        &self.capability
    }

    /// True while a texture or model is still on its way.
    pub fn is_loading(&self) -> bool {
        self.textures.is_loading() || self.composer.is_loading()
    }

    pub fn summary(&self) -> Vec<(&'static str, String)> {
        self.assembly.summary()
    }

    fn start(&mut self, assembly: TableAssembly, now: Instant) {
        log::debug!("Configuring {} top, base {:?}", assembly.shape_kind, assembly.base_style);
        self.textures.request(&assembly.surface);
        self.sync_surface();
        self.assembly = assembly.clone();
        self.composer.configure(assembly, now);
    }

    fn sync_surface(&mut self) {
        self.composer
            .set_surface(self.textures.current().cloned(), self.textures.revision());
    }
}
