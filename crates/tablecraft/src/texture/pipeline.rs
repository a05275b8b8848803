//! The surface-texture slot: request, poll, commit.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use super::convert::{DEFAULT_CONVERSION_TIMEOUT, LegacyConverter, is_legacy_photo};
use super::source::ImageSource;
use super::surface::{SurfaceImage, decode_surface};
use super::TextureError;
use crate::capability::RenderingCapabilityProfile;
use crate::catalog::{SurfaceSelector, resolve_surface};
use crate::config::AssetConfig;
use crate::task::{TaskOutcome, TaskSlot};

/// Where the current request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// Nothing requested, or the selector has no texture.
    #[default]
    Idle,
    Fetching,
    Converting,
    Decoding,
    Ready,
    Failed,
}

impl LoadPhase {
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Fetching | Self::Converting | Self::Decoding)
    }
}

type LoadingListener = Box<dyn FnMut(bool) + Send>;

/// One texture slot. See the [module docs](super).
pub struct TexturePipeline {
    source: Arc<dyn ImageSource>,
    converter: Arc<dyn LegacyConverter>,
    assets: AssetConfig,
    capability: RenderingCapabilityProfile,
    conversion_timeout: Duration,

    slot: TaskSlot<SurfaceImage, TextureError>,
    progress_tx: mpsc::Sender<(u64, LoadPhase)>,
    progress_rx: mpsc::Receiver<(u64, LoadPhase)>,

    requested: Option<SurfaceSelector>,
    phase: LoadPhase,
    committed: Option<Arc<SurfaceImage>>,
    /// Bumped on every commit, including commits of `None`.
    revision: u64,
    loading: bool,
    on_loading_changed: Option<LoadingListener>,
}

impl TexturePipeline {
    pub fn new(
        source: Arc<dyn ImageSource>,
        converter: Arc<dyn LegacyConverter>,
        assets: AssetConfig,
        capability: RenderingCapabilityProfile,
    ) -> Self {
        let (progress_tx, progress_rx) = mpsc::channel();
        Self {
            source,
            converter,
            assets,
            capability,
            conversion_timeout: DEFAULT_CONVERSION_TIMEOUT,
            slot: TaskSlot::new("texture"),
            progress_tx,
            progress_rx,
            requested: None,
            phase: LoadPhase::Idle,
            committed: None,
            revision: 0,
            loading: false,
            on_loading_changed: None,
        }
    }

    pub fn with_conversion_timeout(mut self, timeout: Duration) -> Self {
        self.conversion_timeout = timeout;
        self
    }

    /// Register a callback for loading-state changes. It fires only when
    /// the state actually flips, never twice in a row with the same value.
    pub fn on_loading_changed(&mut self, listener: impl FnMut(bool) + Send + 'static) {
        self.on_loading_changed = Some(Box::new(listener));
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The committed image; `None` means "show the solid fallback color".
    pub fn current(&self) -> Option<&Arc<SurfaceImage>> {
        self.committed.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn requested(&self) -> Option<&SurfaceSelector> {
        self.requested.as_ref()
    }

    /// Point the pipeline at new asset locations.
    ///
    /// Cancels the pending load and forgets the last request, so the next
    /// [`request`](Self::request) resolves again even for the same selector.
    /// The committed image and the revision counter are kept.
    pub fn set_assets(&mut self, assets: AssetConfig) {
        if assets == self.assets {
            return;
        }
        self.slot.cancel();
        self.assets = assets;
        self.requested = None;
        self.set_phase(LoadPhase::Idle);
    }

    /// Select a new surface. Cancels whatever was loading before.
    ///
    /// Re-requesting the selector that is already loading or shown is a no-op.
    pub fn request(&mut self, selector: &SurfaceSelector) {
        if self.requested.as_ref() == Some(selector) && self.phase != LoadPhase::Failed {
            return;
        }
        self.requested = Some(selector.clone());
        self.slot.cancel();

        let Some(location) = resolve_surface(selector, &self.assets) else {
            log::debug!("Surface {selector} has no texture; using its fallback color");
            self.set_phase(LoadPhase::Idle);
            self.commit(None);
            return;
        };

        let source = Arc::clone(&self.source);
        let converter = Arc::clone(&self.converter);
        let capability = self.capability;
        let timeout = self.conversion_timeout;
        let progress = self.progress_tx.clone();
        // `spawn` bumps the generation by exactly one.
        let generation = self.slot.generation() + 1;
        let label = location.to_string();
        log::debug!("Loading texture {label} (generation {generation})");

        let spawned = self.slot.spawn(move |token| {
            let report = |phase| {
                let _ = progress.send((generation, phase));
            };
            report(LoadPhase::Fetching);
            let bytes = source.fetch(&location, token)?;
            if token.is_canceled() {
                return Err(TextureError::Canceled);
            }
            let hint = location.extension();
            let bytes = if is_legacy_photo(&bytes, hint.as_deref()) {
                report(LoadPhase::Converting);
                converter.convert(&bytes, timeout, token)?
            } else {
                bytes
            };
            report(LoadPhase::Decoding);
            decode_surface(&bytes, &capability, token)
        });

        match spawned {
            Ok(_) => self.set_phase(LoadPhase::Fetching),
            Err(e) => self.fail(&label, TextureError::Spawn(e)),
        }
    }

    /// Apply progress and completions from the worker. Returns true when the
    /// committed image changed this call.
    pub fn poll(&mut self) -> bool {
        let current = self.slot.generation();
        while let Ok((generation, phase)) = self.progress_rx.try_recv() {
            if generation == current && self.slot.is_pending() {
                self.set_phase(phase);
            }
        }

        match self.slot.poll() {
            Some(TaskOutcome::Ready(image)) => {
                log::info!("Texture ready ({}x{}, {} mip levels)", image.width(), image.height(), image.mip_count());
                self.set_phase(LoadPhase::Ready);
                self.commit(Some(Arc::new(image)));
                true
            }
            Some(TaskOutcome::Failed(e)) => {
                let what = self
                    .requested
                    .as_ref()
                    .map_or_else(|| "surface".to_string(), |s| s.to_string());
                log::warn!("Texture for {what} failed: {e}; showing fallback color");
                self.set_phase(LoadPhase::Failed);
                self.commit(None);
                true
            }
            Some(TaskOutcome::Canceled) | None => false,
        }
    }

    /// Block until the current request settles or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.slot.is_pending() && std::time::Instant::now() < deadline {
            if self.poll() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        self.poll()
    }

    fn fail(&mut self, location: &str, error: TextureError) {
        log::warn!("Texture {location} failed: {error}; showing fallback color");
        self.set_phase(LoadPhase::Failed);
        self.commit(None);
    }

    fn commit(&mut self, image: Option<Arc<SurfaceImage>>) {
        self.committed = image;
        self.revision += 1;
    }

    fn set_phase(&mut self, phase: LoadPhase) {
        self.phase = phase;
        let loading = phase.is_loading();
        if loading != self.loading {
            self.loading = loading;
            if let Some(listener) = self.on_loading_changed.as_mut() {
                listener(loading);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Instant;

    use super::*;
    use crate::catalog::TextureLocation;
    use crate::task::CancelToken;
    use crate::texture::surface::png_bytes;

    const WAIT: Duration = Duration::from_secs(5);

    /// Serves PNGs whose width encodes which file was asked for. Files listed
    /// in `gates` block until the test releases them.
    struct GatedSource {
        widths: HashMap<PathBuf, u32>,
        gates: Mutex<HashMap<PathBuf, mpsc::Receiver<()>>>,
    }

    impl GatedSource {
        fn new(assets: &AssetConfig) -> Self {
            let widths = (1..=8)
                .map(|i| {
                    let Some(TextureLocation::Bundled(path)) =
                        resolve_surface(&SurfaceSelector::Local(i), assets)
                    else {
                        unreachable!("local textures resolve to bundled paths")
                    };
                    (path, i * 2)
                })
                .collect();
            Self {
                widths,
                gates: Mutex::new(HashMap::new()),
            }
        }

        fn gate(&self, index: u32, assets: &AssetConfig) -> mpsc::Sender<()> {
            let Some(TextureLocation::Bundled(path)) = resolve_surface(&SurfaceSelector::Local(index), assets) else {
                unreachable!()
            };
            let (tx, rx) = mpsc::channel();
            self.gates.lock().unwrap().insert(path, rx);
            tx
        }
    }

    impl ImageSource for GatedSource {
        fn fetch(&self, location: &TextureLocation, _token: &CancelToken) -> Result<Vec<u8>, TextureError> {
            let TextureLocation::Bundled(path) = location else {
                return Err(TextureError::RemoteDisabled(location.to_string()));
            };
            let gate = self.gates.lock().unwrap().remove(path);
            if let Some(gate) = gate {
                let _ = gate.recv();
            }
            let width = self.widths.get(path).copied().ok_or_else(|| TextureError::Io {
                location: path.display().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })?;
            Ok(png_bytes(width, 4))
        }
    }

    struct NeverConverter;

    impl LegacyConverter for NeverConverter {
        fn convert(&self, _bytes: &[u8], timeout: Duration, _token: &CancelToken) -> Result<Vec<u8>, TextureError> {
            std::thread::sleep(timeout);
            Err(TextureError::ConversionTimeout(timeout))
        }
    }

    fn assets() -> AssetConfig {
        AssetConfig {
            asset_root: PathBuf::from("/assets"),
            ..AssetConfig::default()
        }
    }

    fn pipeline(source: Arc<GatedSource>) -> TexturePipeline {
        TexturePipeline::new(source, Arc::new(NeverConverter), assets(), RenderingCapabilityProfile::desktop(8192))
    }

    #[test]
    fn last_request_wins_when_earlier_one_resolves_last() {
        let source = Arc::new(GatedSource::new(&assets()));
        let release_first = source.gate(1, &assets());
        let mut textures = pipeline(Arc::clone(&source));

        textures.request(&SurfaceSelector::Local(1));
        textures.request(&SurfaceSelector::Local(5));
        assert!(textures.wait(WAIT), "selector 5 should commit");
        assert_eq!(textures.current().map(|i| i.width()), Some(10), "texture 5 is shown");

        release_first.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(!textures.poll(), "late result for selector 1 must not commit");
        assert_eq!(textures.current().map(|i| i.width()), Some(10));
        assert_eq!(textures.phase(), LoadPhase::Ready);
    }

    #[test]
    fn previous_image_stays_until_replacement_commits() {
        let source = Arc::new(GatedSource::new(&assets()));
        let mut textures = pipeline(Arc::clone(&source));
        textures.request(&SurfaceSelector::Local(2));
        assert!(textures.wait(WAIT));
        assert_eq!(textures.current().map(|i| i.width()), Some(4));

        let release = source.gate(3, &assets());
        textures.request(&SurfaceSelector::Local(3));
        textures.poll();
        assert!(textures.is_loading());
        assert_eq!(textures.current().map(|i| i.width()), Some(4), "old image still shown");

        release.send(()).unwrap();
        assert!(textures.wait(WAIT));
        assert_eq!(textures.current().map(|i| i.width()), Some(6));
    }

    #[test]
    fn unknown_selector_commits_fallback_immediately() {
        let source = Arc::new(GatedSource::new(&assets()));
        let mut textures = pipeline(source);
        let before = textures.revision();
        textures.request(&SurfaceSelector::named("onyx"));
        assert!(textures.current().is_none());
        assert!(textures.revision() > before);
        assert_eq!(textures.phase(), LoadPhase::Idle);
    }

    #[test]
    fn conversion_timeout_falls_back_to_color() {
        let source = Arc::new(GatedSource::new(&assets()));
        let mut textures = pipeline(source).with_conversion_timeout(Duration::from_millis(100));
        // Index 8 is the bundled .heic sample.
        let start = Instant::now();
        textures.request(&SurfaceSelector::Local(8));
        assert!(textures.wait(WAIT));
        assert!(textures.current().is_none(), "timeout means fallback color");
        assert_eq!(textures.phase(), LoadPhase::Failed);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn loading_notifications_fire_once_per_transition() {
        let source = Arc::new(GatedSource::new(&assets()));
        let release = source.gate(4, &assets());
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut textures = pipeline(Arc::clone(&source));
        let sink = Arc::clone(&events);
        textures.on_loading_changed(move |loading| sink.lock().unwrap().push(loading));

        textures.request(&SurfaceSelector::Local(4));
        textures.poll();
        textures.poll();
        release.send(()).unwrap();
        assert!(textures.wait(WAIT));
        textures.poll();

        assert_eq!(*events.lock().unwrap(), vec![true, false], "Fetching/Decoding are one loading span");
    }

    #[test]
    fn new_assets_reload_the_same_selector() {
        let source = Arc::new(GatedSource::new(&assets()));
        let mut textures = pipeline(Arc::clone(&source));
        textures.request(&SurfaceSelector::Local(2));
        assert!(textures.wait(WAIT));
        let revision = textures.revision();
        let generation = textures.slot.generation();

        textures.set_assets(AssetConfig {
            asset_root: PathBuf::from("/elsewhere"),
            ..assets()
        });
        assert_eq!(textures.current().map(|i| i.width()), Some(4), "image kept until the next commit");
        textures.request(&SurfaceSelector::Local(2));
        assert_eq!(textures.slot.generation(), generation + 1, "same selector is fetched again");
        assert!(textures.wait(WAIT));

        assert!(textures.current().is_none(), "nothing is served under the new root");
        assert_eq!(textures.phase(), LoadPhase::Failed);
        assert!(textures.revision() > revision, "revision never repeats");
    }

    #[test]
    fn repeated_request_is_a_no_op() {
        let source = Arc::new(GatedSource::new(&assets()));
        let mut textures = pipeline(source);
        textures.request(&SurfaceSelector::Local(2));
        let generation = textures.slot.generation();
        textures.request(&SurfaceSelector::Local(2));
        assert_eq!(textures.slot.generation(), generation);
    }
}
