//! The scene composer: base asset, top, materials and placement.
//!
//! ```text
//!                     configure(new key)
//!        ┌──────────────────────────────────────────┐
//!        ▼                                          │
//!   Unpositioned ──(no base)──────────────► Positioned { Ground }
//!        │
//!        │ (base)
//!        ▼          extent empty, attempts left
//!   Measuring ◄──────────────┐
//!        │  every interval   │
//!        ├───────────────────┘
//!        ├──(extent ok)────────────────────► Positioned { Measured }
//!        └──(attempts exhausted)───────────► Positioned { Fallback }
//! ```
//!
//! The composer never sleeps or spawns timers. Callers pass the current
//! time into [`configure`](SceneComposer::configure) and
//! [`update`](SceneComposer::update), so the retry schedule is a pure
//! function of the times it is given.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::asset::{AssetError, AssetLoader, AssetTemplate};
use super::node::{Material, NodeRole, Scene, SceneNode};
use crate::assembly::{PlacementKey, TableAssembly};
use crate::capability::RenderingCapabilityProfile;
use crate::geometry::outline::CM_PER_M;
use crate::geometry::shapes::{cuboid, cylinder};
use crate::geometry::{Mesh, ShapeSpec, build_top_solid};
use crate::math::{BoundingExtent, Mat4, Rgb, Transform, Vec3};
use crate::task::{TaskOutcome, TaskSlot};
use crate::texture::SurfaceImage;

/// Color of every base: a very dark, matte gray.
pub const BASE_COLOR: Rgb = Rgb::hex(0x1A1A1A);
const BASE_METALLIC: f32 = 0.1;
const BASE_ROUGHNESS: f32 = 0.9;

const TOP_METALLIC: f32 = 0.1;
const TOP_ROUGHNESS: f32 = 0.3;

/// Stand-in top while a model loads or after it failed (meters).
const PLACEHOLDER_TOP_SIZE: Vec3 = Vec3::new(2.0, 0.1, 1.0);
const PLACEHOLDER_BASE_RADIUS: f32 = 0.1;
const PLACEHOLDER_BASE_HEIGHT: f32 = 1.0;

/// How often and how many times an empty base extent is re-measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(150),
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementSource {
    /// No base: the top lies on the floor.
    Ground,
    /// Flush on the measured base.
    Measured,
    /// The base never produced a usable extent.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Unpositioned,
    Measuring { attempts: u32, next_attempt: Instant },
    Positioned { support_height: f32, source: PlacementSource },
}

enum BaseState {
    Absent,
    Loading,
    Ready {
        parts: Vec<Arc<Mesh>>,
        transform: Mat4,
    },
}

enum TopState {
    Generated(Arc<Mesh>),
    Loading,
    Model(Arc<AssetTemplate>, Vec<Arc<Mesh>>),
    Placeholder,
}

type PositionedListener = Box<dyn FnMut() + Send>;

pub struct SceneComposer {
    loader: Arc<dyn AssetLoader>,
    capability: RenderingCapabilityProfile,
    retry: RetryPolicy,

    assembly: Option<TableAssembly>,
    key: Option<PlacementKey>,
    base_slot: TaskSlot<AssetTemplate, AssetError>,
    top_slot: TaskSlot<AssetTemplate, AssetError>,
    base: BaseState,
    top: TopState,
    placeholder_top: Arc<Mesh>,
    placement: Placement,

    surface: Option<Arc<SurfaceImage>>,
    surface_revision: u64,

    scene: Scene,
    dirty: bool,
    on_positioned: Option<PositionedListener>,
}

impl SceneComposer {
    pub fn new(loader: Arc<dyn AssetLoader>, capability: RenderingCapabilityProfile) -> Self {
        Self {
            loader,
            capability,
            retry: RetryPolicy::default(),
            assembly: None,
            key: None,
            base_slot: TaskSlot::new("base-asset"),
            top_slot: TaskSlot::new("top-asset"),
            base: BaseState::Absent,
            top: TopState::Placeholder,
            placeholder_top: Arc::new(cuboid(PLACEHOLDER_TOP_SIZE)),
            placement: Placement::Unpositioned,
            surface: None,
            surface_revision: 0,
            scene: Scene::default(),
            dirty: false,
            on_positioned: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Called each time the top settles into a position.
    pub fn on_positioned(&mut self, listener: impl FnMut() + Send + 'static) {
        self.on_positioned = Some(Box::new(listener));
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn is_positioned(&self) -> bool {
        matches!(self.placement, Placement::Positioned { .. })
    }

    pub fn assembly(&self) -> Option<&TableAssembly> {
        self.assembly.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.base_slot.is_pending() || self.top_slot.is_pending()
    }

    /// World-space height of the top's origin, once positioned.
    pub fn top_height(&self) -> Option<f32> {
        let assembly = self.assembly.as_ref()?;
        match self.placement {
            Placement::Positioned { support_height, source } => Some(match source {
                PlacementSource::Ground | PlacementSource::Fallback => assembly.thickness() * 0.5,
                PlacementSource::Measured => support_height - self.top_local_bounds(assembly).min.y,
            }),
            _ => None,
        }
    }

    /// Switch to a new assembly.
    ///
    /// The generated top is rebuilt every time. Assets reload only when
    /// their path changes, and placement restarts only when the
    /// [`PlacementKey`] changes.
    pub fn configure(&mut self, assembly: TableAssembly, now: Instant) {
        let key = assembly.placement_key();
        let previous = self.key.replace(key.clone());
        let key_changed = previous.as_ref() != Some(&key);

        if previous.as_ref().map(|k| &k.base_path) != Some(&key.base_path) {
            self.start_base(key.base_path.as_deref());
        }
        if previous.as_ref().map(|k| &k.top_path) != Some(&key.top_path) {
            self.start_top(key.top_path.as_deref());
        }

        if assembly.top_path.is_none() {
            let solid = build_top_solid(
                assembly.shape.as_ref(),
                assembly.thickness_mm,
                assembly.edge_profile,
                &self.capability,
            );
            if solid.is_fallback {
                log::warn!("No outline for a {} top; showing the flat stand-in", assembly.shape_kind);
            }
            self.top = TopState::Generated(Arc::new(solid.mesh));
        } else if let TopState::Model(template, _) = &self.top {
            let template = Arc::clone(template);
            self.top = TopState::Model(Arc::clone(&template), scaled_parts(&template, &assembly.top_dimensions));
        }

        self.assembly = Some(assembly);
        if key_changed {
            log::debug!("Placement inputs changed; re-measuring");
            self.placement = Placement::Unpositioned;
            self.start_placement(now);
        }
        self.dirty = true;
        self.rebuild();
    }

    /// Install the committed surface texture (`None` = fallback color).
    pub fn set_surface(&mut self, image: Option<Arc<SurfaceImage>>, revision: u64) {
        if revision == self.surface_revision {
            return;
        }
        self.surface = image;
        self.surface_revision = revision;
        self.dirty = true;
        self.rebuild();
    }

    /// Apply finished loads and advance the placement schedule. Returns
    /// true when the scene changed.
    pub fn update(&mut self, now: Instant) -> bool {
        self.poll_loads();
        self.advance_placement(now);
        self.rebuild()
    }

    /// Block until both asset slots are idle, applying their results.
    /// Placement is not advanced.
    pub fn wait_for_loads(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_loading() && Instant::now() < deadline {
            self.poll_loads();
            if self.is_loading() {
                std::thread::sleep(Duration::from_millis(2));
            }
        }
        self.rebuild();
        !self.is_loading()
    }

    /// Run on the wall clock until the top is positioned or `timeout`
    /// passes. For headless use.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            self.update(now);
            if (self.is_positioned() && !self.is_loading()) || now >= deadline {
                return self.is_positioned();
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    // ── Loading ─────────────────────────────────────────────────────────

    fn start_base(&mut self, path: Option<&Path>) {
        self.base_slot.cancel();
        self.base = BaseState::Absent;
        let Some(path) = path else {
            return;
        };
        match spawn_load(&mut self.base_slot, &self.loader, path) {
            Ok(()) => self.base = BaseState::Loading,
            Err(e) => {
                log::warn!("Base {} failed: {e}; using placeholder", path.display());
                self.base = placeholder_base();
            }
        }
    }

    fn start_top(&mut self, path: Option<&Path>) {
        self.top_slot.cancel();
        let Some(path) = path else {
            return;
        };
        match spawn_load(&mut self.top_slot, &self.loader, path) {
            Ok(()) => self.top = TopState::Loading,
            Err(e) => {
                log::warn!("Top {} failed: {e}; using placeholder", path.display());
                self.top = TopState::Placeholder;
            }
        }
    }

    fn poll_loads(&mut self) {
        match self.base_slot.poll() {
            Some(TaskOutcome::Ready(template)) => {
                if matches!(self.placement, Placement::Positioned { source: PlacementSource::Fallback, .. }) {
                    log::info!("Base arrived after the placement fallback; keeping the fallback height");
                }
                self.base = BaseState::Ready {
                    parts: template.parts.into_iter().map(Arc::new).collect(),
                    transform: Transform::IDENTITY.with_yaw(PI).matrix(),
                };
                self.dirty = true;
            }
            Some(TaskOutcome::Failed(e)) => {
                log::warn!("Base model failed to load: {e}; using placeholder");
                self.base = placeholder_base();
                self.dirty = true;
            }
            Some(TaskOutcome::Canceled) | None => {}
        }

        match self.top_slot.poll() {
            Some(TaskOutcome::Ready(template)) => {
                let template = Arc::new(template);
                let parts = self
                    .assembly
                    .as_ref()
                    .map(|a| scaled_parts(&template, &a.top_dimensions))
                    .unwrap_or_default();
                self.top = TopState::Model(template, parts);
                self.dirty = true;
            }
            Some(TaskOutcome::Failed(e)) => {
                log::warn!("Top model failed to load: {e}; using placeholder");
                self.top = TopState::Placeholder;
                self.dirty = true;
            }
            Some(TaskOutcome::Canceled) | None => {}
        }
    }

    // ── Placement ───────────────────────────────────────────────────────

    fn start_placement(&mut self, now: Instant) {
        let has_base = self.key.as_ref().is_some_and(|k| k.base_path.is_some());
        if has_base {
            self.placement = Placement::Measuring {
                attempts: 0,
                next_attempt: now,
            };
        } else {
            self.positioned(0.0, PlacementSource::Ground);
        }
    }

    fn advance_placement(&mut self, now: Instant) {
        let Placement::Measuring { attempts, next_attempt } = self.placement else {
            return;
        };
        if now < next_attempt {
            return;
        }
        let attempts = attempts + 1;
        let extent = self.base_extent();
        if !extent.is_degenerate() {
            log::debug!("Base measured at attempt {attempts}: top of base at {:.4} m", extent.max.y);
            self.positioned(extent.max.y, PlacementSource::Measured);
        } else if attempts >= self.retry.max_attempts {
            log::warn!("Base extent still empty after {attempts} attempts; resting top at half thickness");
            self.positioned(0.0, PlacementSource::Fallback);
        } else {
            self.placement = Placement::Measuring {
                attempts,
                next_attempt: now + self.retry.interval,
            };
        }
    }

    fn positioned(&mut self, support_height: f32, source: PlacementSource) {
        self.placement = Placement::Positioned { support_height, source };
        self.dirty = true;
        if let Some(listener) = self.on_positioned.as_mut() {
            listener();
        }
    }

    /// World-space extent of the base; empty while it is loading.
    fn base_extent(&self) -> BoundingExtent {
        match &self.base {
            BaseState::Ready { parts, transform } => parts
                .iter()
                .map(|m| m.bounds().transformed(transform))
                .fold(BoundingExtent::EMPTY, BoundingExtent::union),
            BaseState::Absent | BaseState::Loading => BoundingExtent::EMPTY,
        }
    }

    fn top_local_bounds(&self, assembly: &TableAssembly) -> BoundingExtent {
        let half = assembly.thickness() * 0.5;
        let meshes: Vec<&Arc<Mesh>> = match &self.top {
            TopState::Generated(mesh) => vec![mesh],
            TopState::Model(_, parts) => parts.iter().collect(),
            TopState::Loading | TopState::Placeholder => vec![&self.placeholder_top],
        };
        let bounds = meshes
            .into_iter()
            .map(|m| m.bounds())
            .fold(BoundingExtent::EMPTY, BoundingExtent::union);
        if bounds.is_empty() {
            BoundingExtent::new(Vec3::new(0.0, -half, 0.0), Vec3::new(0.0, half, 0.0))
        } else {
            bounds
        }
    }

    // ── Scene ───────────────────────────────────────────────────────────

    fn rebuild(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        let Some(assembly) = self.assembly.as_ref() else {
            return false;
        };

        let mut nodes = Vec::new();
        if let BaseState::Ready { parts, transform } = &self.base {
            let material = Material::solid(BASE_COLOR, BASE_METALLIC, BASE_ROUGHNESS);
            nodes.extend(parts.iter().map(|mesh| SceneNode {
                role: NodeRole::Base,
                mesh: Arc::clone(mesh),
                transform: *transform,
                material: material.clone(),
            }));
        }

        let top_y = self.top_height().unwrap_or(assembly.thickness() * 0.5);
        let top_transform = Mat4::from_translation(Vec3::new(0.0, top_y, 0.0));
        let (meshes, material) = match &self.top {
            TopState::Generated(mesh) => (vec![Arc::clone(mesh)], self.surface_material(assembly)),
            TopState::Model(_, parts) => (parts.clone(), self.surface_material(assembly)),
            TopState::Loading | TopState::Placeholder => (
                vec![Arc::clone(&self.placeholder_top)],
                Material::solid(assembly.surface.fallback_color(), 0.0, 0.5),
            ),
        };
        nodes.extend(meshes.into_iter().map(|mesh| SceneNode {
            role: NodeRole::Top,
            mesh,
            transform: top_transform,
            material: material.clone(),
        }));

        self.scene.nodes = nodes;
        self.scene.positioned = self.is_positioned();
        self.scene.revision += 1;
        true
    }

    fn surface_material(&self, assembly: &TableAssembly) -> Material {
        match &self.surface {
            Some(image) => Material {
                base_color: Rgb::WHITE.to_linear(),
                metallic: TOP_METALLIC,
                roughness: TOP_ROUGHNESS,
                texture: Some(Arc::clone(image)),
                texture_revision: self.surface_revision,
            },
            None => Material {
                texture_revision: self.surface_revision,
                ..Material::solid(assembly.surface.fallback_color(), TOP_METALLIC, TOP_ROUGHNESS)
            },
        }
    }
}

fn spawn_load(
    slot: &mut TaskSlot<AssetTemplate, AssetError>,
    loader: &Arc<dyn AssetLoader>,
    path: &Path,
) -> Result<(), AssetError> {
    let loader = Arc::clone(loader);
    let path: PathBuf = path.to_path_buf();
    log::debug!("Loading model {}", path.display());
    slot.spawn(move |token| loader.load(&path, token))
        .map(|_| ())
        .map_err(AssetError::Spawn)
}

fn placeholder_base() -> BaseState {
    BaseState::Ready {
        parts: vec![Arc::new(cylinder(PLACEHOLDER_BASE_RADIUS, PLACEHOLDER_BASE_HEIGHT, 32))],
        transform: Mat4::from_translation(Vec3::new(0.0, -PLACEHOLDER_BASE_HEIGHT * 0.5, 0.0)),
    }
}

/// Horizontal scale that stretches a model of `size` to the requested
/// footprint. Height is never scaled.
pub fn model_top_scale(size: Vec3, dimensions: &ShapeSpec) -> Vec3 {
    let (x, z) = (size.x, size.z);
    let ratio = |target: f32, current: f32| if current > 0.0 { target / current } else { 1.0 };
    let (sx, sz) = match *dimensions {
        ShapeSpec::Round { radius } => {
            let s = ratio(radius / CM_PER_M, x.max(z) * 0.5);
            (s, s)
        }
        ShapeSpec::Square { side_length, .. } => {
            let s = ratio(side_length / CM_PER_M, x.max(z));
            (s, s)
        }
        ShapeSpec::Rectangular { length, width, .. } => (ratio(length / CM_PER_M, x), ratio(width / CM_PER_M, z)),
        ShapeSpec::Oval {
            major_diameter,
            minor_diameter,
        } => {
            let (major, minor) = (major_diameter / CM_PER_M, minor_diameter / CM_PER_M);
            if x > z {
                (ratio(major, x), ratio(minor, z))
            } else if z > x {
                (ratio(minor, x), ratio(major, z))
            } else {
                (ratio(minor, x), ratio(minor, z))
            }
        }
    };
    Vec3::new(sx, 1.0, sz)
}

fn scaled_parts(template: &AssetTemplate, dimensions: &ShapeSpec) -> Vec<Arc<Mesh>> {
    let scale = model_top_scale(template.bounds().size(), dimensions);
    let matrix = Mat4::from_scale(scale);
    template
        .parts
        .iter()
        .map(|part| {
            let mut mesh = part.clone();
            mesh.transform(&matrix);
            Arc::new(mesh)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    use super::*;
    use crate::catalog::{BaseStyle, ShapeKind, SurfaceSelector};
    use crate::config::{AssetConfig, ConfiguratorParams};
    use crate::scene::asset::glb;
    use crate::task::CancelToken;

    const WAIT: Duration = Duration::from_secs(5);

    /// Serves templates from memory. Paths listed in `gates` block until
    /// the test releases them; unknown paths fail.
    #[derive(Default)]
    struct MemoryLoader {
        templates: Mutex<HashMap<PathBuf, AssetTemplate>>,
        gates: Mutex<HashMap<PathBuf, mpsc::Receiver<()>>>,
    }

    impl MemoryLoader {
        fn serve(&self, path: &Path, glb_bytes: &[u8]) {
            let template = AssetTemplate::from_slice(glb_bytes, None).unwrap();
            self.templates.lock().unwrap().insert(path.to_path_buf(), template);
        }

        fn serve_empty(&self, path: &Path) {
            self.templates
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), AssetTemplate::default());
        }

        fn gate(&self, path: &Path) -> mpsc::Sender<()> {
            let (tx, rx) = mpsc::channel();
            self.gates.lock().unwrap().insert(path.to_path_buf(), rx);
            tx
        }
    }

    impl AssetLoader for MemoryLoader {
        fn load(&self, path: &Path, _token: &CancelToken) -> Result<AssetTemplate, AssetError> {
            let gate = self.gates.lock().unwrap().remove(path);
            if let Some(gate) = gate {
                let _ = gate.recv();
            }
            self.templates
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| AssetError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
        }
    }

    fn assets() -> AssetConfig {
        AssetConfig {
            asset_root: PathBuf::from("/assets"),
            ..AssetConfig::default()
        }
    }

    fn assembly(params: ConfiguratorParams) -> TableAssembly {
        TableAssembly::from_params(&params, &assets())
    }

    fn pedestal_path() -> PathBuf {
        assembly(ConfiguratorParams::default()).base_path.unwrap()
    }

    fn composer(loader: Arc<MemoryLoader>) -> SceneComposer {
        SceneComposer::new(loader, RenderingCapabilityProfile::default())
    }

    fn top_y(composer: &SceneComposer) -> f32 {
        let top = composer.scene().nodes_with_role(NodeRole::Top).next().unwrap();
        top.transform.w_axis.y
    }

    #[test]
    fn round_top_without_base_rests_on_the_ground() {
        let mut composer = composer(Arc::new(MemoryLoader::default()));
        let t0 = Instant::now();
        composer.configure(
            assembly(ConfiguratorParams {
                shape: ShapeKind::Round,
                radius: 100.0,
                base_style: None,
                ..ConfiguratorParams::default()
            }),
            t0,
        );
        assert!(composer.is_positioned(), "no base means no measuring");
        assert_eq!(
            composer.placement(),
            Placement::Positioned {
                support_height: 0.0,
                source: PlacementSource::Ground
            }
        );
        assert!((top_y(&composer) - 0.01).abs() < 1e-7, "20 mm panel sits at 10 mm");

        let bounds = composer.scene().bounds();
        assert!((bounds.min.y).abs() < 1e-6, "bottom face on the floor, got {}", bounds.min.y);
        assert!((bounds.size().x - 2.0).abs() < 1e-4);
        assert_eq!(composer.scene().nodes_with_role(NodeRole::Base).count(), 0);
    }

    #[test]
    fn top_sits_flush_on_the_measured_base() {
        let loader = Arc::new(MemoryLoader::default());
        loader.serve(&pedestal_path(), &glb::block([-0.3, 0.0, -0.3], [0.3, 0.7, 0.3], [0.0, 0.05, 0.0]));
        let mut composer = composer(Arc::clone(&loader));
        let t0 = Instant::now();
        composer.configure(assembly(ConfiguratorParams::default()), t0);
        assert!(!composer.is_positioned());
        assert!(!composer.scene().positioned, "viewer hides the top until placed");

        assert!(composer.wait_for_loads(WAIT));
        composer.update(t0);
        assert!(matches!(
            composer.placement(),
            Placement::Positioned { source: PlacementSource::Measured, .. }
        ));
        let top = composer.scene().nodes_with_role(NodeRole::Top).next().unwrap();
        let bottom = top.bounds().min.y;
        assert!((bottom - 0.75).abs() < 1e-5, "top's bottom face at the base's max y, got {bottom}");
        assert!(composer.scene().positioned);
    }

    #[test]
    fn base_gets_dark_matte_material_and_half_turn() {
        let loader = Arc::new(MemoryLoader::default());
        loader.serve(&pedestal_path(), &glb::block([0.1, 0.0, 0.0], [0.5, 0.7, 0.2], [0.0; 3]));
        let mut composer = composer(Arc::clone(&loader));
        composer.configure(assembly(ConfiguratorParams::default()), Instant::now());
        composer.wait_for_loads(WAIT);

        let base = composer.scene().nodes_with_role(NodeRole::Base).next().unwrap();
        assert_eq!(base.material, Material::solid(BASE_COLOR, 0.1, 0.9));
        let bounds = base.bounds();
        assert!((bounds.max.x + 0.1).abs() < 1e-5, "rotated 180° about y, got {}", bounds.max.x);
    }

    #[test]
    fn exhausted_retries_fall_back_to_half_thickness() {
        let loader = Arc::new(MemoryLoader::default());
        loader.serve_empty(&pedestal_path());
        let mut composer = composer(Arc::clone(&loader));
        let t0 = Instant::now();
        composer.configure(assembly(ConfiguratorParams::default()), t0);
        composer.wait_for_loads(WAIT);

        let policy = RetryPolicy::default();
        for attempt in 0..policy.max_attempts - 1 {
            composer.update(t0 + policy.interval * attempt);
            assert!(!composer.is_positioned(), "attempt {} should keep measuring", attempt + 1);
        }
        composer.update(t0 + policy.interval * (policy.max_attempts - 1));
        assert_eq!(
            composer.placement(),
            Placement::Positioned {
                support_height: 0.0,
                source: PlacementSource::Fallback
            }
        );
        assert_eq!(top_y(&composer), 0.01, "exactly half of a 20 mm panel");
    }

    #[test]
    fn attempts_while_loading_count_and_late_base_keeps_fallback() {
        let loader = Arc::new(MemoryLoader::default());
        let path = pedestal_path();
        loader.serve(&path, &glb::block([-0.3, 0.0, -0.3], [0.3, 0.7, 0.3], [0.0; 3]));
        let release = loader.gate(&path);
        let mut composer = composer(Arc::clone(&loader));
        let t0 = Instant::now();
        composer.configure(assembly(ConfiguratorParams::default()), t0);

        let policy = RetryPolicy::default();
        for attempt in 0..policy.max_attempts {
            composer.update(t0 + policy.interval * attempt);
        }
        assert!(matches!(
            composer.placement(),
            Placement::Positioned { source: PlacementSource::Fallback, .. }
        ));

        release.send(()).unwrap();
        composer.wait_for_loads(WAIT);
        composer.update(t0 + policy.interval * 20);
        assert_eq!(composer.scene().nodes_with_role(NodeRole::Base).count(), 1, "base is shown");
        assert_eq!(top_y(&composer), 0.01, "placement is not redone for the same key");
    }

    #[test]
    fn failed_base_uses_placeholder_cylinder() {
        // Nothing served: every load fails.
        let mut composer = composer(Arc::new(MemoryLoader::default()));
        let t0 = Instant::now();
        composer.configure(assembly(ConfiguratorParams::default()), t0);
        composer.wait_for_loads(WAIT);
        composer.update(t0);

        let base = composer.scene().nodes_with_role(NodeRole::Base).next().unwrap();
        let bounds = base.bounds();
        assert!(bounds.max.y.abs() < 1e-6 && (bounds.min.y + 1.0).abs() < 1e-6);
        assert!((top_y(&composer) - 0.01).abs() < 1e-6, "top rests at 0 + t/2");
    }

    #[test]
    fn placement_inputs_reset_the_state() {
        let loader = Arc::new(MemoryLoader::default());
        loader.serve(&pedestal_path(), &glb::block([-0.3, 0.0, -0.3], [0.3, 0.7, 0.3], [0.0; 3]));
        let mut composer = composer(Arc::clone(&loader));
        let t0 = Instant::now();
        composer.configure(
            assembly(ConfiguratorParams {
                base_style: None,
                ..ConfiguratorParams::default()
            }),
            t0,
        );
        assert!(composer.is_positioned());

        composer.configure(assembly(ConfiguratorParams::default()), t0);
        assert!(!composer.is_positioned(), "adding a base restarts measurement");
        composer.wait_for_loads(WAIT);
        composer.update(t0);
        assert!(composer.is_positioned());

        composer.configure(
            assembly(ConfiguratorParams {
                shape: ShapeKind::Oval,
                ..ConfiguratorParams::default()
            }),
            t0,
        );
        assert!(
            matches!(composer.placement(), Placement::Measuring { attempts: 0, .. }),
            "new shape re-measures even with the same base"
        );
        composer.update(t0);
        assert!(composer.is_positioned(), "base already loaded, so one attempt is enough");
    }

    #[test]
    fn thickness_change_keeps_measurement_and_moves_the_top() {
        let loader = Arc::new(MemoryLoader::default());
        loader.serve(&pedestal_path(), &glb::block([-0.3, 0.0, -0.3], [0.3, 0.7, 0.3], [0.0; 3]));
        let mut composer = composer(Arc::clone(&loader));
        let t0 = Instant::now();
        composer.configure(assembly(ConfiguratorParams::default()), t0);
        composer.wait_for_loads(WAIT);
        composer.update(t0);
        assert!((top_y(&composer) - 0.71).abs() < 1e-5);

        composer.configure(
            assembly(ConfiguratorParams {
                thickness_mm: 30.0,
                ..ConfiguratorParams::default()
            }),
            t0,
        );
        assert!(composer.is_positioned());
        assert!((top_y(&composer) - 0.715).abs() < 1e-5, "thicker panel still flush");
    }

    #[test]
    fn positioned_listener_fires_once_per_placement() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut composer = composer(Arc::new(MemoryLoader::default()));
        let sink = Arc::clone(&count);
        composer.on_positioned(move || {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        let t0 = Instant::now();
        let params = ConfiguratorParams {
            base_style: None,
            ..ConfiguratorParams::default()
        };
        composer.configure(assembly(params.clone()), t0);
        composer.update(t0);
        composer.configure(
            assembly(ConfiguratorParams {
                length: 180.0,
                ..params.clone()
            }),
            t0,
        );
        assert_eq!(count.load(Ordering::SeqCst), 1, "same key, no new signal");
        composer.configure(
            assembly(ConfiguratorParams {
                shape: ShapeKind::Square,
                ..params
            }),
            t0,
        );
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn surface_texture_switches_top_to_white_times_texture() {
        let mut composer = composer(Arc::new(MemoryLoader::default()));
        composer.configure(
            assembly(ConfiguratorParams {
                material: SurfaceSelector::named("granite-gray"),
                base_style: None,
                ..ConfiguratorParams::default()
            }),
            Instant::now(),
        );
        let material = |c: &SceneComposer| c.scene().nodes_with_role(NodeRole::Top).next().unwrap().material.clone();
        assert_eq!(material(&composer).base_color, Rgb::hex(0x6B6B6B).to_linear());
        assert_eq!(material(&composer).roughness, 0.3);

        let image = Arc::new(SurfaceImage { levels: Vec::new() });
        composer.set_surface(Some(image), 1);
        let textured = material(&composer);
        assert_eq!(textured.base_color, Rgb::WHITE.to_linear());
        assert!(textured.texture.is_some());
        assert_eq!(textured.texture_revision, 1);
    }

    #[test]
    fn model_top_is_scaled_to_requested_footprint() {
        let loader = Arc::new(MemoryLoader::default());
        let config = AssetConfig {
            modelled_tops: true,
            ..assets()
        };
        let params = ConfiguratorParams {
            length: 300.0,
            width: 90.0,
            base_style: Some(BaseStyle::Trestle),
            ..ConfiguratorParams::default()
        };
        let table = TableAssembly::from_params(&params, &config);
        loader.serve(table.top_path.as_ref().unwrap(), &glb::block([-1.0, 0.0, -0.5], [1.0, 0.04, 0.5], [0.0; 3]));
        loader.serve(table.base_path.as_ref().unwrap(), &glb::block([-0.5, 0.0, -0.3], [0.5, 0.72, 0.3], [0.0; 3]));

        let mut composer = composer(Arc::clone(&loader));
        let t0 = Instant::now();
        composer.configure(table, t0);
        composer.wait_for_loads(WAIT);
        composer.update(t0);

        let top = composer.scene().nodes_with_role(NodeRole::Top).next().unwrap();
        let size = top.bounds().size();
        assert!((size.x - 3.0).abs() < 1e-5 && (size.z - 0.9).abs() < 1e-5, "got {size}");
        assert!((size.y - 0.04).abs() < 1e-6, "height untouched");
        assert!((top.bounds().min.y - 0.72).abs() < 1e-5, "model bottom on the base");
    }

    #[test]
    fn failed_model_top_shows_placeholder_in_fallback_color() {
        let config = AssetConfig {
            modelled_tops: true,
            ..assets()
        };
        let params = ConfiguratorParams {
            base_style: None,
            ..ConfiguratorParams::default()
        };
        let mut composer = composer(Arc::new(MemoryLoader::default()));
        composer.configure(TableAssembly::from_params(&params, &config), Instant::now());
        composer.wait_for_loads(WAIT);

        let top = composer.scene().nodes_with_role(NodeRole::Top).next().unwrap();
        let size = top.mesh.bounds().size();
        assert!((size - PLACEHOLDER_TOP_SIZE).abs().max_element() < 1e-6);
        assert_eq!(top.material.base_color, SurfaceSelector::default().fallback_color().to_linear());
        assert!(top.material.texture.is_none());
    }

    #[test]
    fn oval_model_scale_matches_long_axis() {
        let spec = ShapeSpec::Oval {
            major_diameter: 200.0,
            minor_diameter: 120.0,
        };
        let scale = model_top_scale(Vec3::new(0.6, 0.04, 1.0), &spec);
        assert!((scale.x - 2.0).abs() < 1e-6, "x is the short axis here");
        assert!((scale.z - 2.0).abs() < 1e-6);
        assert_eq!(model_top_scale(Vec3::ZERO, &spec), Vec3::ONE);
    }
}
