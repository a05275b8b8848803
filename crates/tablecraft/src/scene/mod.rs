//! # Scene — Putting the Table Together
//!
//! A table is a base model plus a top, stacked so the top's bottom face
//! touches the top of the base:
//!
//! ```text
//!        ┌───────────────────────────┐  ← top (generated or modelled)
//!        └───────────┬───┬───────────┘  ← bottom face at base max y
//!                    │   │
//!                    │   │              ← base (glTF, rotated 180°)
//!                ────┴───┴────
//!   ─────────────────────────────────── y = 0
//! ```
//!
//! The base's height isn't known until its model has loaded, so the
//! [`SceneComposer`] measures it on a schedule and falls back to resting the
//! top on the floor if the base never produces a usable bounding box.
//!
//! ## Comparison
//!
//! - **three.js / R3F**: measure with `Box3.setFromObject` inside a
//!   `setTimeout` chain after Suspense resolves.
//! - **Bevy**: spawn a scene, then query `Aabb` components in a system
//!   that runs after the asset's `LoadState` becomes `Loaded`.
//! - **Our approach**: an explicit state machine fed with timestamps, so
//!   the retry schedule is testable without sleeping.

pub mod asset;
pub mod compose;
pub mod node;

pub use asset::{AssetError, AssetLoader, AssetTemplate, GltfFileLoader};
pub use compose::{Placement, PlacementSource, RetryPolicy, SceneComposer};
pub use node::{Material, NodeRole, Scene, SceneNode};
