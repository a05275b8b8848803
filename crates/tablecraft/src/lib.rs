//! # Tablecraft — Stone Table Configurator Engine
//!
//! Turns a customer's choices (shape, size, thickness, edge, stone, base)
//! into a lit, textured 3D table:
//!
//! ```text
//!  ConfiguratorParams
//!        │ assembly
//!        ▼
//!  TableAssembly ──┬─► geometry: outline ─► edge bevel ─► extruded solid
//!                  ├─► texture:  catalog ─► fetch ─► convert ─► decode
//!                  └─► scene:    base model + top, measured and stacked
//!                                      │
//!                                      ▼
//!                               viewer (winit + wgpu)
//! ```
//!
//! Start with [`Configurator`](configurator::Configurator), which owns the
//! texture pipeline and the scene composer, or run the `tablecraft` binary
//! for the interactive viewer.
//!
//! ## Features
//!
//! - `viewer` (default): the window, renderer and orbit controls.
//! - `remote`: fetch catalog photos over HTTP.

pub mod assembly;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod configurator;
pub mod geometry;
pub mod math;
pub mod scene;
pub mod task;
pub mod texture;
pub mod watch;

#[cfg(feature = "viewer")]
pub mod viewer;
