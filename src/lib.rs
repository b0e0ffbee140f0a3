//! Non-destructive freehand eraser for 2D vector canvases.
//!
//! This crate captures pointer strokes, turns them into erasing geometry, and
//! folds that geometry into a persistent per-object clip mask expressed in the
//! object's own coordinate space. Erased objects keep their vector data: the
//! mask travels with the object through later moves, rotations and scales, and
//! serializes alongside it. The host wires pointer events into the engine and
//! reacts to the returned [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EraserCore`] |
//! | [`input`] | Pointer descriptors and the gesture state machine |
//! | [`geom`] | Point helpers, decimation, affine math, quad intersection |
//! | [`path`] | Path synthesis from decimated strokes |
//! | [`scene`] | Scene graph model and the [`scene::Erasable`] capability |
//! | [`mask`] | Persistent per-object eraser masks |
//! | [`pattern`] | Snapshot of content protected from erasure |
//! | [`accumulate`] | Projection of finalized paths into object masks |
//! | [`render`] | Scene rasterization and the dual-surface live stroke |
//! | [`config`] | Brush configuration |
//! | [`error`] | Error type shared by every module |
//! | [`consts`] | Shared numeric constants |

pub mod accumulate;
pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod geom;
pub mod input;
pub mod mask;
pub mod path;
pub mod pattern;
pub mod render;
pub mod scene;
