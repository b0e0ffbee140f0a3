//! Persistent per-object eraser masks.
//!
//! An [`EraserMask`] is the ordered history of every eraser path applied to
//! one object, each already projected into that object's local space. The mask
//! is replayed on every render: erase entries remove coverage, restore entries
//! add it back, in insertion order. Because entries are local-space, moving or
//! transforming the owner never requires touching the mask.

#[cfg(test)]
#[path = "mask_test.rs"]
mod mask_test;

use serde::{Deserialize, Serialize};

use crate::path::EraserPath;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EraserMask {
    paths: Vec<EraserPath>,
    /// Leave this mask out when the owning object is serialized.
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclude_from_export: bool,
    /// Render only the erased regions. Set while an inverted-mode pattern
    /// snapshot is captured; never persisted.
    #[serde(skip)]
    inverted: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

impl EraserMask {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a local-space path. Masks are append-only.
    pub fn push(&mut self, path: EraserPath) {
        self.paths.push(path);
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn paths(&self) -> &[EraserPath] {
        &self.paths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub(crate) fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }
}
