//! Pattern Snapshot: a raster of everything the current gesture must not erase.
//!
//! Captured once per gesture at pointer-down. The live preview on the top
//! surface is clipped to it, so protected pixels stay visible where the
//! eraser passes over them.
//!
//! Capture temporarily hides erasable objects (or, in inverted mode, flips
//! their masks to show only erased regions). A [`SnapshotGuard`] owns those
//! edits and undoes them on drop, so the scene returns to its baseline even
//! when rendering fails.

#[cfg(test)]
#[path = "pattern_test.rs"]
mod pattern_test;

use tiny_skia::Pixmap;
use tracing::debug;

use crate::error::EraseError;
use crate::render;
use crate::scene::{Erasability, Erasable, Node, Scene, SceneObject};

/// Device-pixel raster of protected content. Empty for a zero-sized canvas.
pub struct PatternSnapshot {
    pixmap: Option<Pixmap>,
}

impl PatternSnapshot {
    /// Capture protected content with the default renderer.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the buffer cannot be allocated or rendering fails.
    /// The scene is restored either way.
    pub fn capture(scene: &mut Scene, inverted: bool) -> Result<Self, EraseError> {
        Self::capture_with(scene, inverted, render_protected)
    }

    /// Capture with a caller-supplied render step. `render` sees the scene
    /// with erasable content already filtered out.
    ///
    /// # Errors
    ///
    /// Propagates allocation and render errors after restoring the scene.
    pub fn capture_with<F>(scene: &mut Scene, inverted: bool, render: F) -> Result<Self, EraseError>
    where
        F: FnOnce(&mut Pixmap, &Scene, bool) -> Result<(), EraseError>,
    {
        let (width, height) = scene.device_size();
        if width == 0 || height == 0 {
            debug!(width, height, "eraser: zero-sized canvas, empty pattern");
            return Ok(Self { pixmap: None });
        }
        let mut pixmap = render::alloc(width, height)?;

        let guard = SnapshotGuard::apply(scene, inverted);
        debug!(hidden = guard.hidden.len(), inverted = guard.inverted.len(), "eraser: pattern filter applied");
        render(&mut pixmap, guard.scene(), inverted)?;
        drop(guard);

        Ok(Self { pixmap: Some(pixmap) })
    }

    #[must_use]
    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixmap.is_none()
    }
}

/// Default render step: protected backdrop, the filtered object tree, and a
/// protected overlay.
///
/// # Errors
///
/// Propagates [`render`] errors.
pub fn render_protected(target: &mut Pixmap, scene: &Scene, inverted: bool) -> Result<(), EraseError> {
    let base = scene.device_transform();
    if !inverted {
        if let Some(color) = &scene.background_color {
            render::fill_background(target, color)?;
        }
        if let Some(bg) = protected(scene.background_image.as_ref()) {
            render::draw_object(target, bg, base)?;
        }
    }
    for obj in scene.objects() {
        render::draw_object(target, obj, base)?;
    }
    if !inverted {
        if let Some(overlay) = protected(scene.overlay_image.as_ref()) {
            render::draw_object(target, overlay, base)?;
        }
    }
    Ok(())
}

fn protected(layer: Option<&SceneObject>) -> Option<&SceneObject> {
    layer.filter(|o| !o.is_erasable())
}

/// Index path from the top-level object list down to one object.
type TreePath = Vec<usize>;

/// Scoped visibility and mask edits made for a capture. Edits are recorded
/// by tree position, so objects sharing an id are each restored.
pub struct SnapshotGuard<'a> {
    scene: &'a mut Scene,
    hidden: Vec<TreePath>,
    inverted: Vec<TreePath>,
}

impl<'a> SnapshotGuard<'a> {
    /// Hide erasable content (normal mode) or invert existing masks
    /// (inverted mode) until the guard drops.
    pub fn apply(scene: &'a mut Scene, inverted: bool) -> Self {
        let mut hidden = Vec::new();
        let mut flipped = Vec::new();
        filter(scene.objects_mut(), inverted, &mut Vec::new(), &mut hidden, &mut flipped);
        Self { scene, hidden, inverted: flipped }
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        self.scene
    }
}

impl Drop for SnapshotGuard<'_> {
    fn drop(&mut self) {
        for at in &self.hidden {
            restore(self.scene.objects_mut(), at, |obj| obj.visible = true);
        }
        for at in &self.inverted {
            restore(self.scene.objects_mut(), at, |obj| {
                if let Some(mask) = obj.eraser.as_mut() {
                    mask.set_inverted(false);
                }
            });
        }
    }
}

fn filter(
    objects: &mut [SceneObject],
    inverted: bool,
    at: &mut TreePath,
    hidden: &mut Vec<TreePath>,
    flipped: &mut Vec<TreePath>,
) {
    for (i, obj) in objects.iter_mut().enumerate() {
        at.push(i);
        filter_one(obj, inverted, at, hidden, flipped);
        at.pop();
    }
}

fn filter_one(
    obj: &mut SceneObject,
    inverted: bool,
    at: &mut TreePath,
    hidden: &mut Vec<TreePath>,
    flipped: &mut Vec<TreePath>,
) {
    if obj.erasable == Erasability::Deep {
        if let Node::Container(children) = &mut obj.node {
            filter(children, inverted, at, hidden, flipped);
            return;
        }
    }
    if !obj.visible || !obj.is_erasable() {
        return;
    }
    match obj.eraser.as_mut() {
        Some(mask) if inverted => {
            mask.set_inverted(true);
            flipped.push(at.clone());
        }
        _ => {
            obj.visible = false;
            hidden.push(at.clone());
        }
    }
}

/// Walk `at`, marking every object on the way dirty, and undo the edit on
/// the last one.
fn restore(objects: &mut [SceneObject], at: &[usize], undo: impl FnOnce(&mut SceneObject)) {
    let Some((&first, rest)) = at.split_first() else {
        return;
    };
    let Some(obj) = objects.get_mut(first) else {
        return;
    };
    obj.mark_dirty();
    if rest.is_empty() {
        undo(obj);
    } else if let Node::Container(children) = &mut obj.node {
        restore(children, rest, undo);
    }
}
