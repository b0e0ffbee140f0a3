//! Accumulator: folds a finalized path into the eraser mask of every target.
//!
//! For each target the path is duplicated through a [`PathDuplicator`], the
//! duplicate is re-placed into the target's local space with the inverse of
//! its global transform, and the result is appended to the target's mask.
//! Duplications run concurrently; each append commits as soon as its own
//! duplicate resolves.

#[cfg(test)]
#[path = "accumulate_test.rs"]
mod accumulate_test;

use std::collections::HashSet;

use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use crate::error::EraseError;
use crate::geom::{self, Affine};
use crate::mask::EraserMask;
use crate::path::EraserPath;
use crate::scene::{Erasable, ObjectId, Scene};

/// Produces an independent copy of a path. Hosts whose path objects are
/// cloned asynchronously plug in here.
pub trait PathDuplicator {
    fn duplicate(&self, path: &EraserPath) -> LocalBoxFuture<'static, Result<EraserPath, EraseError>>;
}

/// Duplicates by value, resolving immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneDuplicator;

impl PathDuplicator for CloneDuplicator {
    fn duplicate(&self, path: &EraserPath) -> LocalBoxFuture<'static, Result<EraserPath, EraseError>> {
        future::ready(Ok(path.clone())).boxed_local()
    }
}

/// A path committed to one object's mask, in that object's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub id: ObjectId,
    pub path: EraserPath,
}

pub struct Accumulator {
    duplicator: Box<dyn PathDuplicator>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(CloneDuplicator)
    }
}

impl Accumulator {
    #[must_use]
    pub fn new(duplicator: impl PathDuplicator + 'static) -> Self {
        Self { duplicator: Box::new(duplicator) }
    }

    /// Append `path` to every target's mask.
    ///
    /// Duplicate ids are folded once. In inverted mode only targets that
    /// already own a mask are touched. Targets that are missing, not
    /// erasable, fail to duplicate, or have a singular transform are skipped
    /// with a warning. Results follow the order of `targets`.
    pub async fn fold(
        &mut self,
        scene: &mut Scene,
        path: &EraserPath,
        targets: &[ObjectId],
        inverted: bool,
    ) -> Vec<Applied> {
        let mut seen = HashSet::new();
        let order: Vec<ObjectId> = targets.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut pending: FuturesUnordered<_> = order
            .iter()
            .map(|&id| self.duplicator.duplicate(path).map(move |dup| (id, dup)))
            .collect();

        let mut applied = Vec::with_capacity(order.len());
        while let Some((id, dup)) = pending.next().await {
            match dup.and_then(|dup| commit(scene, &id, &dup, inverted)) {
                Ok(Some(local)) => {
                    let entries = scene.get(&id).and_then(Erasable::eraser).map_or(0, EraserMask::len);
                    debug!(%id, entries, "eraser: path appended");
                    applied.push(Applied { id, path: local });
                }
                Ok(None) => debug!(%id, inverted, "eraser: target not eligible"),
                Err(err) => warn!(%id, code = err.error_code(), %err, "eraser: target skipped"),
            }
        }

        applied.sort_by_key(|a| order.iter().position(|id| *id == a.id));
        applied
    }
}

fn commit(scene: &mut Scene, id: &ObjectId, dup: &EraserPath, inverted: bool) -> Result<Option<EraserPath>, EraseError> {
    let global = scene.global_transform(id).ok_or(EraseError::ObjectNotFound(*id))?;
    let obj = scene.get_mut(id).ok_or(EraseError::ObjectNotFound(*id))?;
    if !obj.is_erasable() || (inverted && obj.eraser().is_none()) {
        return Ok(None);
    }
    let local = append_projected(obj, dup, global)?;
    scene.mark_dirty(id);
    Ok(Some(local))
}

/// Re-place `path` into the local space of an object at `global` and append
/// it to the object's mask, creating the mask if needed.
///
/// # Errors
///
/// Returns [`EraseError::NonInvertible`] when `global` is singular; the mask
/// is left untouched.
pub fn append_projected<T: Erasable + ?Sized>(
    target: &mut T,
    path: &EraserPath,
    global: Affine,
) -> Result<EraserPath, EraseError> {
    let local = path.projected(geom::invert(global)?);
    target.ensure_eraser().push(local.clone());
    target.mark_dirty();
    Ok(local)
}
