//! Scene model: drawable objects, their placement, and the erase capability.
//!
//! This module defines the object tree the eraser operates on (`SceneObject`,
//! `Node`, `Shape`), the tri-state erasable flag (`Erasability`), the
//! capability trait the accumulator writes through (`Erasable`), and the
//! canvas-level container (`Scene`) with its background and overlay drawables.
//!
//! Every object carries a local placement (center, rotation, scale) relative
//! to its parent. Global transforms are the product of the ancestor chain and
//! are recomputed on demand, never cached.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::{self, Affine, Point, Quad, Rect};
use crate::mask::EraserMask;

/// Unique identifier for a scene object.
pub type ObjectId = Uuid;

// =============================================================
// Erasability
// =============================================================

/// Whether an object accepts eraser paths. Serialized as `true`, `false` or
/// `"deep"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ErasableFlag", into = "ErasableFlag")]
pub enum Erasability {
    /// Never erased, always protected.
    No,
    /// Erased as a whole.
    #[default]
    Yes,
    /// Containers pass the erase on to each erasable child instead of taking
    /// it themselves. A leaf marked deep behaves like `Yes`.
    Deep,
}

impl Erasability {
    #[must_use]
    pub fn is_erasable(self) -> bool {
        !matches!(self, Self::No)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ErasableFlag {
    Flag(bool),
    Mode(String),
}

impl TryFrom<ErasableFlag> for Erasability {
    type Error = String;

    fn try_from(raw: ErasableFlag) -> Result<Self, Self::Error> {
        match raw {
            ErasableFlag::Flag(true) => Ok(Self::Yes),
            ErasableFlag::Flag(false) => Ok(Self::No),
            ErasableFlag::Mode(m) if m == "deep" => Ok(Self::Deep),
            ErasableFlag::Mode(other) => Err(format!("unknown erasable mode: {other}")),
        }
    }
}

impl From<Erasability> for ErasableFlag {
    fn from(e: Erasability) -> Self {
        match e {
            Erasability::No => Self::Flag(false),
            Erasability::Yes => Self::Flag(true),
            Erasability::Deep => Self::Mode("deep".to_string()),
        }
    }
}

/// Capability implemented by anything that can own an eraser mask.
pub trait Erasable {
    fn erasability(&self) -> Erasability;

    fn eraser(&self) -> Option<&EraserMask>;

    /// The mask, created empty on first use.
    fn ensure_eraser(&mut self) -> &mut EraserMask;

    /// Flag cached rendering of this object as stale.
    fn mark_dirty(&mut self);

    fn is_erasable(&self) -> bool {
        self.erasability().is_erasable()
    }
}

// =============================================================
// Objects
// =============================================================

/// Leaf geometry, centered on the object's origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    /// Axis-aligned rectangle.
    Rect { width: f64, height: f64 },
    /// Ellipse inscribed within the bounding box.
    Ellipse { width: f64, height: f64 },
    /// Open or closed polyline in local coordinates.
    Polyline {
        points: Vec<Point>,
        #[serde(default)]
        closed: bool,
    },
}

impl Shape {
    /// Local bounding box, ignoring stroke width.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Rect { width, height } | Self::Ellipse { width, height } => {
                Rect::from_center_size(Point::ZERO, (*width, *height))
            }
            Self::Polyline { points, .. } => geom::bounding_rect(points).unwrap_or(Rect::ZERO),
        }
    }
}

/// Object body: either drawable geometry or a group of children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Leaf(Shape),
    Container(Vec<SceneObject>),
}

/// A drawable in the scene tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Unique identifier for this object.
    pub id: ObjectId,
    /// Center x in the parent's coordinate space.
    pub x: f64,
    /// Center y in the parent's coordinate space.
    pub y: f64,
    /// Clockwise rotation in degrees around the center.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "unit")]
    pub scale_x: f64,
    #[serde(default = "unit")]
    pub scale_y: f64,
    #[serde(default = "shown")]
    pub visible: bool,
    #[serde(default)]
    pub erasable: Erasability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default)]
    pub stroke_width: f64,
    pub node: Node,
    /// Local-space eraser history. Absent until the first erase lands.
    #[serde(default, skip_serializing_if = "mask_not_exported")]
    pub eraser: Option<EraserMask>,
    /// Rendering of this object is stale.
    #[serde(skip)]
    pub dirty: bool,
}

fn unit() -> f64 {
    1.0
}

fn shown() -> bool {
    true
}

#[allow(clippy::ref_option)]
fn mask_not_exported(mask: &Option<EraserMask>) -> bool {
    mask.as_ref().is_none_or(|m| m.exclude_from_export)
}

impl SceneObject {
    /// New object at the origin with default placement and styling.
    #[must_use]
    pub fn new(node: Node) -> Self {
        Self {
            id: Uuid::new_v4(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            visible: true,
            erasable: Erasability::Yes,
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            node,
            eraser: None,
            dirty: false,
        }
    }

    /// Rectangle whose unrotated box spans `(left, top)`-`(left + width, top + height)`.
    #[must_use]
    pub fn rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(Node::Leaf(Shape::Rect { width, height })).at(left + width / 2.0, top + height / 2.0)
    }

    /// Ellipse inscribed in the box `(left, top)`-`(left + width, top + height)`.
    #[must_use]
    pub fn ellipse(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(Node::Leaf(Shape::Ellipse { width, height })).at(left + width / 2.0, top + height / 2.0)
    }

    /// Open polyline through `points`, given in parent space. The object is
    /// centered on the points' bounding box.
    #[must_use]
    pub fn polyline(points: &[Point]) -> Self {
        let center = geom::bounding_rect(points).map_or(Point::ZERO, |r| r.center());
        let local = geom::apply_to(points, Affine::translate(-center.to_vec2()));
        Self::new(Node::Leaf(Shape::Polyline { points: local, closed: false })).at(center.x, center.y)
    }

    /// Group of children whose placements are relative to `(x, y)`.
    #[must_use]
    pub fn container(x: f64, y: f64, children: Vec<SceneObject>) -> Self {
        Self::new(Node::Container(children)).at(x, y)
    }

    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    #[must_use]
    pub fn with_erasable(mut self, erasable: Erasability) -> Self {
        self.erasable = erasable;
        self
    }

    #[must_use]
    pub fn with_fill(mut self, fill: &str) -> Self {
        self.fill = Some(fill.to_string());
        self
    }

    #[must_use]
    pub fn with_stroke(mut self, stroke: &str, width: f64) -> Self {
        self.stroke = Some(stroke.to_string());
        self.stroke_width = width;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    /// Children of a container; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[SceneObject] {
        match &self.node {
            Node::Leaf(_) => &[],
            Node::Container(children) => children,
        }
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self.node, Node::Container(_))
    }

    /// Placement relative to the parent: translate, then rotate, then scale.
    #[must_use]
    pub fn local_transform(&self) -> Affine {
        Affine::translate((self.x, self.y))
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Bounding box in the object's own space, including half the stroke.
    #[must_use]
    pub fn local_bounds(&self) -> Rect {
        let half = self.stroke_width.max(0.0) / 2.0;
        match &self.node {
            Node::Leaf(shape) => shape.bounds().inflate(half, half),
            Node::Container(children) => children
                .iter()
                .map(|c| c.local_transform().transform_rect_bbox(c.local_bounds()))
                .reduce(|a, b| a.union(b))
                .unwrap_or(Rect::ZERO),
        }
    }

    /// Oriented bounding box under `global`.
    #[must_use]
    pub fn bounding_quad(&self, global: Affine) -> Quad {
        geom::corners(self.local_bounds(), global)
    }
}

impl Erasable for SceneObject {
    fn erasability(&self) -> Erasability {
        self.erasable
    }

    fn eraser(&self) -> Option<&EraserMask> {
        self.eraser.as_ref()
    }

    fn ensure_eraser(&mut self) -> &mut EraserMask {
        self.eraser.get_or_insert_with(EraserMask::new)
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

// =============================================================
// Scene
// =============================================================

/// Background and overlay drawables that took an erase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drawables {
    pub background: Option<ObjectId>,
    pub overlay: Option<ObjectId>,
}

impl Drawables {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.background.is_none() && self.overlay.is_none()
    }
}

/// The canvas: size, viewport, backdrop layers and the object tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Canvas width in CSS pixels.
    pub width: f64,
    /// Canvas height in CSS pixels.
    pub height: f64,
    /// Device pixel ratio applied to every raster surface.
    #[serde(default = "unit")]
    pub retina_scaling: f64,
    /// Scene-to-canvas transform (pan/zoom).
    #[serde(default = "identity")]
    pub viewport: Affine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<SceneObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_image: Option<SceneObject>,
    /// Top-level objects, bottom first.
    #[serde(default)]
    objects: Vec<SceneObject>,
}

fn identity() -> Affine {
    Affine::IDENTITY
}

impl Scene {
    /// Empty scene of the given CSS size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            retina_scaling: 1.0,
            viewport: Affine::IDENTITY,
            background_color: None,
            background_image: None,
            overlay_image: None,
            objects: Vec::new(),
        }
    }

    /// Append an object on top of the stack, returning its id.
    pub fn add(&mut self, obj: SceneObject) -> ObjectId {
        let id = obj.id;
        self.objects.push(obj);
        id
    }

    /// Top-level objects in draw order.
    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub(crate) fn objects_mut(&mut self) -> &mut [SceneObject] {
        &mut self.objects
    }

    /// Look up any object by id: drawables, top-level objects, or nested children.
    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.background_image
            .iter()
            .chain(self.overlay_image.iter())
            .find(|d| d.id == *id)
            .or_else(|| find(&self.objects, id))
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut SceneObject> {
        if let Some(d) = self.background_image.as_mut().filter(|d| d.id == *id) {
            return Some(d);
        }
        if let Some(d) = self.overlay_image.as_mut().filter(|d| d.id == *id) {
            return Some(d);
        }
        find_mut(&mut self.objects, id)
    }

    /// Product of every ancestor placement and the object's own.
    #[must_use]
    pub fn global_transform(&self, id: &ObjectId) -> Option<Affine> {
        if let Some(d) = self.background_image.iter().chain(self.overlay_image.iter()).find(|d| d.id == *id) {
            return Some(d.local_transform());
        }
        global_in(&self.objects, Affine::IDENTITY, id)
    }

    /// Mark an object and every ancestor dirty. Returns `false` if not found.
    pub fn mark_dirty(&mut self, id: &ObjectId) -> bool {
        for d in self.background_image.iter_mut().chain(self.overlay_image.iter_mut()) {
            if d.id == *id {
                d.mark_dirty();
                return true;
            }
        }
        mark_chain(&mut self.objects, id)
    }

    /// Convert a canvas-space pointer position into scene coordinates.
    #[must_use]
    pub fn pointer_to_scene(&self, canvas_pt: Point) -> Point {
        match geom::invert(self.viewport) {
            Ok(inv) => inv * canvas_pt,
            Err(_) => canvas_pt,
        }
    }

    /// Scene-to-device-pixel transform.
    #[must_use]
    pub fn device_transform(&self) -> Affine {
        Affine::scale(self.retina_scaling) * self.viewport
    }

    /// Raster size in device pixels.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn device_size(&self) -> (u32, u32) {
        let w = (self.width * self.retina_scaling).ceil().max(0.0);
        let h = (self.height * self.retina_scaling).ceil().max(0.0);
        (w as u32, h as u32)
    }

    /// Ids of every erasable object whose bounds meet `quad`, with deep
    /// containers replaced by their qualifying children.
    #[must_use]
    pub fn erase_targets(&self, quad: &Quad) -> Vec<ObjectId> {
        let mut out = Vec::new();
        collect_targets(&self.objects, Affine::IDENTITY, quad, &mut out);
        out
    }

    /// Background and overlay drawables that accept erasing.
    #[must_use]
    pub fn erasable_drawables(&self) -> Drawables {
        let pick = |d: &Option<SceneObject>| d.as_ref().filter(|o| o.is_erasable()).map(|o| o.id);
        Drawables { background: pick(&self.background_image), overlay: pick(&self.overlay_image) }
    }
}

fn find<'a>(objects: &'a [SceneObject], id: &ObjectId) -> Option<&'a SceneObject> {
    objects.iter().find_map(|obj| {
        if obj.id == *id {
            Some(obj)
        } else {
            find(obj.children(), id)
        }
    })
}

fn find_mut<'a>(objects: &'a mut [SceneObject], id: &ObjectId) -> Option<&'a mut SceneObject> {
    for obj in objects {
        if obj.id == *id {
            return Some(obj);
        }
        if let Node::Container(children) = &mut obj.node {
            if let Some(found) = find_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn global_in(objects: &[SceneObject], parent: Affine, id: &ObjectId) -> Option<Affine> {
    objects.iter().find_map(|obj| {
        let global = parent * obj.local_transform();
        if obj.id == *id {
            Some(global)
        } else {
            global_in(obj.children(), global, id)
        }
    })
}

fn mark_chain(objects: &mut [SceneObject], id: &ObjectId) -> bool {
    for obj in objects {
        if obj.id == *id {
            obj.mark_dirty();
            return true;
        }
        if let Node::Container(children) = &mut obj.node {
            if mark_chain(children, id) {
                obj.mark_dirty();
                return true;
            }
        }
    }
    false
}

fn collect_targets(objects: &[SceneObject], parent: Affine, quad: &Quad, out: &mut Vec<ObjectId>) {
    for obj in objects {
        if !obj.is_erasable() {
            continue;
        }
        let global = parent * obj.local_transform();
        if !geom::quads_intersect(&obj.bounding_quad(global), quad) {
            continue;
        }
        match &obj.node {
            Node::Container(children) if obj.erasable == Erasability::Deep => {
                collect_targets(children, global, quad, out);
            }
            _ => out.push(obj.id),
        }
    }
}
