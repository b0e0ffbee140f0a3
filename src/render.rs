//! Rendering: rasterizes the scene and the live eraser stroke into pixmaps.
//!
//! Two surfaces exist while the engine is alive. `main` holds committed
//! content and, during a gesture, the destructive live erase. `top` holds only
//! transient feedback: the stroke in the brush color, clipped to the Pattern
//! Snapshot so protected content shows through where the eraser passes.
//!
//! Objects with an eraser mask are drawn into a scratch layer and composited
//! back through an alpha clip built by replaying the mask entries in order.
//! This module never mutates scene state.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use tiny_skia::{self as sk, BlendMode, Color, FillRule, Mask, MaskType, Paint, PathBuilder, Pixmap, PixmapPaint};
use tracing::warn;

use crate::config::BrushConfig;
use crate::consts::{DEFAULT_FILL, DEFAULT_STROKE};
use crate::error::EraseError;
use crate::geom::{self, Affine, Point};
use crate::mask::EraserMask;
use crate::path::{Composite, EraserPath, Intent, LineCap, LineJoin, synthesize};
use crate::scene::{Node, Scene, SceneObject, Shape};

/// The committed and transient raster surfaces, in device pixels.
pub struct Surfaces {
    pub main: Pixmap,
    pub top: Pixmap,
}

impl Surfaces {
    /// Allocate both surfaces at `width × height` device pixels.
    ///
    /// # Errors
    ///
    /// Returns [`EraseError::SurfaceAlloc`] for a zero or oversized area.
    pub fn new(width: u32, height: u32) -> Result<Self, EraseError> {
        Ok(Self { main: alloc(width, height)?, top: alloc(width, height)? })
    }

    /// Surfaces sized for `scene` at its retina scaling.
    ///
    /// # Errors
    ///
    /// See [`Surfaces::new`].
    pub fn for_scene(scene: &Scene) -> Result<Self, EraseError> {
        let (w, h) = scene.device_size();
        Self::new(w, h)
    }

    pub fn clear_top(&mut self) {
        self.top.fill(Color::TRANSPARENT);
    }
}

pub(crate) fn alloc(width: u32, height: u32) -> Result<Pixmap, EraseError> {
    Pixmap::new(width, height).ok_or(EraseError::SurfaceAlloc { width, height })
}

// =============================================================
// Colors
// =============================================================

/// Parse a CSS color: `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(...)`, `rgba(...)`,
/// `black`, `white` or `transparent`.
///
/// # Errors
///
/// Returns [`EraseError::Render`] for anything else.
pub fn parse_color(raw: &str) -> Result<Color, EraseError> {
    let s = raw.trim();
    let bad = || EraseError::Render(format!("unsupported color `{raw}`"));

    match s.to_ascii_lowercase().as_str() {
        "black" => return Ok(Color::BLACK),
        "white" => return Ok(Color::WHITE),
        "transparent" => return Ok(Color::TRANSPARENT),
        _ => {}
    }

    if let Some(hex) = s.strip_prefix('#') {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let digits = |range: std::ops::Range<usize>| {
            let pair = hex.get(range).ok_or_else(bad)?;
            u8::from_str_radix(pair, 16).map_err(|_| bad())
        };
        let (r, g, b, a) = match hex.len() {
            3 => (digits(0..1)? * 17, digits(1..2)? * 17, digits(2..3)? * 17, 255),
            6 => (digits(0..2)?, digits(2..4)?, digits(4..6)?, 255),
            8 => (digits(0..2)?, digits(2..4)?, digits(4..6)?, digits(6..8)?),
            _ => return Err(bad()),
        };
        return Ok(Color::from_rgba8(r, g, b, a));
    }

    let body = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))
        .and_then(|b| b.strip_suffix(')'))
        .ok_or_else(bad)?;
    let parts = body
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|_| bad()))
        .collect::<Result<Vec<_>, _>>()?;
    let (r, g, b, a) = match parts.as_slice() {
        [r, g, b] => (*r, *g, *b, 1.0),
        [r, g, b, a] => (*r, *g, *b, *a),
        _ => return Err(bad()),
    };
    let channel = |v: f32| v.clamp(0.0, 255.0) / 255.0;
    Color::from_rgba(channel(r), channel(g), channel(b), a.clamp(0.0, 1.0)).ok_or_else(bad)
}

fn solid(color: &str, fallback: &str) -> Paint<'static> {
    let color = parse_color(color).unwrap_or_else(|err| {
        warn!(%color, %err, "eraser: unparsable color, using fallback");
        parse_color(fallback).unwrap_or(Color::BLACK)
    });
    let mut paint = Paint::default();
    paint.set_color(color);
    paint
}

// =============================================================
// Scene
// =============================================================

/// Rasterize the whole scene into `target`: background color, background
/// image, objects bottom first, overlay image.
///
/// # Errors
///
/// Returns `Err` if a mask layer cannot be allocated or a mask entry carries
/// an unparsable stroke color.
pub fn render_scene(target: &mut Pixmap, scene: &Scene) -> Result<(), EraseError> {
    target.fill(Color::TRANSPARENT);
    if let Some(color) = &scene.background_color {
        fill_background(target, color)?;
    }
    let base = scene.device_transform();
    for obj in scene.background_image.iter().chain(scene.objects().iter()).chain(scene.overlay_image.iter()) {
        draw_object(target, obj, base)?;
    }
    Ok(())
}

/// Flood the whole target with `color`, ignoring the viewport.
pub(crate) fn fill_background(target: &mut Pixmap, color: &str) -> Result<(), EraseError> {
    let color = parse_color(color)?;
    let mut paint = Paint::default();
    paint.set_color(color);
    let rect = sk::Rect::from_xywh(0.0, 0.0, pixel_extent(target.width()), pixel_extent(target.height()))
        .ok_or_else(|| EraseError::Render("empty background area".into()))?;
    target.fill_rect(rect, &paint, sk::Transform::identity(), None);
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn pixel_extent(n: u32) -> f32 {
    n as f32
}

/// Draw one object (and its children) under `parent`, clipped by its mask.
pub(crate) fn draw_object(target: &mut Pixmap, obj: &SceneObject, parent: Affine) -> Result<(), EraseError> {
    if !obj.visible {
        return Ok(());
    }
    let global = parent * obj.local_transform();
    let Some(mask) = &obj.eraser else {
        return draw_node(target, obj, global);
    };

    let mut layer = alloc(target.width(), target.height())?;
    draw_node(&mut layer, obj, global)?;
    let clip = mask_coverage(mask, global, target.width(), target.height())?;
    target.draw_pixmap(0, 0, layer.as_ref(), &PixmapPaint::default(), sk::Transform::identity(), Some(&clip));
    Ok(())
}

fn draw_node(target: &mut Pixmap, obj: &SceneObject, global: Affine) -> Result<(), EraseError> {
    match &obj.node {
        Node::Container(children) => {
            for child in children {
                draw_object(target, child, global)?;
            }
            Ok(())
        }
        Node::Leaf(shape) => {
            draw_shape(target, obj, shape, global);
            Ok(())
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn draw_shape(target: &mut Pixmap, obj: &SceneObject, shape: &Shape, global: Affine) {
    let Some(outline) = shape_path(shape) else {
        return;
    };
    let ts = geom::to_skia(global);
    let open = matches!(shape, Shape::Polyline { closed: false, .. });

    if !open {
        let paint = solid(obj.fill.as_deref().unwrap_or(DEFAULT_FILL), DEFAULT_FILL);
        target.fill_path(&outline, &paint, FillRule::Winding, ts, None);
    }

    let width = if open { obj.stroke_width.max(1.0) } else { obj.stroke_width };
    if width > 0.0 {
        let paint = solid(obj.stroke.as_deref().unwrap_or(DEFAULT_STROKE), DEFAULT_STROKE);
        let stroke = sk::Stroke { width: width as f32, ..sk::Stroke::default() };
        target.stroke_path(&outline, &paint, &stroke, ts, None);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn shape_path(shape: &Shape) -> Option<sk::Path> {
    match shape {
        Shape::Rect { width, height } => {
            sk::Rect::from_xywh((-width / 2.0) as f32, (-height / 2.0) as f32, *width as f32, *height as f32)
                .map(PathBuilder::from_rect)
        }
        Shape::Ellipse { width, height } => {
            sk::Rect::from_xywh((-width / 2.0) as f32, (-height / 2.0) as f32, *width as f32, *height as f32)
                .and_then(PathBuilder::from_oval)
        }
        Shape::Polyline { points, closed } => polyline(points, *closed),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn polyline(points: &[Point], closed: bool) -> Option<sk::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

// =============================================================
// Masks
// =============================================================

/// Alpha clip for an object placed at `global` (device space).
///
/// Coverage starts fully opaque; entries are replayed in insertion order so
/// erase entries punch holes and restore entries fill them back. An inverted
/// mask keeps only the erased regions.
///
/// # Errors
///
/// Returns `Err` if the coverage buffer cannot be allocated or an entry has an
/// unparsable stroke color.
pub fn mask_coverage(mask: &EraserMask, global: Affine, width: u32, height: u32) -> Result<Mask, EraseError> {
    let mut coverage = alloc(width, height)?;
    coverage.fill(Color::BLACK);
    for entry in mask.paths() {
        stroke_path(&mut coverage, entry, global)?;
    }
    if mask.is_inverted() {
        for px in coverage.data_mut().chunks_exact_mut(4) {
            let erased = 255 - px[3];
            px.copy_from_slice(&[0, 0, 0, erased]);
        }
    }
    Ok(Mask::from_pixmap(coverage.as_ref(), MaskType::Alpha))
}

/// Stroke an eraser path placed at `base * path.transform()`.
///
/// # Errors
///
/// Returns [`EraseError::Render`] for an unparsable stroke color.
#[allow(clippy::cast_possible_truncation)]
pub fn stroke_path(target: &mut Pixmap, path: &EraserPath, base: Affine) -> Result<(), EraseError> {
    let Some(geometry) = polyline(path.points(), false) else {
        return Ok(());
    };
    let mut paint = Paint::default();
    paint.set_color(parse_color(path.stroke())?);
    paint.blend_mode = match path.composite() {
        Composite::DestinationOut => BlendMode::DestinationOut,
        Composite::SourceOver => BlendMode::SourceOver,
    };
    let stroke = sk::Stroke {
        width: path.stroke_width() as f32,
        line_cap: skia_cap(path.line_cap()),
        line_join: skia_join(path.line_join()),
        ..sk::Stroke::default()
    };
    target.stroke_path(&geometry, &paint, &stroke, geom::to_skia(base * path.transform()), None);
    Ok(())
}

fn skia_cap(cap: LineCap) -> sk::LineCap {
    match cap {
        LineCap::Butt => sk::LineCap::Butt,
        LineCap::Round => sk::LineCap::Round,
        LineCap::Square => sk::LineCap::Square,
    }
}

fn skia_join(join: LineJoin) -> sk::LineJoin {
    match join {
        LineJoin::Miter => sk::LineJoin::Miter,
        LineJoin::Round => sk::LineJoin::Round,
        LineJoin::Bevel => sk::LineJoin::Bevel,
    }
}

// =============================================================
// Live stroke
// =============================================================

/// Draw the in-progress stroke.
///
/// Outside inverted mode the erase is stroked destructively onto `main`.
/// `top` is always cleared and redrawn with the preview stroke, then the
/// pattern is composited with `source-in` so only protected pixels remain
/// where the stroke passes. Fewer than two points draw nothing.
///
/// # Errors
///
/// Returns `Err` if the brush color cannot be parsed.
pub fn draw_live_stroke(
    surfaces: &mut Surfaces,
    scene: &Scene,
    points: &[Point],
    brush: &BrushConfig,
    pattern: Option<&Pixmap>,
) -> Result<(), EraseError> {
    if points.len() < 2 {
        return Ok(());
    }
    let base = scene.device_transform();

    if !brush.inverted {
        let erase = synthesize(points, brush, Intent::Erase)?;
        stroke_path(&mut surfaces.main, &erase, base)?;
    }

    surfaces.clear_top();
    let preview = synthesize(points, brush, Intent::Preview)?;
    stroke_path(&mut surfaces.top, &preview, base)?;
    if let Some(pattern) = pattern {
        let paint = PixmapPaint { blend_mode: BlendMode::SourceIn, ..PixmapPaint::default() };
        surfaces.top.draw_pixmap(0, 0, pattern.as_ref(), &paint, sk::Transform::identity(), None);
    }
    Ok(())
}
