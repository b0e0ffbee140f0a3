use futures::executor::block_on;
use tiny_skia::Pixmap;
use tracing::{debug, warn};
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::accumulate::{Accumulator, PathDuplicator};
use crate::config::{BrushConfig, BrushOptions};
use crate::error::EraseError;
use crate::geom::{self, Point};
use crate::input::{InputState, Pointer};
use crate::path::{EraserPath, Intent, synthesize};
use crate::pattern::PatternSnapshot;
use crate::render::{self, Surfaces};
use crate::scene::{Drawables, ObjectId, Scene};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Events returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A gesture began and the pattern snapshot was captured.
    ErasingStarted,
    /// Pointer-down could not start a gesture.
    ErasingAborted { reason: String },
    /// A finalized path is about to be folded into masks.
    BeforePathCreated(EraserPath),
    /// One object's mask received `path` (already in its local space).
    EraseApplied { id: ObjectId, path: EraserPath },
    /// The gesture is over. `path` is `None` when the stroke was too short.
    ErasingEnded { path: Option<EraserPath>, targets: Vec<ObjectId>, drawables: Drawables },
    /// The finalized path in scene coordinates.
    PathCreated(EraserPath),
    RenderNeeded,
}

/// Core eraser state: everything that doesn't depend on canvas elements.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EraserCore {
    pub scene: Scene,
    pub brush: BrushConfig,
    pub input: InputState,
    surfaces: Option<Surfaces>,
    pattern: Option<PatternSnapshot>,
    accumulator: Accumulator,
}

impl Default for EraserCore {
    fn default() -> Self {
        Self::new(Scene::new(0.0, 0.0), BrushConfig::default())
    }
}

impl EraserCore {
    #[must_use]
    pub fn new(scene: Scene, brush: BrushConfig) -> Self {
        let surfaces = allocate(&scene);
        let mut core =
            Self { scene, brush, input: InputState::Idle, surfaces, pattern: None, accumulator: Accumulator::default() };
        core.refresh();
        core
    }

    /// Swap the path duplication strategy used at finalization.
    #[must_use]
    pub fn with_duplicator(mut self, duplicator: impl PathDuplicator + 'static) -> Self {
        self.accumulator = Accumulator::new(duplicator);
        self
    }

    // --- Configuration ---

    /// Replace the brush.
    ///
    /// # Errors
    ///
    /// Returns [`EraseError::Config`] if the brush fails validation; the
    /// current brush is kept.
    pub fn set_brush(&mut self, brush: BrushConfig) -> Result<(), EraseError> {
        brush.validate()?;
        self.brush = brush;
        Ok(())
    }

    /// Apply a sparse brush update.
    ///
    /// # Errors
    ///
    /// See [`Self::set_brush`].
    pub fn update_brush(&mut self, opts: &BrushOptions) -> Result<(), EraseError> {
        let mut next = self.brush.clone();
        next.apply(opts);
        self.set_brush(next)
    }

    /// Resize the canvas. An active gesture is aborted because its pattern
    /// no longer matches the surfaces.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        self.scene.width = width_css;
        self.scene.height = height_css;
        self.scene.retina_scaling = dpr;
        self.surfaces = allocate(&self.scene);

        let mut actions = Vec::new();
        if self.input.finish().is_some() {
            self.pattern = None;
            warn!("eraser: viewport changed mid-gesture, gesture aborted");
            actions.push(Action::ErasingAborted { reason: "viewport changed".into() });
        }
        self.refresh();
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Replace the scene, abandoning any gesture in progress.
    pub fn load_scene(&mut self, scene: Scene) {
        self.input = InputState::Idle;
        self.pattern = None;
        self.surfaces = allocate(&scene);
        self.scene = scene;
        self.refresh();
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, canvas_pt: Point, pointer: Pointer) -> Vec<Action> {
        if !pointer.is_main() {
            return Vec::new();
        }
        if self.input.is_erasing() {
            debug!("eraser: gesture already active, pointer-down ignored");
            return Vec::new();
        }

        let pattern = match PatternSnapshot::capture(&mut self.scene, self.brush.inverted) {
            Ok(pattern) => pattern,
            Err(err) => {
                warn!(code = err.error_code(), %err, "eraser: pattern capture failed, gesture aborted");
                return vec![Action::ErasingAborted { reason: err.to_string() }];
            }
        };
        self.pattern = Some(pattern);

        let start = self.scene.pointer_to_scene(canvas_pt);
        self.input.begin(start);
        debug!(x = start.x, y = start.y, inverted = self.brush.inverted, "eraser: gesture started");
        vec![Action::ErasingStarted]
    }

    pub fn on_pointer_move(&mut self, canvas_pt: Point, pointer: Pointer) -> Vec<Action> {
        if !pointer.is_main() {
            return Vec::new();
        }
        let pt = self.scene.pointer_to_scene(canvas_pt);
        if !self.input.push(pt) {
            return Vec::new();
        }
        self.draw_live();
        vec![Action::RenderNeeded]
    }

    /// End the gesture and commit it, blocking until every mask append lands.
    pub fn on_pointer_up(&mut self, pointer: Pointer) -> Vec<Action> {
        if !pointer.is_main() {
            return Vec::new();
        }
        block_on(self.finish_gesture())
    }

    /// Finalize the active gesture: decimate, synthesize, fold into every
    /// intersecting mask, and re-render. Empty when no gesture is active.
    pub async fn finish_gesture(&mut self) -> Vec<Action> {
        let Some(stroke) = self.input.finish() else {
            return Vec::new();
        };
        self.pattern = None;
        if let Some(surfaces) = self.surfaces.as_mut() {
            surfaces.clear_top();
        }

        let sampled = stroke.len();
        let points = if self.brush.decimate > 0.0 { geom::decimate(&stroke, self.brush.decimate) } else { stroke };
        let intent = if self.brush.inverted { Intent::Restore } else { Intent::Erase };

        let path = match synthesize(&points, &self.brush, intent) {
            Ok(path) => path,
            Err(err) => {
                debug!(sampled, code = err.error_code(), "eraser: stroke too short, nothing committed");
                self.refresh();
                return vec![
                    Action::ErasingEnded { path: None, targets: Vec::new(), drawables: Drawables::default() },
                    Action::RenderNeeded,
                ];
            }
        };

        let mut actions = vec![Action::BeforePathCreated(path.clone())];

        let candidates = self.scene.erasable_drawables();
        let mut targets: Vec<ObjectId> = candidates.background.into_iter().chain(candidates.overlay).collect();
        targets.extend(self.scene.erase_targets(&path.bounding_quad()));

        let applied = self.accumulator.fold(&mut self.scene, &path, &targets, self.brush.inverted).await;

        let landed = |id: Option<ObjectId>| id.filter(|id| applied.iter().any(|a| a.id == *id));
        let drawables = Drawables { background: landed(candidates.background), overlay: landed(candidates.overlay) };
        let objects: Vec<ObjectId> = applied
            .iter()
            .map(|a| a.id)
            .filter(|id| Some(*id) != drawables.background && Some(*id) != drawables.overlay)
            .collect();
        debug!(sampled, kept = path.points().len(), targets = objects.len(), "eraser: gesture committed");

        self.refresh();
        actions.extend(applied.into_iter().map(|a| Action::EraseApplied { id: a.id, path: a.path }));
        actions.push(Action::ErasingEnded { path: Some(path.clone()), targets: objects, drawables });
        actions.push(Action::RenderNeeded);
        actions.push(Action::PathCreated(path));
        actions
    }

    // --- Render ---

    /// Re-render `main` from the scene. While a gesture is active the live
    /// stroke is re-applied on top so the in-progress erase stays visible.
    ///
    /// # Errors
    ///
    /// Returns `Err` if rasterization fails.
    pub fn render(&mut self) -> Result<(), EraseError> {
        let Some(surfaces) = self.surfaces.as_mut() else {
            return Ok(());
        };
        render::render_scene(&mut surfaces.main, &self.scene)?;
        match &self.input {
            InputState::Erasing { stroke } => {
                let pattern = self.pattern.as_ref().and_then(PatternSnapshot::pixmap);
                render::draw_live_stroke(surfaces, &self.scene, stroke, &self.brush, pattern)
            }
            InputState::Idle => {
                surfaces.clear_top();
                Ok(())
            }
        }
    }

    fn refresh(&mut self) {
        if let Err(err) = self.render() {
            warn!(code = err.error_code(), %err, "eraser: render failed");
        }
    }

    fn draw_live(&mut self) {
        let Some(surfaces) = self.surfaces.as_mut() else {
            return;
        };
        let pattern = self.pattern.as_ref().and_then(PatternSnapshot::pixmap);
        if let Err(err) = render::draw_live_stroke(surfaces, &self.scene, self.input.stroke(), &self.brush, pattern) {
            warn!(code = err.error_code(), %err, "eraser: live stroke render failed");
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn is_erasing(&self) -> bool {
        self.input.is_erasing()
    }

    #[must_use]
    pub fn surfaces(&self) -> Option<&Surfaces> {
        self.surfaces.as_ref()
    }

    /// The snapshot captured for the active gesture.
    #[must_use]
    pub fn pattern(&self) -> Option<&PatternSnapshot> {
        self.pattern.as_ref()
    }
}

fn allocate(scene: &Scene) -> Option<Surfaces> {
    match Surfaces::for_scene(scene) {
        Ok(surfaces) => Some(surfaces),
        Err(err) => {
            debug!(code = err.error_code(), %err, "eraser: canvas has no drawable area");
            None
        }
    }
}

/// The browser eraser. Wraps `EraserCore` and presents its surfaces to the
/// main and top canvas elements.
pub struct Engine {
    main: HtmlCanvasElement,
    top: HtmlCanvasElement,
    pub core: EraserCore,
}

impl Engine {
    /// Create an engine bound to the main (committed) and top (feedback) canvases.
    #[must_use]
    pub fn new(main: HtmlCanvasElement, top: HtmlCanvasElement, scene: Scene, brush: BrushConfig) -> Self {
        Self { main, top, core: EraserCore::new(scene, brush) }
    }

    // --- Delegated configuration ---

    /// # Errors
    ///
    /// See [`EraserCore::set_brush`].
    pub fn set_brush(&mut self, brush: BrushConfig) -> Result<(), EraseError> {
        self.core.set_brush(brush)
    }

    /// # Errors
    ///
    /// See [`EraserCore::set_brush`].
    pub fn update_brush(&mut self, opts: &BrushOptions) -> Result<(), EraseError> {
        self.core.update_brush(opts)
    }

    /// Resize both canvases to the device-pixel size of the new viewport.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        let actions = self.core.set_viewport(width_css, height_css, dpr);
        let (w, h) = self.core.scene.device_size();
        for canvas in [&self.main, &self.top] {
            canvas.set_width(w);
            canvas.set_height(h);
        }
        actions
    }

    // --- Delegated input ---

    pub fn on_pointer_down(&mut self, canvas_pt: Point, pointer: Pointer) -> Vec<Action> {
        self.core.on_pointer_down(canvas_pt, pointer)
    }

    pub fn on_pointer_move(&mut self, canvas_pt: Point, pointer: Pointer) -> Vec<Action> {
        self.core.on_pointer_move(canvas_pt, pointer)
    }

    pub fn on_pointer_up(&mut self, pointer: Pointer) -> Vec<Action> {
        self.core.on_pointer_up(pointer)
    }

    // --- Render ---

    /// Re-render and present both surfaces.
    ///
    /// # Errors
    ///
    /// Returns `Err` if rasterization or a canvas call fails.
    pub fn render(&mut self) -> Result<(), EraseError> {
        self.core.render()?;
        self.present()
    }

    /// Copy the current surfaces to the canvases without re-rendering.
    ///
    /// # Errors
    ///
    /// Returns [`EraseError::Render`] if a canvas call fails.
    pub fn present(&self) -> Result<(), EraseError> {
        let Some(surfaces) = self.core.surfaces() else {
            return Ok(());
        };
        blit(&self.main, &surfaces.main)?;
        blit(&self.top, &surfaces.top)
    }

    #[must_use]
    pub fn is_erasing(&self) -> bool {
        self.core.is_erasing()
    }
}

fn blit(canvas: &HtmlCanvasElement, pixmap: &Pixmap) -> Result<(), EraseError> {
    let ctx = canvas
        .get_context("2d")
        .map_err(js_error)?
        .ok_or_else(|| EraseError::Render("2d context unavailable".into()))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| EraseError::Render("context is not 2d".into()))?;

    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let image = ImageData::new_with_u8_clamped_array_and_sh(Clamped(&rgba), pixmap.width(), pixmap.height())
        .map_err(js_error)?;
    ctx.put_image_data(&image, 0.0, 0.0).map_err(js_error)
}

fn js_error(err: JsValue) -> EraseError {
    EraseError::Render(format!("{err:?}"))
}
