//! Shared numeric constants for the eraser crate.

// ── Brush defaults ──────────────────────────────────────────────

/// Default eraser stroke width in scene units.
pub const DEFAULT_BRUSH_WIDTH: f64 = 10.0;

/// Default minimum spacing between retained stroke samples.
pub const DEFAULT_DECIMATE: f64 = 0.4;

/// Default preview color drawn on the top surface.
pub const DEFAULT_BRUSH_COLOR: &str = "#000000";

// ── Geometry ────────────────────────────────────────────────────

/// Determinants below this magnitude are treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-12;

// ── Rendering ───────────────────────────────────────────────────

/// Fill color used when an object has no parsable fill.
pub const DEFAULT_FILL: &str = "#D94B4B";

/// Stroke color used when an object has no parsable stroke.
pub const DEFAULT_STROKE: &str = "#1F1A17";
