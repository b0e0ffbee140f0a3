//! Brush configuration: defaults, environment overrides, and sparse updates.

use std::env::{self, VarError};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::{DEFAULT_BRUSH_COLOR, DEFAULT_BRUSH_WIDTH, DEFAULT_DECIMATE};
use crate::error::EraseError;
use crate::path::{LineCap, LineJoin};
use crate::render;

/// Eraser brush parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    /// Stroke width in scene units.
    pub width: f64,
    /// Minimum spacing between retained samples at finalization. `0` disables
    /// decimation.
    pub decimate: f64,
    /// Restore previously erased coverage instead of removing it.
    pub inverted: bool,
    /// Preview color for the live stroke.
    pub color: String,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BRUSH_WIDTH,
            decimate: DEFAULT_DECIMATE,
            inverted: false,
            color: DEFAULT_BRUSH_COLOR.to_string(),
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
        }
    }
}

/// Sparse update for a brush. Only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrushOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_cap: Option<LineCap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_join: Option<LineJoin>,
}

impl BrushConfig {
    /// Build a brush from environment variables, falling back to defaults.
    ///
    /// Optional:
    /// - `ERASER_WIDTH`: default 10
    /// - `ERASER_DECIMATE`: default 0.4
    /// - `ERASER_INVERTED`: `true`/`false`/`1`/`0`, default false
    /// - `ERASER_COLOR`: default `#000000`
    /// - `ERASER_LINE_CAP`: `butt`, `round` (default) or `square`
    /// - `ERASER_LINE_JOIN`: `miter`, `round` (default) or `bevel`
    ///
    /// # Errors
    ///
    /// Returns [`EraseError::Config`] when a variable is present but
    /// unparsable, or when the resulting brush fails [`Self::validate`].
    pub fn from_env() -> Result<Self, EraseError> {
        let defaults = Self::default();
        let cfg = Self {
            width: env_parse_f64("ERASER_WIDTH", defaults.width)?,
            decimate: env_parse_f64("ERASER_DECIMATE", defaults.decimate)?,
            inverted: parse_bool(env_var("ERASER_INVERTED").as_deref())?,
            color: env_var("ERASER_COLOR").unwrap_or(defaults.color),
            line_cap: parse_line_cap(env_var("ERASER_LINE_CAP").as_deref())?,
            line_join: parse_line_join(env_var("ERASER_LINE_JOIN").as_deref())?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject brushes that cannot produce a sensible stroke.
    ///
    /// # Errors
    ///
    /// Returns [`EraseError::Config`] for a non-finite or non-positive width,
    /// a negative or non-finite decimation distance, or a color
    /// [`render::parse_color`] cannot read.
    pub fn validate(&self) -> Result<(), EraseError> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(EraseError::Config(format!("width must be positive, got {}", self.width)));
        }
        if !self.decimate.is_finite() || self.decimate < 0.0 {
            return Err(EraseError::Config(format!("decimate must be >= 0, got {}", self.decimate)));
        }
        if let Err(err) = render::parse_color(&self.color) {
            return Err(EraseError::Config(format!("color: {err}")));
        }
        Ok(())
    }

    /// Merge a sparse update into this brush.
    pub fn apply(&mut self, opts: &BrushOptions) {
        if let Some(w) = opts.width {
            self.width = w;
        }
        if let Some(d) = opts.decimate {
            self.decimate = d;
        }
        if let Some(inv) = opts.inverted {
            self.inverted = inv;
        }
        if let Some(ref color) = opts.color {
            self.color.clone_from(color);
        }
        if let Some(cap) = opts.line_cap {
            self.line_cap = cap;
        }
        if let Some(join) = opts.line_join {
            self.line_join = join;
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(raw) => Some(raw),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(_)) => {
            warn!(key, "eraser: ignoring non-unicode environment variable");
            None
        }
    }
}

fn env_parse_f64(key: &str, default: f64) -> Result<f64, EraseError> {
    match env_var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|e| EraseError::Config(format!("{key}={raw}: {e}"))),
    }
}

fn parse_bool(raw: Option<&str>) -> Result<bool, EraseError> {
    match raw.unwrap_or("false") {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(EraseError::Config(format!("unknown ERASER_INVERTED: {other}"))),
    }
}

fn parse_line_cap(raw: Option<&str>) -> Result<LineCap, EraseError> {
    match raw.unwrap_or("round") {
        "butt" => Ok(LineCap::Butt),
        "round" => Ok(LineCap::Round),
        "square" => Ok(LineCap::Square),
        other => Err(EraseError::Config(format!("unknown ERASER_LINE_CAP: {other}"))),
    }
}

fn parse_line_join(raw: Option<&str>) -> Result<LineJoin, EraseError> {
    match raw.unwrap_or("round") {
        "miter" => Ok(LineJoin::Miter),
        "round" => Ok(LineJoin::Round),
        "bevel" => Ok(LineJoin::Bevel),
        other => Err(EraseError::Config(format!("unknown ERASER_LINE_JOIN: {other}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
