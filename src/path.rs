//! Path synthesis: turns a decimated stroke into an immutable eraser path.
//!
//! An [`EraserPath`] is a polyline plus a placement transform and the
//! compositing metadata that decides whether drawing it removes coverage
//! (`destination-out`) or adds it (`source-over`). Paths are synthesized in
//! scene coordinates with an identity placement; projection into an object's
//! local space only replaces the placement on a copy.

#[cfg(test)]
#[path = "path_test.rs"]
mod path_test;

use serde::{Deserialize, Serialize};

use crate::config::BrushConfig;
use crate::error::EraseError;
use crate::geom::{self, Affine, Point, Quad, Rect};

/// How a path combines with the pixels beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Composite {
    /// Removes coverage where the path is drawn.
    DestinationOut,
    /// Paints normally; inside a mask this restores coverage.
    SourceOver,
}

/// Stroke end style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

/// Stroke corner style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

/// What the synthesized path is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Committed erase: removes coverage.
    Erase,
    /// Live feedback on the top surface: draws normally in the brush color.
    Preview,
    /// Inverted-mode commit: restores previously erased coverage.
    Restore,
}

/// An immutable eraser stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraserPath {
    points: Vec<Point>,
    #[serde(default = "identity")]
    transform: Affine,
    composite: Composite,
    stroke: String,
    stroke_width: f64,
    line_cap: LineCap,
    line_join: LineJoin,
}

fn identity() -> Affine {
    Affine::IDENTITY
}

/// Build a path from a decimated stroke.
///
/// # Errors
///
/// Returns [`EraseError::EmptyStroke`] when fewer than two points remain.
pub fn synthesize(points: &[Point], brush: &BrushConfig, intent: Intent) -> Result<EraserPath, EraseError> {
    if points.len() < 2 {
        return Err(EraseError::EmptyStroke { points: points.len() });
    }
    let (composite, stroke) = match intent {
        Intent::Erase => (Composite::DestinationOut, "black".to_string()),
        Intent::Preview => (Composite::SourceOver, brush.color.clone()),
        Intent::Restore => (Composite::SourceOver, "white".to_string()),
    };
    Ok(EraserPath {
        points: points.to_vec(),
        transform: Affine::IDENTITY,
        composite,
        stroke,
        stroke_width: brush.width,
        line_cap: brush.line_cap,
        line_join: brush.line_join,
    })
}

impl EraserPath {
    /// Polyline vertices in the path's own space.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Placement of the polyline in its owner's space.
    #[must_use]
    pub fn transform(&self) -> Affine {
        self.transform
    }

    #[must_use]
    pub fn composite(&self) -> Composite {
        self.composite
    }

    #[must_use]
    pub fn stroke(&self) -> &str {
        &self.stroke
    }

    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    #[must_use]
    pub fn line_cap(&self) -> LineCap {
        self.line_cap
    }

    #[must_use]
    pub fn line_join(&self) -> LineJoin {
        self.line_join
    }

    /// Whether drawing this path removes coverage.
    #[must_use]
    pub fn is_erase(&self) -> bool {
        self.composite == Composite::DestinationOut
    }

    /// A copy re-placed by `local`, applied after the current placement.
    #[must_use]
    pub fn projected(&self, local: Affine) -> Self {
        Self { transform: geom::multiply(local, self.transform), ..self.clone() }
    }

    /// SVG path data (`M x y L x y ...`) for the polyline, untransformed.
    #[must_use]
    pub fn svg_path_data(&self) -> String {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{} {} {}", if i == 0 { "M" } else { "L" }, p.x, p.y))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Polyline bounds grown by half the stroke width, in the path's own space.
    #[must_use]
    pub fn stroke_bounds(&self) -> Rect {
        let half = self.stroke_width / 2.0;
        geom::bounding_rect(&self.points).map_or(Rect::ZERO, |r| r.inflate(half, half))
    }

    /// Stroke bounds placed by the path transform.
    #[must_use]
    pub fn bounding_quad(&self) -> Quad {
        geom::corners(self.stroke_bounds(), self.transform)
    }
}
