//! Geometry helpers: point math, stroke decimation, affine composition, and
//! bounds intersection.
//!
//! Points and transforms are [`kurbo`] types. Affine matrices follow the
//! canvas convention `[a, b, c, d, e, f]` where `x' = a·x + c·y + e` and
//! `y' = b·x + d·y + f`.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

pub use kurbo::{Affine, Point, Rect, Vec2};

use crate::consts::SINGULAR_EPSILON;
use crate::error::EraseError;

/// Oriented quadrilateral given by its four corners in winding order.
pub type Quad = [Point; 4];

// =============================================================
// Points and vectors
// =============================================================

/// Angle from `q` to `p`, measured as `atan2(p.x − q.x, p.y − q.y)`.
#[must_use]
pub fn angle_between(p: Point, q: Point) -> f64 {
    (p.x - q.x).atan2(p.y - q.y)
}

/// Rescale `v` to magnitude `length`. A zero vector is returned unchanged.
#[must_use]
pub fn normalize(v: Vec2, length: f64) -> Vec2 {
    let current = v.hypot();
    if current > 0.0 { v * (length / current) } else { v }
}

/// Thin a stroke so consecutive retained samples are at least `min_distance`
/// apart. The first and last samples are always kept.
#[must_use]
pub fn decimate(points: &[Point], min_distance: f64) -> Vec<Point> {
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut kept = vec![first];
    let mut anchor = first;
    for &pt in &points[1..points.len() - 1] {
        if pt.distance(anchor) >= min_distance {
            kept.push(pt);
            anchor = pt;
        }
    }
    kept.push(last);
    kept
}

// =============================================================
// Affine transforms
// =============================================================

/// Invert an affine transform.
///
/// # Errors
///
/// Returns [`EraseError::NonInvertible`] when the determinant is not finite or
/// its magnitude is below [`SINGULAR_EPSILON`] (e.g. a zero-scale object).
pub fn invert(t: Affine) -> Result<Affine, EraseError> {
    let det = t.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(EraseError::NonInvertible { det });
    }
    Ok(t.inverse())
}

/// Compose two transforms: the result applies `b` first, then `a`.
#[must_use]
pub fn multiply(a: Affine, b: Affine) -> Affine {
    a * b
}

/// Map every point through `t`.
#[must_use]
pub fn apply_to(points: &[Point], t: Affine) -> Vec<Point> {
    points.iter().map(|&p| t * p).collect()
}

/// Convert a kurbo transform into a tiny-skia transform.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn to_skia(t: Affine) -> tiny_skia::Transform {
    let [a, b, c, d, e, f] = t.as_coeffs();
    tiny_skia::Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

// =============================================================
// Bounds intersection
// =============================================================

/// The four corners of `rect` mapped through `t`.
#[must_use]
pub fn corners(rect: Rect, t: Affine) -> Quad {
    [
        t * Point::new(rect.x0, rect.y0),
        t * Point::new(rect.x1, rect.y0),
        t * Point::new(rect.x1, rect.y1),
        t * Point::new(rect.x0, rect.y1),
    ]
}

/// Separating-axis test for two convex quads. Touching edges count as an
/// intersection, as does full containment of one quad inside the other.
#[must_use]
pub fn quads_intersect(a: &Quad, b: &Quad) -> bool {
    for quad in [a, b] {
        for i in 0..4 {
            let edge = quad[(i + 1) % 4] - quad[i];
            let axis = Vec2::new(-edge.y, edge.x);
            if axis.hypot() == 0.0 {
                continue;
            }
            let (a_min, a_max) = project(a, axis);
            let (b_min, b_max) = project(b, axis);
            if a_max < b_min || b_max < a_min {
                return false;
            }
        }
    }
    true
}

fn project(quad: &Quad, axis: Vec2) -> (f64, f64) {
    quad.iter()
        .map(|p| p.to_vec2().dot(axis))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Axis-aligned bounding box of a point set, or `None` when empty.
#[must_use]
pub fn bounding_rect(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    Some(
        rest.iter()
            .fold(Rect::from_points(*first, *first), |r, &p| r.union_pt(p)),
    )
}
