use egui::{Pos2, Rect};

use crate::error::AnnotationError;
use crate::image::PixelSpacing;

/// Default bound on |coordinate| when the image size is unknown
pub const DEFAULT_COORDINATE_LIMIT: f32 = 1.0e6;

/// Where annotation points are allowed to lie
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    /// Inside the image's pixel rectangle
    Image(Rect),
    /// Within `[-limit, limit]` on both axes
    Limit(f32),
}

impl Bounds {
    fn contains(&self, point: Pos2) -> bool {
        match self {
            Self::Image(rect) => rect.contains(point),
            Self::Limit(limit) => point.x.abs() <= *limit && point.y.abs() <= *limit,
        }
    }
}

/// Check every point is finite and in range
pub(crate) fn validate_points(points: &[Pos2], bounds: Bounds) -> Result<(), AnnotationError> {
    for (index, point) in points.iter().enumerate() {
        let reason = if !point.x.is_finite() || !point.y.is_finite() {
            Some("is not finite")
        } else if !bounds.contains(*point) {
            Some("is out of range")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(AnnotationError::InvalidGeometry {
                index,
                x: point.x,
                y: point.y,
                reason,
            });
        }
    }
    Ok(())
}

/// Euclidean distance, scaled per axis when pixel spacing is known
pub(crate) fn distance(a: Pos2, b: Pos2, spacing: Option<PixelSpacing>) -> f64 {
    let (sx, sy) = spacing.map_or((1.0, 1.0), |s| (s.column_mm, s.row_mm));
    let dx = (f64::from(b.x) - f64::from(a.x)) * sx;
    let dy = (f64::from(b.y) - f64::from(a.y)) * sy;
    dx.hypot(dy)
}

/// Unit direction of the segment `from -> to` in physical space, or `None` for a
/// zero-length segment
pub(crate) fn direction(
    from: Pos2,
    to: Pos2,
    spacing: Option<PixelSpacing>,
) -> Option<(f64, f64)> {
    let (sx, sy) = spacing.map_or((1.0, 1.0), |s| (s.column_mm, s.row_mm));
    let dx = (f64::from(to.x) - f64::from(from.x)) * sx;
    let dy = (f64::from(to.y) - f64::from(from.y)) * sy;
    let len = dx.hypot(dy);
    if len == 0.0 || !len.is_finite() {
        return None;
    }
    Some((dx / len, dy / len))
}

/// Angle between two unit vectors in degrees, from the arccosine of their dot product
pub(crate) fn angle_between(u: (f64, f64), v: (f64, f64)) -> f64 {
    // Rounding can push the dot product just outside acos's domain
    let dot = (u.0 * v.0 + u.1 * v.1).clamp(-1.0, 1.0);
    dot.acos().to_degrees()
}

/// Angle between two undirected lines in degrees, in `[0, 90]`
pub(crate) fn acute_angle_between(u: (f64, f64), v: (f64, f64)) -> f64 {
    let dot = (u.0 * v.0 + u.1 * v.1).abs().clamp(0.0, 1.0);
    dot.acos().to_degrees()
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
