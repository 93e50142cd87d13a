use std::f64::consts::PI;

use geo::{Area, LineString, MultiPolygon, Polygon};

/// Planar length of a ring or line.
pub fn ring_length(ring: &LineString<f64>) -> f64 {
    ring.0.windows(2)
        .map(|w| (w[1].x - w[0].x).hypot(w[1].y - w[0].y))
        .sum()
}

/// Perimeter of a polygon, including the boundaries of its holes.
pub fn perimeter(polygon: &Polygon<f64>) -> f64 {
    ring_length(polygon.exterior()) + polygon.interiors().iter().map(ring_length).sum::<f64>()
}

/// Isoperimetric quotient (Polsby-Popper score).
/// Formula: 4 * pi * area / (perimeter^2), in [0, 1].
/// Degenerate polygons (zero perimeter or zero area) score 0.
pub fn isoperimetric_quotient(polygon: &Polygon<f64>) -> f64 {
    let perimeter = perimeter(polygon);
    if perimeter == 0.0 { return 0.0 }
    let area = polygon.unsigned_area();
    (4.0 * PI * area / (perimeter * perimeter)).clamp(0.0, 1.0)
}

/// Drop parts whose isoperimetric quotient falls below `threshold`.
/// Returns `None` if nothing survives.
pub fn drop_slivers(geometry: &MultiPolygon<f64>, threshold: f64) -> Option<MultiPolygon<f64>> {
    let kept: Vec<Polygon<f64>> = geometry.0.iter()
        .filter(|p| isoperimetric_quotient(p) >= threshold)
        .cloned()
        .collect();
    if kept.is_empty() { None } else { Some(MultiPolygon(kept)) }
}
