use geo::{BoundingRect, Coord, MapCoords, MultiPolygon, Polygon, Rect};

use crate::{geom::{bbox::{rect, rects_intersect}, GeoFrame}, join::normalize_id, Result};

pub const ALASKA_FIPS: &str = "02";
pub const HAWAII_FIPS: &str = "15";

/// Columns checked, in order, for a per-row state indicator.
const STATE_COLUMNS: [&str; 4] = ["STATE", "STATEFP", "STATEFP20", "STATEFP10"];

/// Scale about `center`, then move `center` to `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inset {
    pub center: Coord<f64>,
    pub target: Coord<f64>,
    pub scale: f64,
}

impl Inset {
    #[inline]
    fn apply(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.target.x + (c.x - self.center.x) * self.scale,
            y: self.target.y + (c.y - self.center.y) * self.scale,
        }
    }

    fn polygon(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        polygon.map_coords(|c| self.apply(c))
    }
}

/// Inset placement for Alaska and Hawaii below the contiguous states.
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    pub alaska: Inset,
    pub hawaii: Inset,
}

impl Default for Relocation {
    fn default() -> Self {
        Self {
            alaska: Inset { center: Coord { x: -152.0, y: 58.0 }, target: Coord { x: -117.0, y: 26.5 }, scale: 0.35 },
            hawaii: Inset { center: Coord { x: -157.0, y: 20.5 }, target: Coord { x: -104.5, y: 23.5 }, scale: 1.0 },
        }
    }
}

/// Alaska after unwrapping, so the Aleutians west of 180° are included.
fn alaska_box() -> Rect<f64> { rect(-190.0, 51.0, -129.0, 72.0) }

fn hawaii_box() -> Rect<f64> { rect(-161.0, 18.5, -154.5, 22.5) }

/// Shift a polygon lying in the eastern hemisphere by a full revolution westward.
fn unwrap_antimeridian(polygon: &Polygon<f64>) -> Polygon<f64> {
    match polygon.bounding_rect() {
        Some(bounds) if bounds.min().x > 0.0 => polygon.map_coords(|c| Coord { x: c.x - 360.0, y: c.y }),
        _ => polygon.clone(),
    }
}

impl Relocation {
    fn whole(&self, geometry: &MultiPolygon<f64>, inset: &Inset, unwrap: bool) -> MultiPolygon<f64> {
        MultiPolygon(geometry.0.iter()
            .map(|p| if unwrap { inset.polygon(&unwrap_antimeridian(p)) } else { inset.polygon(p) })
            .collect())
    }

    /// Relocate each part on its own by testing it against the territory boxes.
    fn by_part(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        MultiPolygon(geometry.0.iter()
            .map(|p| {
                let unwrapped = unwrap_antimeridian(p);
                let Some(bounds) = unwrapped.bounding_rect() else { return p.clone() };
                if rects_intersect(&bounds, &alaska_box()) {
                    self.alaska.polygon(&unwrapped)
                } else if rects_intersect(&bounds, &hawaii_box()) {
                    self.hawaii.polygon(p)
                } else {
                    p.clone()
                }
            })
            .collect())
    }

    /// Move Alaska and Hawaii geometries into compact insets.
    ///
    /// Uses a state FIPS column when one is present; otherwise every part whose bounding
    /// box meets either territory's box is moved on its own.
    pub fn apply(&self, frame: &GeoFrame) -> Result<GeoFrame> {
        let states = match STATE_COLUMNS.iter().find(|c| frame.has_column(c)) {
            Some(column) => Some(frame.string_column(column)?.into_iter()
                .map(|v| v.map(|v| normalize_id(&v, 2, "state", 0)))
                .collect::<Vec<_>>()),
            None => None,
        };

        let geometry = frame.geometry().iter().enumerate()
            .map(|(i, g)| {
                let g = g.as_ref()?;
                Some(match states.as_ref().map(|s| s[i].as_deref()) {
                    Some(Some(ALASKA_FIPS)) => self.whole(g, &self.alaska, true),
                    Some(Some(HAWAII_FIPS)) => self.whole(g, &self.hawaii, false),
                    Some(_) => g.clone(),
                    None => self.by_part(g),
                })
            })
            .collect();

        frame.with_geometry(geometry)
    }
}

/// Relocate with the default inset placement.
pub fn relocate_ak_hi(frame: &GeoFrame) -> Result<GeoFrame> {
    Relocation::default().apply(frame)
}
