use std::collections::{BTreeMap, BTreeSet};

use geo::{BooleanOps, BoundingRect, Intersects, MultiPolygon};
use tracing::{debug, warn};

use crate::{
    geom::{bbox::{rects_intersect, BoxIndex}, compactness::drop_slivers, GeoFrame},
    join::normalize_id,
    Error, Result,
};

/// One area-water polygon and its recorded water area, if known.
#[derive(Debug, Clone)]
pub struct WaterBody {
    pub geometry: MultiPolygon<f64>,
    pub area_m2: Option<f64>,
}

/// Supplies water polygons and county outlines for a vintage year.
pub trait WaterSource {
    /// Area-water polygons for one county, keyed by five-digit state+county FIPS.
    fn water(&self, year: u16, county: &str) -> Result<Vec<WaterBody>>;

    /// Every county outline as (five-digit FIPS, geometry), for overlap inference.
    fn counties(&self, year: u16) -> Result<Vec<(String, MultiPolygon<f64>)>>;
}

/// Subtracts large water bodies from geometries, then removes the slivers left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterRemoval {
    /// Water bodies with a smaller recorded area are ignored.
    pub min_area_m2: f64,
    /// Parts with an isoperimetric quotient below this are dropped after subtraction.
    pub sliver_threshold: f64,
}

impl Default for WaterRemoval {
    fn default() -> Self {
        Self { min_area_m2: 10_000.0, sliver_threshold: 0.01 }
    }
}

impl WaterRemoval {
    /// Counties touched by each row, from STATE/COUNTY columns when present,
    /// otherwise inferred geometrically from county outlines.
    fn row_counties(&self, frame: &GeoFrame, year: u16, source: &dyn WaterSource) -> Result<Vec<Vec<String>>> {
        if frame.has_column("STATE") && frame.has_column("COUNTY") {
            let states = frame.string_column("STATE")?;
            let counties = frame.string_column("COUNTY")?;
            return Ok(states.into_iter().zip(counties)
                .map(|(s, c)| match (s, c) {
                    (Some(s), Some(c)) => {
                        vec![normalize_id(&s, 2, "state", year) + &normalize_id(&c, 3, "county", year)]
                    }
                    _ => vec![],
                })
                .collect());
        }

        let outlines = source.counties(year)?;
        let geometry: Vec<Option<MultiPolygon<f64>>> = outlines.iter().map(|(_, g)| Some(g.clone())).collect();
        let index = BoxIndex::new(&geometry);

        Ok(frame.geometry().iter()
            .map(|g| {
                let Some(g) = g else { return vec![] };
                let Some(bounds) = g.bounding_rect() else { return vec![] };
                index.candidates(&bounds).into_iter()
                    .filter(|&i| outlines[i].1.intersects(g))
                    .map(|i| outlines[i].0.clone())
                    .collect()
            })
            .collect())
    }

    /// Remove water from every geometry in `frame`. Rows are never added or dropped.
    pub fn apply(&self, frame: &GeoFrame, year: u16, source: &dyn WaterSource) -> Result<GeoFrame> {
        let row_counties = self.row_counties(frame, year, source)?;

        let needed: BTreeSet<&String> = row_counties.iter().flatten().collect();
        let mut water: BTreeMap<&String, Vec<MultiPolygon<f64>>> = BTreeMap::new();
        for county in needed {
            let bodies = match source.water(year, county) {
                Ok(bodies) => bodies,
                Err(Error::GeometryNotAvailable { url, .. }) => {
                    warn!(county = %county, year, url = %url, "no area-water file; county left unclipped");
                    vec![]
                }
                Err(e) => return Err(e),
            };
            let large: Vec<MultiPolygon<f64>> = bodies.into_iter()
                .filter(|b| b.area_m2.is_none_or(|a| a >= self.min_area_m2))
                .map(|b| b.geometry)
                .collect();
            debug!(county = %county, year, bodies = large.len(), "water bodies above threshold");
            water.insert(county, large);
        }

        let geometry = frame.geometry().iter().zip(&row_counties)
            .map(|(g, counties)| {
                let g = g.as_ref()?;
                let Some(bounds) = g.bounding_rect() else { return Some(g.clone()) };

                let mut clipped = g.clone();
                let mut touched = false;
                for body in counties.iter().filter_map(|c| water.get(c)).flatten() {
                    let overlaps = body.bounding_rect().is_some_and(|b| rects_intersect(&b, &bounds));
                    if overlaps && body.intersects(&clipped) {
                        clipped = clipped.difference(body);
                        touched = true;
                    }
                }
                if !touched { return Some(clipped) }
                drop_slivers(&clipped, self.sliver_threshold)
            })
            .collect();

        frame.with_geometry(geometry)
    }
}
