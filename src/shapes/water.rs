use anyhow::anyhow;
use geo::MultiPolygon;

use crate::{
    geom::{float_column, WaterBody, WaterSource},
    join::normalize_id,
    shapes::{BoundarySource, GeoLevelKind, Resolution, Scope, ShapeSource, ShapefileDescriptor},
    Result,
};

/// Area-water column in TIGER `areawater` files, in square meters.
const WATER_AREA_COLUMN: &str = "AWATER";

/// Water polygons from per-county TIGER `areawater` files and county outlines
/// from the national generalized county file.
pub struct BoundaryWater<'a, S: ShapeSource + ?Sized> {
    shapes: &'a S,
    resolution: Resolution,
}

impl<'a, S: ShapeSource + ?Sized> BoundaryWater<'a, S> {
    pub fn new(shapes: &'a S) -> Self {
        Self { shapes, resolution: Resolution::R500k }
    }

    /// Resolution of the county outlines used to infer overlap.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }
}

impl<S: ShapeSource + ?Sized> WaterSource for BoundaryWater<'_, S> {
    fn water(&self, year: u16, county: &str) -> Result<Vec<WaterBody>> {
        let frame = self.shapes.load(&ShapefileDescriptor::areawater(year, county))?;
        let areas = match float_column(frame.data(), WATER_AREA_COLUMN) {
            Ok(areas) => areas,
            Err(_) => vec![None; frame.len()],
        };

        let (_, geometry) = frame.into_parts();
        Ok(geometry.into_iter().zip(areas)
            .filter_map(|(g, area_m2)| g.map(|geometry| WaterBody { geometry, area_m2 }))
            .collect())
    }

    fn counties(&self, year: u16) -> Result<Vec<(String, MultiPolygon<f64>)>> {
        let rule = GeoLevelKind::County.rule(year, BoundarySource::Cartographic);
        let frame = self.shapes.load(&rule.descriptor(Scope::Us, self.resolution))?;

        let [state, county] = rule.columns() else {
            return Err(anyhow!("county files must join on state and county").into());
        };
        let states = frame.string_column(&state.shape)?;
        let counties = frame.string_column(&county.shape)?;

        Ok(states.into_iter().zip(counties).zip(frame.geometry())
            .filter_map(|((s, c), g)| {
                let fips = format!("{}{}",
                    normalize_id(s.as_deref()?, state.width, state.level, year),
                    normalize_id(c.as_deref()?, county.width, county.level, year));
                Some((fips, g.clone()?))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geom::GeoFrame, Error};
    use geo::polygon;
    use polars::prelude::{Column, DataFrame};

    struct Files;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0), (x: x0 + size, y: y0), (x: x0 + size, y: y0 + size), (x: x0, y: y0 + size),
        ]])
    }

    impl ShapeSource for Files {
        fn load(&self, descriptor: &ShapefileDescriptor) -> Result<GeoFrame> {
            match descriptor.name().as_str() {
                "cb_2020_us_county_500k" => GeoFrame::new(
                    DataFrame::new(vec![
                        Column::new("STATEFP".into(), vec!["36", "36"]),
                        Column::new("COUNTYFP".into(), vec!["1", "003"]),
                    ])?,
                    vec![Some(square(0.0, 0.0, 1.0)), None],
                ),
                "tl_2020_36001_areawater" => GeoFrame::new(
                    DataFrame::new(vec![Column::new("AWATER".into(), vec![Some(5.0e6), None])])?,
                    vec![Some(square(0.0, 0.0, 0.5)), Some(square(0.5, 0.5, 0.1))],
                ),
                _ => Err(Error::GeometryNotAvailable { url: descriptor.name(), year: descriptor.year(), status: 404 }),
            }
        }
    }

    #[test]
    fn county_outlines_keyed_by_fips() {
        let counties = BoundaryWater::new(&Files).counties(2020).unwrap();
        assert_eq!(counties.len(), 1);
        assert_eq!(counties[0].0, "36001");
    }

    #[test]
    fn water_bodies_carry_recorded_area() {
        let bodies = BoundaryWater::new(&Files).water(2020, "36001").unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].area_m2, Some(5.0e6));
        assert_eq!(bodies[1].area_m2, None);

        assert!(matches!(
            BoundaryWater::new(&Files).water(2020, "36005"),
            Err(Error::GeometryNotAvailable { status: 404, .. }),
        ));
    }
}
