use std::path::Path;

use anyhow::{anyhow, ensure};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use polars::prelude::{Column, DataFrame};
use shapefile::{self as shp, dbase::{FieldValue, Record}, Shape};

use crate::{geom::GeoFrame, Error, Result};

/// Reads all shapes + attribute records from a given `.shp` file path.
///
/// Character attributes become string columns, numeric attributes become `f64` columns.
/// Null and non-areal shapes yield a `None` geometry.
pub fn read_shapefile(path: &Path) -> Result<GeoFrame> {
    let shp_error = |e: shp::Error| Error::Shapefile {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut reader = shp::Reader::from_path(path).map_err(shp_error)?;

    let mut geometry = Vec::new();
    let mut records = Vec::new();
    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item.map_err(shp_error)?;
        geometry.push(shape_to_multipolygon(shape));
        records.push(record);
    }

    GeoFrame::new(records_to_dataframe(&records)?, geometry)
}

/// Parse every shape and record, checking the index agrees with the data.
/// Returns the number of shapes.
pub(crate) fn check_shapefile(path: &Path) -> anyhow::Result<usize> {
    let mut reader = shp::Reader::from_path(path)
        .map_err(|e| anyhow!("failed to open shapefile {}: {}", path.display(), e))?;
    let expected = reader.shape_count()
        .map_err(|e| anyhow!("unreadable index for {}: {}", path.display(), e))?;

    let mut count = 0;
    for item in reader.iter_shapes_and_records() {
        item.map_err(|e| anyhow!("corrupt record {} in {}: {}", count, path.display(), e))?;
        count += 1;
    }
    ensure!(count == expected, "index lists {expected} shapes but {count} were read from {}", path.display());
    Ok(count)
}

fn records_to_dataframe(records: &[Record]) -> Result<DataFrame> {
    let Some(first) = records.first() else { return Ok(DataFrame::empty()) };

    let mut fields: Vec<(String, bool)> = first.clone().into_iter()
        .map(|(name, value)| {
            let numeric = matches!(value,
                FieldValue::Numeric(_) | FieldValue::Float(_) | FieldValue::Double(_)
                | FieldValue::Integer(_) | FieldValue::Currency(_));
            (name, numeric)
        })
        .collect();
    fields.sort();

    let columns = fields.into_iter()
        .map(|(name, numeric)| {
            if numeric {
                let values: Vec<Option<f64>> = records.iter()
                    .map(|r| r.get(&name).and_then(numeric_value))
                    .collect();
                Column::new(name.as_str().into(), values)
            } else {
                let values: Vec<Option<String>> = records.iter()
                    .map(|r| r.get(&name).and_then(text_value))
                    .collect();
                Column::new(name.as_str().into(), values)
            }
        })
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

fn numeric_value(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Numeric(n) => *n,
        FieldValue::Float(f) => f.map(f64::from),
        FieldValue::Double(d) => Some(*d),
        FieldValue::Integer(i) => Some(f64::from(*i)),
        FieldValue::Currency(c) => Some(*c),
        _ => None,
    }
}

fn text_value(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(s) => s.as_ref().map(|s| s.trim().to_string()),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        FieldValue::Logical(b) => b.map(|b| b.to_string()),
        other => numeric_value(other).map(|n| n.to_string()),
    }
}

/// Convert a shapefile shape into a MultiPolygon; non-areal shapes have no polygon form.
pub(crate) fn shape_to_multipolygon(shape: Shape) -> Option<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(p) => Some(rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y))),
        Shape::PolygonM(p) => Some(rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y))),
        Shape::PolygonZ(p) => Some(rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y))),
        _ => None,
    }
}

/// Group shapefile rings into polygons: each outer ring owns the inner rings that follow it.
fn rings_to_multipolygon<P>(rings: &[shp::PolygonRing<P>], xy: impl Fn(&P) -> (f64, f64)) -> MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn ensure_closed(coords: &mut Vec<Coord<f64>>) {
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last { coords.push(first) }
        }
    }

    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<LineString<f64>> = None;
    let mut current_holes: Vec<LineString<f64>> = Vec::new();

    for ring in rings {
        let mut coords: Vec<Coord<f64>> = ring.points().iter()
            .map(|pt| { let (x, y) = xy(pt); Coord { x, y } })
            .collect();
        ensure_closed(&mut coords);
        let ls = LineString(coords);

        match ring {
            shp::PolygonRing::Outer(_) => {
                // flush previous polygon
                if let Some(ext) = current_exterior.take() {
                    polys.push(Polygon::new(ext, std::mem::take(&mut current_holes)));
                }
                current_exterior = Some(ls);
            }
            shp::PolygonRing::Inner(_) => current_holes.push(ls),
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(Polygon::new(ext, current_holes));
    }

    MultiPolygon(polys)
}
