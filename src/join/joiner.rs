use std::collections::BTreeSet;

use ahash::AHashMap;
use geo::MultiPolygon;
use polars::prelude::DataFrame;
use tracing::{debug, warn};

use crate::{
    geom::{string_column, GeoFrame},
    join::normalize_id,
    shapes::{BoundarySource, GeoLevelKind, Resolution, ShapeSource, ShapefileRule},
    Error, Result,
};

/// Options for [`attach_geometry`].
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOptions {
    /// Preferred boundary files; levels or years without generalized files fall back to TIGER/Line.
    pub source: BoundarySource,
    /// Resolution tier for national generalized files.
    pub resolution: Resolution,
    /// Rows carrying this column are joined against the boundaries of their own year.
    pub year_column: String,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            source: BoundarySource::Cartographic,
            resolution: Resolution::R500k,
            year_column: "YEAR".to_string(),
        }
    }
}

/// Normalized key parts per row, or `None` where any part is null.
fn key_parts(df: &DataFrame, rule: &ShapefileRule, shape_side: bool) -> Result<Vec<Option<Vec<String>>>> {
    let year = rule.year();
    let columns = rule.columns().iter()
        .map(|c| string_column(df, if shape_side { &c.shape } else { &c.data }))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..df.height())
        .map(|row| {
            rule.columns().iter().zip(&columns)
                .map(|(c, values)| values[row].as_deref().map(|v| normalize_id(v, c.width, c.level, year)))
                .collect()
        })
        .collect())
}

fn parse_year(value: &str) -> Option<u16> {
    let value = value.trim();
    let value = value.strip_suffix(".0").unwrap_or(value);
    value.parse().ok()
}

/// Attach a boundary geometry to every row of `rows`.
///
/// Rows are identified by the join columns the naming rules give for `level`. When
/// `rows` has a year column each row is matched against its own year's boundaries,
/// otherwise every row uses `year`. Boundary files are loaded in year order, then scope
/// order, and the first shape seen for a key wins.
///
/// Every input row is kept, in order; rows whose key has no boundary get a null geometry.
pub fn attach_geometry<S: ShapeSource + ?Sized>(
    rows: &DataFrame,
    level: &str,
    year: u16,
    shapes: &S,
    options: &JoinOptions,
) -> Result<GeoFrame> {
    let kind = GeoLevelKind::from_level(level)?;
    let n = rows.height();

    let has_year_column = rows.get_column_names().iter().any(|c| c.as_str() == options.year_column);
    let row_years: Vec<Option<u16>> = if has_year_column {
        string_column(rows, &options.year_column)?.into_iter()
            .map(|v| v.as_deref().and_then(parse_year))
            .collect()
    } else {
        vec![Some(year); n]
    };
    let years: BTreeSet<u16> = row_years.iter().flatten().copied().collect();

    let mut geometry: Vec<Option<MultiPolygon<f64>>> = vec![None; n];
    for year in years {
        let rule = kind.rule(year, options.source);
        let members: Vec<usize> = (0..n).filter(|&i| row_years[i] == Some(year)).collect();
        if !rule.is_published() {
            warn!(level = kind.level(), year, rows = members.len(), "no boundary files published; rows keep null geometry");
            continue;
        }
        let parts = key_parts(rows, &rule, false)?;

        // Per-state files are chosen by the first (state) key part.
        let states: Vec<String> = members.iter()
            .filter_map(|&i| parts[i].as_ref().and_then(|p| p.first().cloned()))
            .collect();

        let mut index: AHashMap<String, MultiPolygon<f64>> = AHashMap::new();
        for descriptor in rule.descriptors(&states, options.resolution) {
            let frame = match shapes.load(&descriptor) {
                Ok(frame) => frame,
                Err(Error::GeometryNotAvailable { url, status, .. }) => {
                    warn!(name = %descriptor, year, status, url = %url, "boundary file unavailable; rows keep null geometry");
                    continue;
                }
                Err(e) => return Err(e),
            };
            debug!(name = %descriptor, shapes = frame.len(), "loaded boundary file");

            let keys = key_parts(frame.data(), &rule, true)?;
            let (_, boundaries) = frame.into_parts();
            for (key, shape) in keys.into_iter().zip(boundaries) {
                if let (Some(key), Some(shape)) = (key, shape) {
                    index.entry(key.concat()).or_insert(shape);
                }
            }
        }

        let mut misses = 0usize;
        for &i in &members {
            geometry[i] = parts[i].as_ref().and_then(|p| index.get(&p.concat()).cloned());
            if geometry[i].is_none() { misses += 1 }
        }
        if misses > 0 {
            debug!(level = kind.level(), year, misses, rows = members.len(), "rows without a matching boundary");
        }
    }

    GeoFrame::new(rows.clone(), geometry)
}
