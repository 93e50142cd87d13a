use geo::{Area, MultiPolygon};
use polars::prelude::{DataFrame, DataType};

use crate::{Error, Result};

/// Name reported for the geometry column, which always comes last.
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Tabular rows paired one-to-one with an optional boundary geometry.
#[derive(Debug, Clone)]
pub struct GeoFrame {
    data: DataFrame,
    geometry: Vec<Option<MultiPolygon<f64>>>,
}

impl GeoFrame {
    /// Pair rows with geometries; lengths must agree.
    pub fn new(data: DataFrame, geometry: Vec<Option<MultiPolygon<f64>>>) -> Result<Self> {
        // An attribute-less shapefile still has one geometry per shape.
        if data.width() != 0 && data.height() != geometry.len() {
            return Err(Error::Other(anyhow::anyhow!(
                "row count ({}) does not match geometry count ({})", data.height(), geometry.len()
            )));
        }
        Ok(Self { data, geometry })
    }

    #[inline] pub fn data(&self) -> &DataFrame { &self.data }

    #[inline] pub fn geometry(&self) -> &[Option<MultiPolygon<f64>>] { &self.geometry }

    #[inline] pub fn len(&self) -> usize { self.geometry.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.geometry.is_empty() }

    pub fn into_parts(self) -> (DataFrame, Vec<Option<MultiPolygon<f64>>>) { (self.data, self.geometry) }

    /// Input columns in their original order followed by the geometry column.
    pub fn column_names(&self) -> Vec<String> {
        self.data.get_column_names().iter()
            .map(|name| name.to_string())
            .chain(std::iter::once(GEOMETRY_COLUMN.to_string()))
            .collect()
    }

    /// Number of rows without a geometry.
    pub fn null_geometry_count(&self) -> usize {
        self.geometry.iter().filter(|g| g.is_none()).count()
    }

    /// Sum of planar areas of all present geometries.
    pub fn total_area(&self) -> f64 {
        self.geometry.iter().flatten().map(|g| g.unsigned_area()).sum()
    }

    /// Replace every geometry, keeping rows untouched.
    pub fn with_geometry(&self, geometry: Vec<Option<MultiPolygon<f64>>>) -> Result<Self> {
        Self::new(self.data.clone(), geometry)
    }

    /// A column's values as strings, whatever its stored type.
    pub fn string_column(&self, name: &str) -> Result<Vec<Option<String>>> {
        string_column(&self.data, name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.get_column_names().iter().any(|c| c.as_str() == name)
    }
}

pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name).map_err(|_| Error::MissingColumn(name.to_string()))?;
    let column = column.cast(&DataType::String)?;
    Ok(column.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

pub(crate) fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name).map_err(|_| Error::MissingColumn(name.to_string()))?;
    let column = column.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}
