mod catalog;
mod filters;
mod matcher;
mod query;

pub use catalog::{catalog, column_name, Catalog, GeographyPath};
pub use filters::{normalize_level, FilterValue, GeoFilterSpec, WILDCARD};
pub use matcher::{resolve, BoundPath};
pub use query::CensusGeographyQuerySpec;
