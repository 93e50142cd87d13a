#![doc = "Census geography resolution, boundary shapefile caching and geometry joins"]
mod common;
mod config;
mod error;
mod geography;
mod geom;
mod join;
mod shapes;

#[cfg(feature = "download")]
mod client;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use config::{Config, RetryPolicy, API_KEY_ENV, CACHE_DIR_ENV, DEFAULT_API_HOST, DEFAULT_BOUNDARY_HOST};

#[doc(inline)]
pub use common::{classify_status, read_shapefile, Fetcher, KeyedStore, StatusClass, TransportError};

#[cfg(feature = "download")]
#[doc(inline)]
pub use common::HttpFetcher;

#[doc(inline)]
pub use geography::{
    catalog, column_name, normalize_level, resolve, BoundPath, Catalog, CensusGeographyQuerySpec, FilterValue,
    GeoFilterSpec, GeographyPath, WILDCARD,
};

#[doc(inline)]
pub use shapes::{
    cartographic_available, column_era, congress_for_year, legacy_state_directory, published, puma_vintage,
    tabblock_vintage, zcta_vintage,
    BoundarySource, BoundaryWater, ColumnEra, EntryState, GeoLevelKind, JoinColumn, Resolution, Scope, ShapeSource,
    ShapefileCache, ShapefileDescriptor, ShapefileRule, LEGACY_TIGER_SINCE, SCHOOL_DISTRICT_CARTOGRAPHIC_SINCE,
};

#[doc(inline)]
pub use join::{attach_geometry, normalize_id, JoinOptions, LEGACY_TRACT_YEAR};

#[doc(inline)]
pub use geom::{
    drop_slivers, isoperimetric_quotient, perimeter, relocate_ak_hi, GeoFrame, Inset, Relocation, WaterBody,
    WaterRemoval, WaterSource, ALASKA_FIPS, GEOMETRY_COLUMN, HAWAII_FIPS,
};

#[cfg(feature = "download")]
#[doc(inline)]
pub use client::{CensusClient, Variable};
