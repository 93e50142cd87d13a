mod cache;
mod descriptor;
mod manifest;
mod naming;
mod water;

use crate::{geom::GeoFrame, Result};

pub use cache::{EntryState, ShapefileCache};
pub use descriptor::{BoundarySource, Resolution, Scope, ShapefileDescriptor};
pub use naming::{
    cartographic_available, column_era, congress_for_year, legacy_state_directory, published, puma_vintage,
    tabblock_vintage, zcta_vintage,
    ColumnEra, GeoLevelKind, JoinColumn, ShapefileRule, LEGACY_TIGER_SINCE, SCHOOL_DISTRICT_CARTOGRAPHIC_SINCE,
};
pub use water::BoundaryWater;

/// Anything that can produce the boundary file for a descriptor.
pub trait ShapeSource {
    fn load(&self, descriptor: &ShapefileDescriptor) -> Result<GeoFrame>;
}
