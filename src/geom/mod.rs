mod bbox;
mod compactness;
mod frame;
mod relocate;
mod water;

pub use compactness::{drop_slivers, isoperimetric_quotient, perimeter};
pub use frame::{GeoFrame, GEOMETRY_COLUMN};
pub(crate) use frame::string_column;
pub(crate) use frame::float_column;
pub use relocate::{relocate_ak_hi, Inset, Relocation, ALASKA_FIPS, HAWAII_FIPS};
pub use water::{WaterBody, WaterRemoval, WaterSource};
