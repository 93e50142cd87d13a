mod shp;

pub(crate) use shp::*;
pub use shp::read_shapefile;
