mod ids;
mod joiner;

pub use ids::{normalize_id, LEGACY_TRACT_YEAR};
pub use joiner::{attach_geometry, JoinOptions};
