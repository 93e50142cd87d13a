use thiserror::Error;

/// Result type for all public censusgeo operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by geography resolution, shapefile caching and joins.
#[derive(Error, Debug)]
pub enum Error {
    /// The filter keys match no path in the hierarchy catalog.
    #[error("no geography matches filters [{}]; supported geographies:\n{}", .filters.join(", "), .supported.join("\n"))]
    NoMatchingGeography {
        filters: Vec<String>,
        supported: Vec<String>,
    },

    /// The filters bind no level of the matched path.
    #[error("filters [{}] bind no level of summary level {code}", .filters.join(", "))]
    UnderspecifiedGeography {
        code: String,
        filters: Vec<String>,
    },

    /// More than one catalog path matched where exactly one must. Indicates a catalog bug.
    #[error("catalog is ambiguous: summary levels [{}] all match [{}]", .codes.join(", "), .filters.join(", "))]
    AmbiguousCatalog {
        codes: Vec<String>,
        filters: Vec<String>,
    },

    /// No naming rule exists for the requested geometry level.
    #[error("no boundary geometry is known for level {level:?}; use one of: {}", .supported.join(", "))]
    GeometryNotSupportedForLevel {
        level: String,
        supported: Vec<String>,
    },

    /// The boundary host answered with a terminal status (e.g. 404).
    #[error("boundary file not available for {year}: {url} (HTTP {status})")]
    GeometryNotAvailable {
        url: String,
        year: u16,
        status: u16,
    },

    /// The archive or its contents failed validation on every attempt.
    #[error("archive {name} failed validation after {attempts} attempt(s): {reason}")]
    CorruptedArchive {
        name: String,
        attempts: u32,
        reason: String,
    },

    /// Transient network failures persisted beyond the retry bound.
    #[error("GET {url} failed after {attempts} attempt(s): {message}")]
    Network {
        url: String,
        attempts: u32,
        message: String,
    },

    /// The data service returned a non-200 status or a malformed body.
    #[error("data request {url} failed (HTTP {status}): {body}")]
    DataFetch {
        url: String,
        status: u16,
        body: String,
    },

    /// A column required for a join or transform is absent from the rows.
    #[error("missing column {0:?}")]
    MissingColumn(String),

    /// A shapefile could not be read.
    #[error("shapefile error in {path}: {message}")]
    Shapefile {
        path: String,
        message: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data frame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
