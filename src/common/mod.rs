mod fs;
mod download;
mod io;
mod store;

pub(crate) use fs::*;
pub use download::{classify_status, Fetcher, StatusClass, TransportError};
#[cfg(feature = "download")]
pub use download::HttpFetcher;
pub(crate) use download::{retry_loop, RetryCause, RetryError, Step};
pub(crate) use io::*;
pub use io::read_shapefile;
pub use store::KeyedStore;
