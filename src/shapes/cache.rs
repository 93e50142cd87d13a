use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, ensure, Context};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    common::{
        check_shapefile, classify_status, ensure_dir_exists, extract_zip, promote_dir, read_shapefile,
        remove_dir_if_exists, retry_loop, Fetcher, RetryCause, RetryError, StatusClass, Step,
    },
    config::{RetryPolicy, DEFAULT_BOUNDARY_HOST},
    geom::GeoFrame,
    shapes::{
        manifest::{EntryManifest, OPTIONAL_COMPONENTS, REQUIRED_COMPONENTS},
        ShapeSource, ShapefileDescriptor,
    },
    Error, Result,
};

/// On-disk state of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Missing,
    /// A fetch is staging files for this entry; nothing is visible yet.
    Downloading,
    Valid,
    Corrupted,
}

/// Boundary shapefiles cached under `<root>/<name>/<name>.{shp,shx,dbf,prj}`.
///
/// Entries are written to a staging directory and renamed into place once
/// validated, so a visible entry directory is always complete.
pub struct ShapefileCache {
    root: PathBuf,
    boundary_host: String,
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
}

/// Prefix shared by staging files and directories of one entry.
fn staging_prefix(name: &str) -> String { format!(".{name}.") }

/// Required components exist, are non-empty and parse; returns the shape count.
fn validate_components(dir: &Path, name: &str) -> anyhow::Result<usize> {
    for ext in REQUIRED_COMPONENTS {
        let path = dir.join(format!("{name}.{ext}"));
        let meta = fs::metadata(&path).with_context(|| format!("{} is missing", path.display()))?;
        ensure!(meta.is_file() && meta.len() > 0, "{} is empty", path.display());
    }
    check_shapefile(&dir.join(format!("{name}.shp")))
}

/// Full re-check of a promoted entry against its manifest.
fn revalidate(dir: &Path, name: &str) -> anyhow::Result<()> {
    let shapes = validate_components(dir, name)?;
    let manifest = EntryManifest::read(dir)?;
    manifest.verify(dir)?;
    ensure!(manifest.shapes() == shapes, "manifest records {} shapes, found {}", manifest.shapes(), shapes);
    Ok(())
}

/// Extract `archive` into `staged`, renaming the shapefile components to `name.*`.
fn unpack(archive: &Path, staged: &Path, name: &str, url: &str) -> anyhow::Result<usize> {
    let raw = staged.join("raw");
    extract_zip(archive, &raw)?;

    let shp = WalkDir::new(&raw)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("shp")))
        .min()
        .ok_or_else(|| anyhow!("archive contains no .shp file"))?;

    let stem = shp.file_stem().and_then(|s| s.to_str()).unwrap_or(name).to_string();
    let source_dir = shp.parent().unwrap_or(&raw).to_path_buf();
    let siblings: Vec<PathBuf> = fs::read_dir(&source_dir)
        .with_context(|| format!("list {}", source_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.file_stem().and_then(|s| s.to_str()) == Some(stem.as_str()))
        .collect();
    for ext in REQUIRED_COMPONENTS.iter().chain(&OPTIONAL_COMPONENTS) {
        let found = siblings.iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case(ext)))
            .min();
        if let Some(from) = found {
            fs::rename(from, staged.join(format!("{name}.{ext}")))
                .with_context(|| format!("move {}", from.display()))?;
        }
    }
    remove_dir_if_exists(&raw)?;

    let shapes = validate_components(staged, name)?;
    EntryManifest::build(staged, name, url, shapes)?.write(staged)?;
    Ok(shapes)
}

impl ShapefileCache {
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            root: root.into(),
            boundary_host: DEFAULT_BOUNDARY_HOST.to_string(),
            fetcher,
            policy: RetryPolicy::default(),
        }
    }

    /// Cache at the configured root, fetching over HTTP with the configured retry policy.
    #[cfg(feature = "download")]
    pub fn from_config(config: &crate::Config) -> Result<Self> {
        config.validate()?;
        let fetcher = crate::common::HttpFetcher::new(config.retry.timeout())?;
        Ok(Self::new(config.cache_root(), Arc::new(fetcher))
            .with_boundary_host(&config.boundary_host)
            .with_policy(config.retry.clone()))
    }

    pub fn with_boundary_host(mut self, host: &str) -> Self {
        self.boundary_host = host.trim_end_matches('/').to_string();
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline] pub fn root(&self) -> &Path { &self.root }

    pub fn entry_dir(&self, descriptor: &ShapefileDescriptor) -> PathBuf {
        self.root.join(descriptor.name())
    }

    pub fn shp_path(&self, descriptor: &ShapefileDescriptor) -> PathBuf {
        let name = descriptor.name();
        self.root.join(&name).join(format!("{name}.shp"))
    }

    /// Directory holding a validated copy of `descriptor`, fetching it on a miss.
    ///
    /// Hits are not re-validated; see [`Self::clear_corrupted_cache`].
    pub fn get(&self, descriptor: &ShapefileDescriptor) -> Result<PathBuf> {
        let target = self.entry_dir(descriptor);
        if target.is_dir() {
            debug!(name = %descriptor, "shapefile cache hit");
            return Ok(target);
        }

        ensure_dir_exists(&self.root)?;
        let name = descriptor.name();
        let url = descriptor.url(&self.boundary_host);
        info!(name = %name, url = %url, "downloading shapefile");

        let result = retry_loop(&self.policy, &name, |_| self.attempt(descriptor, &name, &url, &target));
        match result {
            Ok(dir) => Ok(dir),
            Err(RetryError::Fatal(e)) => Err(e),
            Err(RetryError::Exhausted { attempts, last: RetryCause::Transient(message) }) => {
                Err(Error::Network { url, attempts, message })
            }
            Err(RetryError::Exhausted { attempts, last: RetryCause::Corrupted(reason) }) => {
                Err(Error::CorruptedArchive { name, attempts, reason })
            }
        }
    }

    /// One fetch, extract, validate and promote cycle.
    fn attempt(&self, descriptor: &ShapefileDescriptor, name: &str, url: &str, target: &Path) -> Step<PathBuf> {
        let not_available = |status| Error::GeometryNotAvailable {
            url: url.to_string(),
            year: descriptor.year(),
            status,
        };

        let mut archive = match tempfile::Builder::new()
            .prefix(&staging_prefix(name))
            .suffix(".zip")
            .tempfile_in(&self.root)
        {
            Ok(file) => file,
            Err(e) => return Step::Fail(e.into()),
        };

        let status = match self.fetcher.get(url, archive.as_file_mut()) {
            Ok(status) => status,
            Err(e) if e.retryable => return Step::Retry(RetryCause::Transient(e.message)),
            Err(e) => {
                warn!(url, error = %e.message, "shapefile request cannot succeed");
                return Step::Fail(not_available(0));
            }
        };
        match classify_status(status) {
            StatusClass::Success => {}
            StatusClass::Transient => return Step::Retry(RetryCause::Transient(format!("HTTP {status}"))),
            StatusClass::Terminal => return Step::Fail(not_available(status)),
        }
        if let Err(e) = archive.as_file_mut().flush() {
            return Step::Fail(e.into());
        }

        let staged = match tempfile::Builder::new().prefix(&staging_prefix(name)).tempdir_in(&self.root) {
            Ok(dir) => dir,
            Err(e) => return Step::Fail(e.into()),
        };
        let shapes = match unpack(archive.path(), staged.path(), name, url) {
            Ok(shapes) => shapes,
            Err(e) => {
                warn!(name, error = %format!("{e:#}"), "corrupted archive discarded");
                return Step::Retry(RetryCause::Corrupted(format!("{e:#}")));
            }
        };

        let staged = staged.keep();
        match promote_dir(&staged, target) {
            Ok(true) => info!(name, shapes, dir = %target.display(), "shapefile cached"),
            Ok(false) => debug!(name, "entry was promoted by another writer"),
            Err(e) => return Step::Fail(e.into()),
        }
        Step::Done(target.to_path_buf())
    }

    /// Read the cached shapefile for `descriptor`, fetching it first if needed.
    pub fn load(&self, descriptor: &ShapefileDescriptor) -> Result<GeoFrame> {
        self.get(descriptor)?;
        read_shapefile(&self.shp_path(descriptor))
    }

    /// Inspect an entry. Fully re-validates entries that exist.
    pub fn entry_state(&self, descriptor: &ShapefileDescriptor) -> EntryState {
        let name = descriptor.name();
        let dir = self.root.join(&name);
        if dir.is_dir() {
            return match revalidate(&dir, &name) {
                Ok(()) => EntryState::Valid,
                Err(_) => EntryState::Corrupted,
            };
        }

        let prefix = staging_prefix(&name);
        let staging = fs::read_dir(&self.root).into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with(&prefix));
        if staging { EntryState::Downloading } else { EntryState::Missing }
    }

    /// Names of every promoted entry, sorted.
    pub fn entries(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() { return Ok(vec![]) }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| anyhow!("failed to list {}: {}", self.root.display(), e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().is_dir() && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Re-validate every entry and remove the ones that fail, returning how many were removed.
    ///
    /// Must not run while a fetch is in flight. Leftover staging files are removed too.
    pub fn clear_corrupted_cache(&self) -> Result<usize> {
        let mut removed = 0;
        for name in self.entries()? {
            let dir = self.root.join(&name);
            if let Err(e) = revalidate(&dir, &name) {
                warn!(name = %name, error = %format!("{e:#}"), "removing corrupted cache entry");
                remove_dir_if_exists(&dir)?;
                removed += 1;
            }
        }

        if self.root.is_dir() {
            for entry in fs::read_dir(&self.root)? {
                let path = entry?.path();
                let hidden = path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('.'));
                if !hidden { continue }
                debug!(path = %path.display(), "removing stale staging data");
                if path.is_dir() { remove_dir_if_exists(&path)?; } else { fs::remove_file(&path)?; }
            }
        }

        info!(removed, "cleared corrupted cache entries");
        Ok(removed)
    }

    /// Remove one entry. Returns whether it existed.
    pub fn invalidate(&self, descriptor: &ShapefileDescriptor) -> Result<bool> {
        let removed = remove_dir_if_exists(&self.entry_dir(descriptor))?;
        if removed { debug!(name = %descriptor, "invalidated cache entry") }
        Ok(removed)
    }

    /// Remove every entry, returning how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let names = self.entries()?;
        for name in &names {
            remove_dir_if_exists(&self.root.join(name))?;
        }
        info!(removed = names.len(), root = %self.root.display(), "cleared shapefile cache");
        Ok(names.len())
    }
}

impl ShapeSource for ShapefileCache {
    fn load(&self, descriptor: &ShapefileDescriptor) -> Result<GeoFrame> {
        ShapefileCache::load(self, descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TransportError;
    use crate::shapes::Scope;

    struct Refusing;

    impl Fetcher for Refusing {
        fn get(&self, _: &str, _: &mut dyn Write) -> std::result::Result<u16, TransportError> {
            Err(TransportError::transient("connection reset"))
        }
    }

    fn county() -> ShapefileDescriptor {
        ShapefileDescriptor::cartographic("county", Scope::Us, 2020, crate::shapes::Resolution::R500k)
    }

    #[test]
    fn transient_failures_exhaust_to_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ShapefileCache::new(dir.path(), Arc::new(Refusing)).with_policy(RetryPolicy::immediate(3));

        match cache.get(&county()) {
            Err(Error::Network { attempts, message, url }) => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "connection reset");
                assert!(url.ends_with("/GENZ2020/shp/cb_2020_us_county_500k.zip"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cache.entry_state(&county()), EntryState::Missing);
        assert!(cache.entries().unwrap().is_empty());
    }

    #[test]
    fn staging_data_reports_downloading() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ShapefileCache::new(dir.path(), Arc::new(Refusing));
        fs::create_dir(dir.path().join(format!(".{}.abc123", county().name()))).unwrap();

        assert_eq!(cache.entry_state(&county()), EntryState::Downloading);
        assert!(cache.entries().unwrap().is_empty());
        assert_eq!(cache.clear_corrupted_cache().unwrap(), 0);
        assert_eq!(cache.entry_state(&county()), EntryState::Missing);
    }

    #[test]
    fn empty_entry_directory_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ShapefileCache::new(dir.path(), Arc::new(Refusing));
        fs::create_dir(cache.entry_dir(&county())).unwrap();

        assert_eq!(cache.entry_state(&county()), EntryState::Corrupted);
        assert_eq!(cache.clear_corrupted_cache().unwrap(), 1);
        assert_eq!(cache.entry_state(&county()), EntryState::Missing);
    }
}
