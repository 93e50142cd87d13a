mod common;

use std::{
    fs,
    io::Write,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use censusgeo::{
    BoundarySource, EntryState, Error, Fetcher, GeoLevelKind, Resolution, RetryPolicy, Scope, ShapefileCache,
    ShapefileDescriptor, TransportError,
};
use common::{tract_archive, tract_shapefile, zip_files, ArchiveServer};

const NY_TRACTS: &str = "cb_2020_36_tract_500k";

fn ny_tracts() -> ShapefileDescriptor {
    GeoLevelKind::Tract
        .rule(2020, BoundarySource::Cartographic)
        .descriptor(Scope::State("36".into()), Resolution::R500k)
}

fn serve_ny(server: &ArchiveServer) {
    server.serve(
        &format!("{NY_TRACTS}.zip"),
        200,
        tract_archive(NY_TRACTS, &[("36", "001", "000100", 0.0), ("36", "001", "000200", 1.0)]),
    );
}

fn cache(root: &std::path::Path, server: &Arc<ArchiveServer>) -> ShapefileCache {
    ShapefileCache::new(root, server.clone()).with_policy(RetryPolicy::immediate(3))
}

#[test]
fn second_request_is_served_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let server = ArchiveServer::new();
    serve_ny(&server);
    let cache = cache(dir.path(), &server);

    let first = cache.get(&ny_tracts()).unwrap();
    let second = cache.get(&ny_tracts()).unwrap();
    assert_eq!(first, second);
    assert_eq!(server.calls(), vec![
        "https://www2.census.gov/geo/tiger/GENZ2020/shp/cb_2020_36_tract_500k.zip".to_string(),
    ]);

    for ext in ["shp", "shx", "dbf", "prj"] {
        assert!(first.join(format!("{NY_TRACTS}.{ext}")).is_file(), "{ext}");
    }
    assert!(first.join("manifest.json").is_file());
    assert_eq!(cache.entries().unwrap(), vec![NY_TRACTS.to_string()]);
    assert_eq!(cache.entry_state(&ny_tracts()), EntryState::Valid);

    let frame = cache.load(&ny_tracts()).unwrap();
    assert_eq!(frame.len(), 2);
    assert_eq!(frame.null_geometry_count(), 0);
    assert_eq!(
        frame.string_column("TRACTCE").unwrap(),
        vec![Some("000100".to_string()), Some("000200".to_string())],
    );
    assert_eq!(server.calls().len(), 1);
}

#[test]
fn corrupted_entry_is_refetched_after_clearing() {
    let dir = tempfile::tempdir().unwrap();
    let server = ArchiveServer::new();
    serve_ny(&server);
    let cache = cache(dir.path(), &server);

    let entry = cache.get(&ny_tracts()).unwrap();
    fs::write(entry.join(format!("{NY_TRACTS}.shx")), b"").unwrap();

    // hits are not re-validated
    cache.get(&ny_tracts()).unwrap();
    assert_eq!(server.count(&format!("{NY_TRACTS}.zip")), 1);
    assert_eq!(cache.entry_state(&ny_tracts()), EntryState::Corrupted);

    assert_eq!(cache.clear_corrupted_cache().unwrap(), 1);
    assert_eq!(cache.entry_state(&ny_tracts()), EntryState::Missing);

    cache.get(&ny_tracts()).unwrap();
    assert_eq!(server.count(&format!("{NY_TRACTS}.zip")), 2);
    assert_eq!(cache.entry_state(&ny_tracts()), EntryState::Valid);
    assert_eq!(cache.clear_corrupted_cache().unwrap(), 0);
}

#[test]
fn not_found_fails_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let server = ArchiveServer::new();
    let cache = cache(dir.path(), &server);

    match cache.get(&ny_tracts()) {
        Err(Error::GeometryNotAvailable { url, year, status }) => {
            assert_eq!(status, 404);
            assert_eq!(year, 2020);
            assert!(url.ends_with("cb_2020_36_tract_500k.zip"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(server.calls().len(), 1);
    assert!(cache.entries().unwrap().is_empty());
}

#[test]
fn corrupt_archive_retried_then_reported() {
    let dir = tempfile::tempdir().unwrap();
    let server = ArchiveServer::new();
    server.serve(&format!("{NY_TRACTS}.zip"), 200, b"PK\x03\x04 truncated".to_vec());
    let cache = cache(dir.path(), &server);

    match cache.get(&ny_tracts()) {
        Err(Error::CorruptedArchive { name, attempts, .. }) => {
            assert_eq!(name, NY_TRACTS);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(server.calls().len(), 3);

    // nothing was promoted and no staging data was left behind
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn archive_without_index_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = ArchiveServer::new();
    let files: Vec<(String, Vec<u8>)> = tract_shapefile(NY_TRACTS, &[("36", "001", "000100", 0.0)])
        .into_iter()
        .filter(|(name, _)| !name.ends_with(".shx"))
        .collect();
    server.serve(&format!("{NY_TRACTS}.zip"), 200, zip_files(&files));
    let cache = cache(dir.path(), &server);

    assert!(matches!(cache.get(&ny_tracts()), Err(Error::CorruptedArchive { .. })));
    assert_eq!(cache.entry_state(&ny_tracts()), EntryState::Missing);
}

#[test]
fn components_are_renamed_to_the_entry_name() {
    let dir = tempfile::tempdir().unwrap();
    let server = ArchiveServer::new();
    let files: Vec<(String, Vec<u8>)> = tract_shapefile("Tracts_NY", &[("36", "001", "000100", 0.0)])
        .into_iter()
        .map(|(name, bytes)| (format!("nested/{name}"), bytes))
        .collect();
    server.serve(&format!("{NY_TRACTS}.zip"), 200, zip_files(&files));
    let cache = cache(dir.path(), &server);

    let entry = cache.get(&ny_tracts()).unwrap();
    assert!(entry.join(format!("{NY_TRACTS}.shp")).is_file());
    assert!(!entry.join("nested").exists());
    assert_eq!(cache.load(&ny_tracts()).unwrap().len(), 1);
}

#[test]
fn upper_case_extensions_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let server = ArchiveServer::new();
    let files: Vec<(String, Vec<u8>)> = tract_shapefile("TRACTS", &[("36", "001", "000100", 0.0)])
        .into_iter()
        .map(|(name, bytes)| (name.to_uppercase(), bytes))
        .collect();
    server.serve(&format!("{NY_TRACTS}.zip"), 200, zip_files(&files));
    let cache = cache(dir.path(), &server);

    let entry = cache.get(&ny_tracts()).unwrap();
    for ext in ["shp", "shx", "dbf", "prj"] {
        assert!(entry.join(format!("{NY_TRACTS}.{ext}")).is_file(), "{ext}");
    }
    assert_eq!(server.calls().len(), 1);
    assert_eq!(cache.load(&ny_tracts()).unwrap().len(), 1);
}

/// Fails with a server error a fixed number of times before delegating.
struct Flaky {
    failures: usize,
    calls: AtomicUsize,
    inner: Arc<ArchiveServer>,
}

impl Fetcher for Flaky {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u16, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match call {
            0 => Err(TransportError::transient("connection reset by peer")),
            n if n < self.failures => Ok(503),
            _ => self.inner.get(url, sink),
        }
    }
}

#[test]
fn transient_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let server = ArchiveServer::new();
    serve_ny(&server);
    let flaky = Arc::new(Flaky { failures: 2, calls: AtomicUsize::new(0), inner: server.clone() });
    let cache = ShapefileCache::new(dir.path(), flaky.clone()).with_policy(RetryPolicy::immediate(3));

    cache.get(&ny_tracts()).unwrap();
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    assert_eq!(cache.entry_state(&ny_tracts()), EntryState::Valid);

    let dir = tempfile::tempdir().unwrap();
    let flaky = Arc::new(Flaky { failures: 5, calls: AtomicUsize::new(0), inner: server });
    let cache = ShapefileCache::new(dir.path(), flaky).with_policy(RetryPolicy::immediate(3));
    assert!(matches!(cache.get(&ny_tracts()), Err(Error::Network { attempts: 3, .. })));
}

#[test]
fn invalidate_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let server = ArchiveServer::new();
    serve_ny(&server);
    let county = ShapefileDescriptor::cartographic("county", Scope::Us, 2020, Resolution::R20m);
    server.serve("cb_2020_us_county_20m.zip", 200, tract_archive("cb_2020_us_county_20m", &[("36", "001", "000000", 0.0)]));
    let cache = cache(dir.path(), &server);

    cache.get(&ny_tracts()).unwrap();
    cache.get(&county).unwrap();
    assert_eq!(cache.entries().unwrap(), vec!["cb_2020_36_tract_500k", "cb_2020_us_county_20m"]);

    assert!(cache.invalidate(&county).unwrap());
    assert!(!cache.invalidate(&county).unwrap());
    assert_eq!(cache.clear().unwrap(), 1);
    assert!(cache.entries().unwrap().is_empty());

    cache.get(&county).unwrap();
    assert_eq!(server.count("cb_2020_us_county_20m.zip"), 2);
}
