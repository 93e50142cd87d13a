#![allow(dead_code)]

use std::{
    collections::HashMap,
    fs,
    io::{Cursor, Write},
    sync::{Arc, Mutex},
};

use censusgeo::{Fetcher, TransportError};
use shapefile::{
    dbase::{FieldName, FieldValue, Record, TableWriterBuilder},
    Point, Polygon, PolygonRing,
};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// (STATEFP, COUNTYFP, TRACTCE, x offset of the unit square)
pub type TractRow = (&'static str, &'static str, &'static str, f64);

/// Shapefile components for one unit square per tract, keyed by file name.
pub fn tract_shapefile(stem: &str, tracts: &[TractRow]) -> Vec<(String, Vec<u8>)> {
    let dir = tempfile::tempdir().unwrap();
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("STATEFP").unwrap(), 2)
        .add_character_field(FieldName::try_from("COUNTYFP").unwrap(), 3)
        .add_character_field(FieldName::try_from("TRACTCE").unwrap(), 6)
        .add_numeric_field(FieldName::try_from("ALAND").unwrap(), 14, 0);
    let mut writer = shapefile::Writer::from_path(dir.path().join(format!("{stem}.shp")), table).unwrap();

    for &(state, county, tract, x) in tracts {
        let square = Polygon::new(PolygonRing::Outer(vec![
            Point::new(x, 0.0), Point::new(x, 1.0), Point::new(x + 1.0, 1.0),
            Point::new(x + 1.0, 0.0), Point::new(x, 0.0),
        ]));
        let mut record = Record::default();
        record.insert("STATEFP".to_string(), FieldValue::Character(Some(state.to_string())));
        record.insert("COUNTYFP".to_string(), FieldValue::Character(Some(county.to_string())));
        record.insert("TRACTCE".to_string(), FieldValue::Character(Some(tract.to_string())));
        record.insert("ALAND".to_string(), FieldValue::Numeric(Some(1_000_000.0)));
        writer.write_shape_and_record(&square, &record).unwrap();
    }
    drop(writer);

    let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(dir.path()).unwrap()
        .map(|e| e.unwrap().path())
        .map(|p| (p.file_name().unwrap().to_string_lossy().to_string(), fs::read(&p).unwrap()))
        .collect();
    files.push((format!("{stem}.prj"), b"GEOGCS[\"GCS_North_American_1983\"]".to_vec()));
    files.sort();
    files
}

/// Uncompressed zip archive of `files`.
pub fn zip_files(files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, bytes) in files {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn tract_archive(stem: &str, tracts: &[TractRow]) -> Vec<u8> {
    zip_files(&tract_shapefile(stem, tracts))
}

/// In-memory boundary host. URLs are answered by the registered file name they end with; anything else is a 404.
#[derive(Default)]
pub struct ArchiveServer {
    files: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    calls: Mutex<Vec<String>>,
}

impl ArchiveServer {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn serve(&self, file_name: &str, status: u16, body: Vec<u8>) {
        self.files.lock().unwrap().insert(file_name.to_string(), (status, body));
    }

    pub fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }

    pub fn count(&self, file_name: &str) -> usize {
        self.calls().iter().filter(|url| url.ends_with(file_name)).count()
    }
}

impl Fetcher for ArchiveServer {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u16, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());
        let files = self.files.lock().unwrap();
        let file_name = url.rsplit('/').next().unwrap_or_default();
        match files.get(file_name) {
            Some((status, body)) => {
                sink.write_all(body).map_err(|e| TransportError::transient(e.to_string()))?;
                Ok(*status)
            }
            None => {
                sink.write_all(b"<html>Not Found</html>").unwrap();
                Ok(404)
            }
        }
    }
}
