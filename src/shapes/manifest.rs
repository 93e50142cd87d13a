use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::common::sha256_file;

pub(crate) const MANIFEST_FILE: &str = "manifest.json";

/// Shapefile components that must be present and non-empty.
pub(crate) const REQUIRED_COMPONENTS: [&str; 3] = ["shp", "shx", "dbf"];

/// Components copied into an entry when the archive carries them.
pub(crate) const OPTIONAL_COMPONENTS: [&str; 3] = ["prj", "cpg", "xml"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FileHash {
    pub sha256: String,
}

/// Written into each cache entry at promotion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EntryManifest {
    name: String,
    url: String,
    shapes: usize,
    files: BTreeMap<String, FileHash>,
}

impl EntryManifest {
    /// Hash every file in `dir` (except the manifest itself).
    pub(crate) fn build(dir: &Path, name: &str, url: &str, shapes: usize) -> Result<Self> {
        let mut files = BTreeMap::new();
        for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else { continue };
            if file_name == MANIFEST_FILE || !path.is_file() { continue }
            files.insert(file_name.to_string(), FileHash { sha256: sha256_file(&path)? });
        }
        Ok(Self { name: name.to_string(), url: url.to_string(), shapes, files })
    }

    pub(crate) fn write(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(dir.join(MANIFEST_FILE), json)
            .with_context(|| format!("write manifest in {}", dir.display()))
    }

    pub(crate) fn read(dir: &Path) -> Result<Self> {
        let bytes = fs::read(dir.join(MANIFEST_FILE))
            .with_context(|| format!("read manifest in {}", dir.display()))?;
        serde_json::from_slice(&bytes).context("Failed to parse manifest.json")
    }

    #[inline] pub(crate) fn shapes(&self) -> usize { self.shapes }

    /// Every recorded file still exists with the recorded digest.
    pub(crate) fn verify(&self, dir: &Path) -> Result<()> {
        ensure!(!self.files.is_empty(), "manifest for {} lists no files", self.name);
        for (file, hash) in &self.files {
            let path = dir.join(file);
            if !path.is_file() { bail!("{} is missing", path.display()) }
            let actual = sha256_file(&path)?;
            ensure!(actual == hash.sha256, "{} digest changed ({} != {})", path.display(), actual, hash.sha256);
        }
        Ok(())
    }
}
