use std::{fs::{self, File}, io::Read, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use sha2::{Digest, Sha256};
use zip::ZipArchive;

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() { bail!("Path exists but is not a directory: {}", path.display()); }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Remove a directory tree if present. Missing directories are not an error.
pub(crate) fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(anyhow!("failed to remove {}: {}", path.display(), e)),
    }
}

/// Extracts the given `.zip` file into `dest_dir`.
/// Any failure here means the archive itself is unusable.
pub(crate) fn extract_zip(zip_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(zip_path)
        .map_err(|e| anyhow!("failed to open {:?}: {}", zip_path, e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| anyhow!("failed to read zip archive {:?}: {}", zip_path, e))?;

    archive
        .extract(dest_dir)
        .map_err(|e| anyhow!("failed to extract {:?} to {:?}: {}", zip_path, dest_dir, e))?;

    Ok(())
}

/// Hex SHA-256 digest of a file.
pub(crate) fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("open for hash {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1 << 16];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Move a fully written directory into place.
/// Returns `false` if another writer promoted the same target first.
pub(crate) fn promote_dir(staged: &Path, target: &Path) -> Result<bool> {
    match fs::rename(staged, target) {
        Ok(()) => {
            if let Some(parent) = target.parent() {
                let _ = File::open(parent).and_then(|f| f.sync_all());
            }
            Ok(true)
        }
        Err(_) if target.is_dir() => {
            remove_dir_if_exists(staged)?;
            Ok(false)
        }
        Err(e) => Err(anyhow!("failed to promote {} to {}: {}", staged.display(), target.display(), e)),
    }
}
