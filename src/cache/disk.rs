use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::CacheEntry;
use super::store::CacheStore;
use crate::error::SqlDbalError;

const FILE_PREFIX: &str = "query_";
const FILE_EXT: &str = "json";

/// One JSON file per fingerprint under a cache directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    directory: PathBuf,
}

impl DiskStore {
    /// Use `directory`, creating it on first write.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Filesystem-safe file name for a fingerprint.
    #[must_use]
    pub fn file_name(fingerprint: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(fingerprint.as_bytes());
        format!("{FILE_PREFIX}{:x}.{FILE_EXT}", hasher.finalize())
    }

    fn path_for(&self, fingerprint: &str) -> PathBuf {
        self.directory.join(Self::file_name(fingerprint))
    }
}

impl CacheStore for DiskStore {
    fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, SqlDbalError> {
        let path = self.path_for(fingerprint);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes).map_err(|e| {
            SqlDbalError::CacheError(format!("unreadable cache file {}: {e}", path.display()))
        })?;
        // guard against hash collisions
        if entry.fingerprint != fingerprint {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn put(&mut self, entry: CacheEntry) -> Result<(), SqlDbalError> {
        fs::create_dir_all(&self.directory)?;
        let path = self.path_for(&entry.fingerprint);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, fingerprint: &str) -> Result<(), SqlDbalError> {
        match fs::remove_file(self.path_for(fingerprint)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn clear(&mut self) -> Result<(), SqlDbalError> {
        let read_dir = match fs::read_dir(&self.directory) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for dir_entry in read_dir {
            let path = dir_entry?.path();
            let is_cache_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FILE_PREFIX))
                && path.extension().and_then(|e| e.to_str()) == Some(FILE_EXT);
            if is_cache_file {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
