use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::CacheError;

/// A blob and the time it was last written.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub modified: SystemTime,
}

/// Persistent tier of the image cache. Keys are already filesystem-safe.
pub trait BlobStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<StoredBlob>, CacheError>;
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
    /// Remove every entry, returning how many were removed. Partial writes
    /// left behind are removed too but not counted.
    fn clear(&self) -> Result<u64, CacheError>;
}

/// One file per key under a dedicated directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// The directory is created on first write if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path_for(&self, key: &str) -> PathBuf { self.dir.join(key) }
}

impl BlobStore for DiskStore {
    fn read(&self, key: &str) -> Result<Option<StoredBlob>, CacheError> {
        let path = self.path_for(key);
        let modified = match fs::metadata(&path) {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(StoredBlob { bytes, modified })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        // Write-then-rename so readers never see a half-written image.
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, self.path_for(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn clear(&self) -> Result<u64, CacheError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            fs::remove_file(&path)?;
            // Leftover write-then-rename temporaries are swept but are not entries.
            let temp = path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('.'));
            if !temp {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::new(tmp.path().join("ImageCache"));
        assert!(store.read("k").unwrap().is_none());

        store.write("k", b"bytes").unwrap();
        let blob = store.read("k").unwrap().unwrap();
        assert_eq!(blob.bytes, b"bytes");
        assert!(blob.modified <= SystemTime::now());

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert!(store.read("k").unwrap().is_none());
    }

    #[test]
    fn clear_counts_files_and_tolerates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::new(tmp.path().join("missing"));
        assert_eq!(store.clear().unwrap(), 0);
        store.write("a", b"1").unwrap();
        store.write("b", b"2").unwrap();
        std::fs::write(store.dir().join(".c.tmp"), b"partial").unwrap();
        assert_eq!(store.clear().unwrap(), 2);
        assert!(std::fs::read_dir(store.dir()).unwrap().next().is_none());
    }
}
