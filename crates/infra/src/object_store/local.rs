use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{ObjectStore, ObjectStoreError, ObjectUri};

/// Filesystem-backed object store.
///
/// - `file://` uris and bare paths address the filesystem directly.
/// - `s3://bucket/key` uris are mirrored under `root/bucket/key`.
///
/// Writes go to a temp file in the destination directory which is then renamed
/// over the target, so readers never observe a partially written object.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, uri: &ObjectUri) -> PathBuf {
        match uri {
            ObjectUri::File(path) => path.clone(),
            ObjectUri::Bucket { bucket, key } => {
                let mut p = self.root.join(bucket);
                for seg in key.split('/').filter(|s| !s.is_empty()) {
                    p.push(seg);
                }
                p
            }
        }
    }
}

impl ObjectStore for LocalObjectStore {
    fn get(&self, uri: &ObjectUri) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.resolve(uri);
        fs::read(&path).map_err(|e| ObjectStoreError::io(uri, e))
    }

    fn put(&self, uri: &ObjectUri, body: &[u8]) -> Result<(), ObjectStoreError> {
        let path = self.resolve(uri);
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| ObjectStoreError::io(uri, e))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| ObjectStoreError::io(uri, e))?;
        tmp.write_all(body).map_err(|e| ObjectStoreError::io(uri, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| ObjectStoreError::io(uri, e))?;
        tmp.persist(&path)
            .map_err(|e| ObjectStoreError::io(uri, e.error))?;

        debug!(uri = %uri, bytes = body.len(), "object written");
        Ok(())
    }
}
