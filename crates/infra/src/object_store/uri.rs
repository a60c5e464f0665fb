use std::path::{Path, PathBuf};

use super::ObjectStoreError;

/// Location of one object (or a prefix of objects).
///
/// Accepted forms: `s3://bucket/key`, `file:///abs/path`, and bare filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectUri {
    Bucket { bucket: String, key: String },
    File(PathBuf),
}

impl ObjectUri {
    pub fn parse(raw: &str) -> Result<Self, ObjectStoreError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ObjectStoreError::InvalidUri {
                uri: raw.to_string(),
                reason: "empty uri".to_string(),
            });
        }

        if let Some(rest) = raw.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(ObjectStoreError::InvalidUri {
                    uri: raw.to_string(),
                    reason: "missing bucket".to_string(),
                });
            }
            return Ok(Self::Bucket {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        if let Some(path) = raw.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }

        if raw.contains("://") {
            return Err(ObjectStoreError::InvalidUri {
                uri: raw.to_string(),
                reason: "unsupported scheme".to_string(),
            });
        }

        Ok(Self::File(PathBuf::from(raw)))
    }

    /// Last path segment, e.g. `part-0001.jsonl`.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            ObjectUri::Bucket { key, .. } => key.rsplit('/').next().filter(|s| !s.is_empty()),
            ObjectUri::File(path) => path.file_name().and_then(|n| n.to_str()),
        }
    }

    /// Treat `self` as a directory-like prefix and address `name` under it.
    pub fn child(&self, name: &str) -> Self {
        match self {
            ObjectUri::Bucket { bucket, key } => {
                let key = if key.is_empty() || key.ends_with('/') {
                    format!("{key}{name}")
                } else {
                    format!("{key}/{name}")
                };
                ObjectUri::Bucket {
                    bucket: bucket.clone(),
                    key,
                }
            }
            ObjectUri::File(path) => ObjectUri::File(path.join(name)),
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ObjectUri::File(p) => Some(p),
            ObjectUri::Bucket { .. } => None,
        }
    }
}

impl core::fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ObjectUri::Bucket { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            ObjectUri::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl core::str::FromStr for ObjectUri {
    type Err = ObjectStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
