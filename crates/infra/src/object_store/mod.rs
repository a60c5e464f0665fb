//! Object storage adapters.
//!
//! Objects are written whole: `put` replaces whatever was at the uri, there is
//! no append or partial write.

pub mod http;
pub mod in_memory;
pub mod local;
pub mod uri;

use std::sync::Arc;

use thiserror::Error;

pub use http::HttpObjectStore;
pub use in_memory::InMemoryObjectStore;
pub use local::LocalObjectStore;
pub use uri::ObjectUri;

/// Object store abstraction.
pub trait ObjectStore: Send + Sync {
    /// Fetch the full body of one object.
    fn get(&self, uri: &ObjectUri) -> Result<Vec<u8>, ObjectStoreError>;

    /// Atomically create or fully replace one object.
    fn put(&self, uri: &ObjectUri, body: &[u8]) -> Result<(), ObjectStoreError>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn get(&self, uri: &ObjectUri) -> Result<Vec<u8>, ObjectStoreError> {
        (**self).get(uri)
    }

    fn put(&self, uri: &ObjectUri, body: &[u8]) -> Result<(), ObjectStoreError> {
        (**self).put(uri, body)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn get(&self, uri: &ObjectUri) -> Result<Vec<u8>, ObjectStoreError> {
        (**self).get(uri)
    }

    fn put(&self, uri: &ObjectUri, body: &[u8]) -> Result<(), ObjectStoreError> {
        (**self).put(uri, body)
    }
}

/// Object store error.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("i/o error on {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage endpoint returned {status} for {uri}: {message}")]
    Http {
        uri: String,
        status: u16,
        message: String,
    },

    #[error("transport error on {uri}: {message}")]
    Transport { uri: String, message: String },

    #[error("operation not supported by this store: {0}")]
    Unsupported(String),
}

impl ObjectStoreError {
    pub(crate) fn io(uri: &ObjectUri, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound(uri.to_string());
        }
        Self::Io {
            uri: uri.to_string(),
            source,
        }
    }
}
