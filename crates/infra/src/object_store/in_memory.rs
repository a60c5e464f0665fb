use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use super::{ObjectStore, ObjectStoreError, ObjectUri};

/// In-memory object store.
///
/// Intended for tests/dev. Objects are keyed by their rendered uri.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<ObjectUri, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object from text.
    pub fn insert_text(&self, uri: &ObjectUri, text: &str) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.clone(), text.as_bytes().to_vec());
    }

    pub fn text(&self, uri: &ObjectUri) -> Option<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn get(&self, uri: &ObjectUri) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(uri.to_string()))
    }

    fn put(&self, uri: &ObjectUri, body: &[u8]) -> Result<(), ObjectStoreError> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.clone(), body.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> ObjectUri {
        ObjectUri::parse(s).unwrap()
    }

    #[test]
    fn put_replaces_whole_object() {
        let store = InMemoryObjectStore::new();
        let target = uri("s3://b/out/a.out");

        store.put(&target, b"one\ntwo").unwrap();
        store.put(&target, b"three").unwrap();

        assert_eq!(store.get(&target).unwrap(), b"three".to_vec());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_object_is_not_found() {
        let store = InMemoryObjectStore::new();
        assert!(matches!(
            store.get(&uri("s3://b/nope")),
            Err(ObjectStoreError::NotFound(_))
        ));
    }
}
