//! In-memory [`BlobStore`] for tests and embedding.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety.

use std::collections::HashMap;
use std::io;
use std::sync::RwLock;

use super::BlobStore;
use crate::models::Namespace;

pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<(Namespace, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, namespace: Namespace, name: &str, bytes: &[u8]) -> io::Result<String> {
        let mut blobs = self.blobs.write().unwrap();
        blobs.insert((namespace, name.to_string()), bytes.to_vec());
        Ok(self.location(namespace, name))
    }

    fn get(&self, namespace: Namespace, name: &str) -> io::Result<Option<Vec<u8>>> {
        let blobs = self.blobs.read().unwrap();
        Ok(blobs.get(&(namespace, name.to_string())).cloned())
    }

    fn exists(&self, namespace: Namespace, name: &str) -> io::Result<bool> {
        let blobs = self.blobs.read().unwrap();
        Ok(blobs.contains_key(&(namespace, name.to_string())))
    }

    fn list(&self, namespace: Namespace) -> io::Result<Vec<String>> {
        let blobs = self.blobs.read().unwrap();
        let mut names: Vec<String> = blobs
            .keys()
            .filter(|(ns, _)| *ns == namespace)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn location(&self, namespace: Namespace, name: &str) -> String {
        format!("memory://{}/{}", namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_per_namespace() {
        let store = MemoryBlobStore::new();
        let loc = store.put(Namespace::Cleaned, "a.csv", b"x").unwrap();
        assert_eq!(loc, "memory://cleaned/a.csv");
        assert!(store.exists(Namespace::Cleaned, "a.csv").unwrap());
        assert!(!store.exists(Namespace::Raw, "a.csv").unwrap());
        assert_eq!(store.list(Namespace::Cleaned).unwrap(), vec!["a.csv"]);
        assert!(store.list(Namespace::Raw).unwrap().is_empty());
    }
}
