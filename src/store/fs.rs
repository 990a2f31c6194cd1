//! Filesystem [`BlobStore`]: one flat directory per namespace.
//!
//! Writes go to a uniquely named, dot-prefixed temporary file in the target
//! directory and are renamed into place, so a reader never observes a
//! half-written artifact and a failed write leaves the previous one intact.
//! Concurrent writers of one name never share a staging file; the last
//! rename wins.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use super::BlobStore;
use crate::config::Config;
use crate::models::Namespace;

pub struct FsBlobStore {
    raw_dir: PathBuf,
    cleaned_dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(raw_dir: impl Into<PathBuf>, cleaned_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            cleaned_dir: cleaned_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.storage.raw_dir(), config.storage.cleaned_dir())
    }

    /// Creates both namespace directories. Idempotent.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.raw_dir)?;
        fs::create_dir_all(&self.cleaned_dir)?;
        Ok(())
    }

    pub fn dir(&self, namespace: Namespace) -> &Path {
        match namespace {
            Namespace::Raw => &self.raw_dir,
            Namespace::Cleaned => &self.cleaned_dir,
        }
    }

    fn path(&self, namespace: Namespace, name: &str) -> PathBuf {
        self.dir(namespace).join(name)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, namespace: Namespace, name: &str, bytes: &[u8]) -> io::Result<String> {
        let dir = self.dir(namespace);
        fs::create_dir_all(dir)?;

        // dropped (and deleted) on any error before persist
        let mut staging = NamedTempFile::new_in(dir)?;
        staging.write_all(bytes)?;
        staging.as_file().sync_all()?;
        staging.persist(self.path(namespace, name))?;
        Ok(self.location(namespace, name))
    }

    fn get(&self, namespace: Namespace, name: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path(namespace, name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, namespace: Namespace, name: &str) -> io::Result<bool> {
        Ok(self.path(namespace, name).is_file())
    }

    fn list(&self, namespace: Namespace) -> io::Result<Vec<String>> {
        let dir = self.dir(namespace);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            // staging files
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }

    fn location(&self, namespace: Namespace, name: &str) -> String {
        self.path(namespace, name).display().to_string()
    }
}
