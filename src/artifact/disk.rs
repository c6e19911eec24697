//! Persistent artifact tier.
//!
//! All artifacts live as sibling files in one directory, named
//! `<hex key><variant suffix>` (for example `3a7f….svg`, `3a7f….svg.gz`).
//!
//! Writes land in a uniquely named temporary file which is then renamed over
//! the final name. Rename is atomic on the same file system, so a reader sees
//! either the complete blob or nothing. Racing writers of the same key carry
//! identical content and the last rename wins harmlessly.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use super::key::CacheKey;
use super::store::ArtifactStore;
use super::variant::VariantKind;
use crate::error::StoreError;

/// Directory-backed artifact store.
pub struct DiskStore {
    root: PathBuf,
    temp_counter: AtomicU64,
}

impl DiskStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::Write {
                path: root.clone(),
                source,
            })?;
        Ok(Self {
            root,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// The directory holding the artifacts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `(key, kind)`.
    pub fn path_for(&self, key: &CacheKey, kind: VariantKind) -> PathBuf {
        self.root
            .join(format!("{}{}", key.as_str(), kind.file_suffix()))
    }

    fn temp_path_for(&self, final_path: &Path) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let mut name = final_path
            .file_name()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.{}.tmp", std::process::id(), n));
        final_path.with_file_name(name)
    }
}

#[async_trait]
impl ArtifactStore for DiskStore {
    async fn exists(&self, key: &CacheKey, kind: VariantKind) -> bool {
        fs::try_exists(self.path_for(key, kind))
            .await
            .unwrap_or(false)
    }

    async fn read(&self, key: &CacheKey, kind: VariantKind) -> Result<Option<Bytes>, StoreError> {
        let path = self.path_for(key, kind);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    async fn write(&self, key: &CacheKey, kind: VariantKind, data: Bytes) -> Result<(), StoreError> {
        let path = self.path_for(key, kind);
        let temp = self.temp_path_for(&path);

        if let Err(source) = fs::write(&temp, &data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StoreError::Write { path: temp, source });
        }

        if let Err(source) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StoreError::Write { path, source });
        }

        debug!(path = %path.display(), bytes = data.len(), "Wrote artifact");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}

// =============================================================================
// Tests
// =============================================================================
