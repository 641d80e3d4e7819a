//! File I/O with single-flight locking
//!
//! Concurrent callers targeting the same stored file must serialize:
//! a sidecar `.lock` file is acquired before load and held until the
//! guard drops after save. Saves go through a temp file and an atomic
//! rename, so a crash mid-write never leaves a torn container.

use crate::{load_container, save_container, CarryOver, LoadedDocument, Result, StoreError};
use doc_model::Document;
use std::path::{Path, PathBuf};

/// Held for the duration of a load/edit/save cycle on one file.
/// Dropping it releases the lock.
#[derive(Debug)]
pub struct FileLock {
    lock_path: PathBuf,
}

impl FileLock {
    /// Acquire the lock for a target path. Fails with `Locked` when
    /// another holder exists.
    pub fn acquire(target: impl AsRef<Path>) -> Result<Self> {
        let lock_path = lock_path_for(target.as_ref());
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => Ok(Self { lock_path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(
                StoreError::Locked(target.as_ref().display().to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            tracing::warn!(path = %self.lock_path.display(), error = %e, "failed to release file lock");
        }
    }
}

fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    target.with_file_name(name)
}

/// Load a document container from disk
pub async fn load_document(path: impl AsRef<Path>) -> Result<LoadedDocument> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }
    let bytes = tokio::fs::read(path).await?;
    load_container(&bytes)
}

/// Save a document container to disk atomically: write a sibling temp
/// file, then rename over the target.
pub async fn save_document(
    doc: &Document,
    carry_over: &CarryOver,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = save_container(doc, carry_over)?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, &bytes).await?;
    match tokio::fs::rename(&tmp_path, path).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Leave no droppings next to the target
            let _ = tokio::fs::remove_file(&tmp_path).await;
            Err(e.into())
        }
    }
}

/// Load synchronously
pub fn load_document_sync(path: impl AsRef<Path>) -> Result<LoadedDocument> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    load_container(&bytes)
}

/// Save synchronously and atomically
pub fn save_document_sync(
    doc: &Document,
    carry_over: &CarryOver,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = save_container(doc, carry_over)?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, &bytes)?;
    match std::fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = std::fs::remove_file(&tmp_path);
            Err(e.into())
        }
    }
}
