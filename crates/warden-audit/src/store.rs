//! Object-store boundary for audit evidence
//!
//! The engine only ever calls `put`; listing and retention are owned by
//! whatever backs the store. The filesystem implementation keeps the
//! deterministic path layout on local disk; the in-memory one backs tests
//! and can be told to fail every write.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::fs;
use warden_core::{Result, WardenError};

/// Write-only object store for screenshot blobs
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()>;
}

/// Filesystem-backed blob store rooted at a base directory
pub struct FsBlobStore {
    base_dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<()> {
        let file_path = self.base_dir.join(path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                WardenError::Storage(format!(
                    "Failed to create blob directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        fs::write(&file_path, bytes).await.map_err(|e| {
            WardenError::Storage(format!("Failed to write blob {}: {}", file_path.display(), e))
        })?;

        Ok(())
    }
}

/// In-memory blob store for tests, with switchable failure injection
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent put fail
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(WardenError::Storage("injected blob store failure".to_string()));
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }
}
