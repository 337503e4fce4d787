// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Remote object store boundary

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Remote object store errors. Not-found is distinguishable from transient
/// failures so callers can surface missing partitions without retrying,
/// while transient failures are left to the calling layer's retry policy.
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Transient object store error: {0}")]
    Transient(String),
}

/// Remote object store holding partition files, keyed by storage key.
#[async_trait]
pub trait RemoteObjectStore: Send + Sync {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), ObjectStoreError>;

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;

    async fn download(&self, key: &str, local_path: &Path) -> Result<(), ObjectStoreError>;
}

/// In-memory object store for embedding and tests.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    downloads: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing the upload path.
    pub fn put_object(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.objects.write().insert(key.into(), bytes);
    }

    /// Number of downloads served so far.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RemoteObjectStore for MemoryObjectStore {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), ObjectStoreError> {
        let bytes = std::fs::read(local_path)
            .map_err(|e| ObjectStoreError::Transient(format!("read {}: {}", local_path.display(), e)))?;
        self.objects.write().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        Ok(self.objects.read().contains_key(key))
    }

    async fn download(&self, key: &str, local_path: &Path) -> Result<(), ObjectStoreError> {
        let bytes = self
            .objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))?;
        self.downloads.fetch_add(1, Ordering::Relaxed);
        std::fs::write(local_path, bytes)
            .map_err(|e| ObjectStoreError::Transient(format!("write {}: {}", local_path.display(), e)))
    }
}
