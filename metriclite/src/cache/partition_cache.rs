// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Local partition file cache (L3)
//!
//! Caches partition files fetched from the remote object store on local
//! disk. Downloads land in a temp file in the destination directory and
//! are renamed into place, so a concurrent reader never observes a
//! partially written file. There is no distributed download lock:
//! concurrent downloaders of the same missing partition race benignly,
//! each finishing with an atomic rename to the same content.
//!
//! The rename is atomic only within one filesystem; the cache root must
//! not straddle a mount boundary.

use super::cache_config::PartitionCacheConfig;
use crate::storage::{time_point_prefix, ObjectStoreError, PhysicalTableRef, RemoteObjectStore};
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Partition cache failures.
#[derive(Error, Debug)]
pub enum PartitionCacheError {
    #[error("Partition not found in object store: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    Store(String),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ObjectStoreError> for PartitionCacheError {
    fn from(error: ObjectStoreError) -> Self {
        match error {
            ObjectStoreError::NotFound(key) => PartitionCacheError::NotFound(key),
            ObjectStoreError::Transient(message) => PartitionCacheError::Store(message),
        }
    }
}

/// Local file cache over the remote object store.
pub struct PartitionFileCache {
    config: PartitionCacheConfig,
    store: Arc<dyn RemoteObjectStore>,
    /// Directories already created; skips repeated create_dir_all calls.
    known_dirs: RwLock<HashSet<PathBuf>>,
}

impl PartitionFileCache {
    pub fn new(config: PartitionCacheConfig, store: Arc<dyn RemoteObjectStore>) -> Self {
        Self {
            config,
            store,
            known_dirs: RwLock::new(HashSet::new()),
        }
    }

    /// Local path of the partition file, downloading it on a miss. With
    /// the tier disabled, every call downloads to a throwaway temp path
    /// and nothing is cached.
    pub async fn get_or_download(
        &self,
        table: &PhysicalTableRef,
    ) -> Result<PathBuf, PartitionCacheError> {
        let key = table.storage_key();

        if !self.config.enabled {
            let throwaway = std::env::temp_dir().join(format!(
                "{}.{:016x}",
                table.table_name(),
                fastrand::u64(..)
            ));
            self.store.download(&key, &throwaway).await?;
            return Ok(throwaway);
        }

        let local = self.config.root.join(&key);
        if local.exists() {
            debug!("Partition cache hit: {}", local.display());
            return Ok(local);
        }

        if let Some(parent) = local.parent() {
            self.ensure_dir(parent)?;
        }
        let tmp = local.with_file_name(format!(
            "{}.tmp{:016x}",
            table.table_name(),
            fastrand::u64(..)
        ));
        if let Err(e) = self.store.download(&key, &tmp).await {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        std::fs::rename(&tmp, &local)?;
        debug!("Partition cached: {}", local.display());
        Ok(local)
    }

    fn ensure_dir(&self, dir: &Path) -> std::io::Result<()> {
        if self.known_dirs.read().contains(dir) {
            return Ok(());
        }
        std::fs::create_dir_all(dir)?;
        self.known_dirs.write().insert(dir.to_path_buf());
        Ok(())
    }

    /// Remove cached partition files for the (metric, time point)
    /// coordinate across every dimension combination. Returns the number
    /// of files removed.
    pub fn invalidate(&self, metric_id: &str, time_point: &str) -> usize {
        if !self.config.enabled {
            return 0;
        }
        let time_dir = self.config.root.join(time_point_prefix(time_point));
        let Ok(dim_dirs) = std::fs::read_dir(&time_dir) else {
            return 0;
        };
        let prefix = format!("{}_{}_", metric_id, time_point);
        let mut removed = 0;
        for dim_dir in dim_dirs.flatten() {
            let Ok(files) = std::fs::read_dir(dim_dir.path()) else {
                continue;
            };
            for file in files.flatten() {
                let name = file.file_name();
                let matches = name.to_string_lossy().starts_with(&prefix);
                if !matches {
                    continue;
                }
                match std::fs::remove_file(file.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(
                        "Could not remove cached partition {}: {}",
                        file.path().display(),
                        e
                    ),
                }
            }
        }
        if removed > 0 {
            debug!(
                "Partition cache invalidation for {}@{} removed {} files",
                metric_id, time_point, removed
            );
        }
        removed
    }
}
