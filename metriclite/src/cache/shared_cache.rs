// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cluster-shared query result cache (L2)
//!
//! Reads are awaited; writes are fire-and-forget so a slow shared store
//! never adds latency to a request already satisfied elsewhere. The tier
//! is best-effort throughout: unavailability degrades to a miss and is
//! never on the query's failure path.

use super::cache_config::SharedCacheConfig;
use super::fingerprint::CacheFingerprint;
use crate::exec::Row;
use crate::storage::SharedKeyValueStore;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared result cache over the cluster key-value store.
pub struct SharedQueryCache {
    config: SharedCacheConfig,
    store: Arc<dyn SharedKeyValueStore>,
    write_permits: Arc<Semaphore>,
}

impl SharedQueryCache {
    pub fn new(config: SharedCacheConfig, store: Arc<dyn SharedKeyValueStore>) -> Self {
        let write_permits = Arc::new(Semaphore::new(config.max_pending_writes.max(1)));
        Self {
            config,
            store,
            write_permits,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<Row>> {
        if !self.config.enabled {
            return None;
        }
        match self.store.get(key).await {
            Ok(Some(bytes)) => match bincode::deserialize::<Vec<Row>>(&bytes) {
                Ok(rows) => Some(rows),
                Err(e) => {
                    warn!("Discarding undecodable shared cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Shared cache unavailable, treating as miss: {}", e);
                None
            }
        }
    }

    /// Fire-and-forget write on a detached task; never blocks or fails
    /// the caller. Writes beyond the pending bound are dropped.
    pub fn put(&self, key: String, rows: &[Row]) {
        if !self.config.enabled {
            return;
        }
        let bytes = match bincode::serialize(rows) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not encode rows for shared cache entry {}: {}", key, e);
                return;
            }
        };
        let permit = match self.write_permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Shared cache write backlog full, dropping write for {}", key);
                return;
            }
        };
        let store = self.store.clone();
        let ttl_secs = self.config.ttl_secs;
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = store.set_with_ttl(&key, bytes, ttl_secs).await {
                warn!("Shared cache write failed for {}: {}", key, e);
            }
        });
    }

    /// Delete every entry whose fingerprint mentions both the metric id
    /// and the time point. The scan pattern over-selects; candidates are
    /// confirmed by parsing the canonical key back.
    pub async fn invalidate(&self, metric_id: &str, time_point: &str) -> usize {
        if !self.config.enabled {
            return 0;
        }
        let pattern = CacheFingerprint::metric_scan_pattern(metric_id);
        let keys = match self.store.keys_matching(&pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Shared cache scan failed for {}: {}", pattern, e);
                return 0;
            }
        };
        let mut removed = 0;
        for key in keys {
            let matches = CacheFingerprint::parse(&key)
                .map_or(false, |fp| fp.mentions(metric_id, time_point));
            if !matches {
                continue;
            }
            match self.store.delete(&key).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Shared cache delete failed for {}: {}", key, e),
            }
        }
        debug!(
            "Shared cache invalidation for {}@{} removed {} entries",
            metric_id, time_point, removed
        );
        removed
    }
}
