// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Three-tier cache hierarchy
//!
//! L1 in-process, L2 cluster-shared, L3 partition files. Query results
//! read L1 then L2 and write both; partition files are independent of the
//! query-level tiers and are consulted by the executor only. Caching is
//! best-effort end to end: a failing tier reads as a miss and never fails
//! the query.

use super::cache_config::CacheConfig;
use super::fingerprint::CacheFingerprint;
use super::local_cache::{LocalQueryCache, TierStats};
use super::partition_cache::PartitionFileCache;
use super::shared_cache::SharedQueryCache;
use crate::exec::Row;
use crate::storage::{RemoteObjectStore, SharedKeyValueStore};
use log::debug;
use std::sync::Arc;

/// The three cache tiers, consulted in order on read and written in
/// order on write.
pub struct CacheHierarchy {
    local: LocalQueryCache,
    shared: SharedQueryCache,
    partitions: Arc<PartitionFileCache>,
}

impl CacheHierarchy {
    pub fn new(
        config: CacheConfig,
        kv_store: Arc<dyn SharedKeyValueStore>,
        object_store: Arc<dyn RemoteObjectStore>,
    ) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            local: LocalQueryCache::new(config.local),
            shared: SharedQueryCache::new(config.shared, kv_store),
            partitions: Arc::new(PartitionFileCache::new(config.partition, object_store)),
        })
    }

    /// Query-result read path: L1, then L2, refilling L1 on an L2 hit.
    pub async fn get(&self, fingerprint: &CacheFingerprint) -> Option<Vec<Row>> {
        let key = fingerprint.canonical();
        if let Some(rows) = self.local.get(&key) {
            debug!("L1 hit: {}", key);
            return Some(rows);
        }
        if let Some(rows) = self.shared.get(&key).await {
            debug!("L2 hit: {}", key);
            self.local.put(key, rows.clone());
            return Some(rows);
        }
        None
    }

    /// Populate L1 synchronously and L2 fire-and-forget.
    pub fn put(&self, fingerprint: &CacheFingerprint, rows: Vec<Row>) {
        let key = fingerprint.canonical();
        self.shared.put(key.clone(), &rows);
        self.local.put(key, rows);
    }

    /// Evict the exact (metric id, time point) coordinate from all tiers.
    pub async fn invalidate(&self, metric_id: &str, time_point: &str) {
        let l1 = self.local.invalidate(metric_id, time_point);
        let l2 = self.shared.invalidate(metric_id, time_point).await;
        let l3 = self.partitions.invalidate(metric_id, time_point);
        debug!(
            "Invalidated {}@{}: {} local, {} shared, {} partition entries",
            metric_id, time_point, l1, l2, l3
        );
    }

    /// Partition tier handle for the executor.
    pub fn partitions(&self) -> Arc<PartitionFileCache> {
        self.partitions.clone()
    }

    pub fn local_stats(&self) -> TierStats {
        self.local.stats()
    }

    pub fn clear_local(&self) {
        self.local.clear();
    }
}
