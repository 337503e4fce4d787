// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache configuration across the three tiers

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the three-tier cache hierarchy. Each tier can be
/// toggled independently; a disabled tier reads as a permanent miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Process-local result cache (L1).
    pub local: LocalCacheConfig,

    /// Cluster-shared result cache (L2).
    pub shared: SharedCacheConfig,

    /// Local partition file cache (L3).
    pub partition: PartitionCacheConfig,
}

/// L1 configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCacheConfig {
    pub enabled: bool,

    /// Maximum number of cached query results.
    pub max_entries: usize,

    /// Time-to-live per entry; short by design, L1 is only a hot window.
    pub ttl: Duration,
}

/// L2 configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedCacheConfig {
    pub enabled: bool,

    /// TTL handed to the shared store on every write.
    pub ttl_secs: u64,

    /// Upper bound on concurrently in-flight fire-and-forget writes;
    /// writes beyond it are dropped, never queued against the caller.
    pub max_pending_writes: usize,
}

/// L3 configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionCacheConfig {
    pub enabled: bool,

    /// Root directory partition files are cached under.
    pub root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local: LocalCacheConfig {
                enabled: true,
                max_entries: 512,
                ttl: Duration::from_secs(300), // 5 minutes
            },
            shared: SharedCacheConfig {
                enabled: true,
                ttl_secs: 1800, // 30 minutes
                max_pending_writes: 64,
            },
            partition: PartitionCacheConfig {
                enabled: true,
                root: PathBuf::from("./partition-cache"),
            },
        }
    }
}

impl CacheConfig {
    /// Configuration with every tier disabled (pass-through mode).
    pub fn disabled() -> Self {
        let mut config = Self::default();
        config.local.enabled = false;
        config.shared.enabled = false;
        config.partition.enabled = false;
        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.local.enabled && self.local.max_entries == 0 {
            return Err("Local cache requires max_entries > 0".to_string());
        }
        if self.shared.enabled && self.shared.ttl_secs == 0 {
            return Err("Shared cache requires ttl_secs > 0".to_string());
        }
        if self.shared.enabled && self.shared.max_pending_writes == 0 {
            return Err("Shared cache requires max_pending_writes > 0".to_string());
        }
        if self.partition.enabled && self.partition.root.as_os_str().is_empty() {
            return Err("Partition cache requires a root directory".to_string());
        }
        Ok(())
    }
}
