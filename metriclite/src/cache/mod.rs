// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Three-tier result caching with cluster-wide precise invalidation
//!
//! This module provides:
//! - Canonical query fingerprints (order-independent cache keys)
//! - L1: process-local LRU + TTL result cache
//! - L2: cluster-shared result cache over the key-value store
//! - L3: local partition file cache over the remote object store
//! - The invalidation bus evicting exact (metric, time point) coordinates
//!   on every node

pub mod cache_config;
pub mod fingerprint;
pub mod hierarchy;
pub mod invalidation;
pub mod local_cache;
pub mod partition_cache;
pub mod shared_cache;

pub use cache_config::{CacheConfig, LocalCacheConfig, PartitionCacheConfig, SharedCacheConfig};
pub use fingerprint::{CacheFingerprint, EntryKind};
pub use hierarchy::CacheHierarchy;
pub use invalidation::{
    apply_event, CacheInvalidationEvent, InvalidationBus, INVALIDATION_CHANNEL,
};
pub use local_cache::{LocalQueryCache, TierStats};
pub use partition_cache::{PartitionCacheError, PartitionFileCache};
pub use shared_cache::SharedQueryCache;
