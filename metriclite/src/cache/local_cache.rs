// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Process-local query result cache (L1)

use super::cache_config::LocalCacheConfig;
use super::fingerprint::CacheFingerprint;
use crate::exec::Row;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Hit/miss statistics for one cache tier.
#[derive(Debug, Default, Clone)]
pub struct TierStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub insertions: u64,
    pub entries: usize,
}

impl TierStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
struct LocalEntry {
    rows: Vec<Row>,
    created_at: Instant,
}

struct LocalState {
    entries: HashMap<String, LocalEntry>,
    /// LRU order, most recently used at the back.
    order: VecDeque<String>,
    stats: TierStats,
}

/// Bounded LRU + TTL in-process cache keyed by canonical fingerprints.
/// Synchronous on both read and write; never touches the network.
pub struct LocalQueryCache {
    config: LocalCacheConfig,
    state: Mutex<LocalState>,
}

impl LocalQueryCache {
    pub fn new(config: LocalCacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LocalState {
                entries: HashMap::new(),
                order: VecDeque::new(),
                stats: TierStats::default(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<Row>> {
        if !self.config.enabled {
            return None;
        }
        let mut state = self.state.lock();
        match state.entries.get(key) {
            Some(entry) if entry.created_at.elapsed() <= self.config.ttl => {
                let rows = entry.rows.clone();
                touch(&mut state.order, key);
                state.stats.hits += 1;
                Some(rows)
            }
            Some(_) => {
                // Expired; drop it on the way out.
                state.entries.remove(key);
                state.order.retain(|k| k != key);
                state.stats.misses += 1;
                None
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    pub fn put(&self, key: String, rows: Vec<Row>) {
        if !self.config.enabled {
            return;
        }
        let mut state = self.state.lock();
        state.entries.insert(
            key.clone(),
            LocalEntry {
                rows,
                created_at: Instant::now(),
            },
        );
        touch(&mut state.order, &key);
        state.stats.insertions += 1;
        while state.entries.len() > self.config.max_entries {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                state.stats.evictions += 1;
            } else {
                break;
            }
        }
    }

    /// Evict every entry whose fingerprint mentions both the metric id
    /// and the time point. Returns the number of evicted entries.
    pub fn invalidate(&self, metric_id: &str, time_point: &str) -> usize {
        if !self.config.enabled {
            return 0;
        }
        let mut state = self.state.lock();
        let doomed: Vec<String> = state
            .entries
            .keys()
            .filter(|key| {
                CacheFingerprint::parse(key)
                    .map_or(false, |fp| fp.mentions(metric_id, time_point))
            })
            .cloned()
            .collect();
        for key in &doomed {
            state.entries.remove(key);
            state.order.retain(|k| k != key);
            state.stats.evictions += 1;
        }
        doomed.len()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }

    pub fn stats(&self) -> TierStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.entries = state.entries.len();
        stats
    }
}

fn touch(order: &mut VecDeque<String>, key: &str) {
    order.retain(|k| k != key);
    order.push_back(key.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint::EntryKind;
    use crate::exec::Value;
    use std::time::Duration;

    fn config(max_entries: usize) -> LocalCacheConfig {
        LocalCacheConfig {
            enabled: true,
            max_entries,
            ttl: Duration::from_secs(60),
        }
    }

    fn key(metric: &str, time_point: &str) -> String {
        CacheFingerprint::new(
            &[metric.to_string()],
            &[time_point.to_string()],
            &[],
            false,
            EntryKind::QueryResult,
        )
        .canonical()
    }

    fn one_row() -> Vec<Row> {
        let mut row = Row::new();
        row.set("value", Value::Number(1.0));
        vec![row]
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let cache = LocalQueryCache::new(config(2));
        cache.put(key("KD1", "20251201"), one_row());
        cache.put(key("KD2", "20251201"), one_row());
        // Touch KD1 so KD2 becomes the eviction candidate.
        assert!(cache.get(&key("KD1", "20251201")).is_some());
        cache.put(key("KD3", "20251201"), one_row());
        assert!(cache.get(&key("KD1", "20251201")).is_some());
        assert!(cache.get(&key("KD2", "20251201")).is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn expired_entries_read_as_misses() {
        let cache = LocalQueryCache::new(LocalCacheConfig {
            enabled: true,
            max_entries: 8,
            ttl: Duration::from_secs(0),
        });
        cache.put(key("KD1", "20251201"), one_row());
        assert!(cache.get(&key("KD1", "20251201")).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn invalidation_targets_the_exact_coordinate() {
        let cache = LocalQueryCache::new(config(8));
        cache.put(key("KD1", "20251201"), one_row());
        cache.put(key("KD1", "20251202"), one_row());
        cache.put(key("KD2", "20251201"), one_row());
        assert_eq!(cache.invalidate("KD1", "20251201"), 1);
        assert!(cache.get(&key("KD1", "20251201")).is_none());
        assert!(cache.get(&key("KD1", "20251202")).is_some());
        assert!(cache.get(&key("KD2", "20251201")).is_some());
    }

    #[test]
    fn disabled_tier_is_a_permanent_miss() {
        let cache = LocalQueryCache::new(LocalCacheConfig {
            enabled: false,
            max_entries: 8,
            ttl: Duration::from_secs(60),
        });
        cache.put(key("KD1", "20251201"), one_row());
        assert!(cache.get(&key("KD1", "20251201")).is_none());
    }
}
