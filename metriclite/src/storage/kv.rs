// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared key-value store boundary

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Shared key-value store errors.
#[derive(Error, Debug)]
pub enum KeyValueStoreError {
    #[error("Shared store unavailable: {0}")]
    Unavailable(String),
}

/// Cluster-shared key-value store with TTL semantics, consumed by the L2
/// result cache. `keys_matching` takes a glob-star pattern (`*` wildcards).
#[async_trait]
pub trait SharedKeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KeyValueStoreError>;

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: u64,
    ) -> Result<(), KeyValueStoreError>;

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, KeyValueStoreError>;

    async fn delete(&self, key: &str) -> Result<(), KeyValueStoreError>;
}

/// In-memory shared store for embedding and tests. TTLs expire lazily on
/// access.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, (Vec<u8>, Option<Instant>)>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl SharedKeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KeyValueStoreError> {
        let expired = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some((bytes, deadline)) => {
                    if deadline.map_or(false, |d| Instant::now() > d) {
                        true
                    } else {
                        return Ok(Some(bytes.clone()));
                    }
                }
                None => return Ok(None),
            }
        };
        if expired {
            self.entries.write().remove(key);
        }
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: u64,
    ) -> Result<(), KeyValueStoreError> {
        let deadline = (ttl_secs > 0).then(|| Instant::now() + Duration::from_secs(ttl_secs));
        self.entries
            .write()
            .insert(key.to_string(), (value, deadline));
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, KeyValueStoreError> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), KeyValueStoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Minimal glob matcher: `*` matches any run of characters.
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }
    let mut rest = key;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}
