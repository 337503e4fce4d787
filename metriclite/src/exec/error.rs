// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use crate::cache::PartitionCacheError;
use crate::storage::{EngineError, ObjectStoreError};
use thiserror::Error;

/// Failures while executing a single time point's statement. Scoped to
/// that time point; sibling time points keep running.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The object store has no such partition. Distinct from transient
    /// store errors, which the calling layer may retry.
    #[error("Partition unavailable: {0}")]
    PartitionUnavailable(String),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Local file error: {0}")]
    Io(String),
}

impl From<EngineError> for ExecutionError {
    fn from(error: EngineError) -> Self {
        ExecutionError::Engine(error.to_string())
    }
}

impl From<ObjectStoreError> for ExecutionError {
    fn from(error: ObjectStoreError) -> Self {
        match error {
            ObjectStoreError::NotFound(key) => ExecutionError::PartitionUnavailable(key),
            ObjectStoreError::Transient(message) => ExecutionError::ObjectStore(message),
        }
    }
}

impl From<PartitionCacheError> for ExecutionError {
    fn from(error: PartitionCacheError) -> Self {
        match error {
            PartitionCacheError::NotFound(key) => ExecutionError::PartitionUnavailable(key),
            PartitionCacheError::Store(message) => ExecutionError::ObjectStore(message),
            PartitionCacheError::Io(e) => ExecutionError::Io(e.to_string()),
        }
    }
}
