// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Embedded analytical engine boundary

use crate::exec::Row;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Analytical engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to attach partition under {alias}: {message}")]
    Attach { alias: String, message: String },

    #[error("Failed to materialize staging relation {relation}: {message}")]
    Staging { relation: String, message: String },

    #[error("Statement failed: {0}")]
    Statement(String),
}

/// Embedded analytical query engine, consumed as a black box: it accepts a
/// generated statement plus a set of attachable file-backed tables (or one
/// pre-materialized staging relation) and returns rows.
#[async_trait]
pub trait AnalyticalEngine: Send + Sync {
    /// Attach a partition file under the given alias.
    async fn attach(&self, alias: &str, path: &Path) -> Result<(), EngineError>;

    /// Detach a previously attached partition.
    async fn detach(&self, alias: &str) -> Result<(), EngineError>;

    /// Load the given partition files into one staging relation.
    async fn load_staging(&self, relation: &str, paths: &[PathBuf]) -> Result<(), EngineError>;

    /// Drop a staging relation created by `load_staging`.
    async fn drop_staging(&self, relation: &str) -> Result<(), EngineError>;

    /// Run a generated statement and return its rows.
    async fn query(&self, statement: &str) -> Result<Vec<Row>, EngineError>;
}
