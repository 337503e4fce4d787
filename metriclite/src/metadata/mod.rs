// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Metric definitions and the metadata lookup boundary
//!
//! Definitions are loaded read-only per query from the metadata
//! collaborator and never mutated by the core.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Aggregation function applied to a metric's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl AggFunc {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Count => "COUNT",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
        }
    }
}

/// Metric kind: stored directly or derived from other metrics.
///
/// The formula lives inside the derived variants, so a physical metric
/// with an expression (or a derived one without) cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    /// Values are stored directly in physical partitions.
    Physical,
    /// Computed on the fly from a formula over other metrics.
    Virtual { expression: String },
    /// Composed from other metrics via a formula, eligible for reuse in
    /// further formulas.
    Composite { expression: String },
}

impl MetricKind {
    pub fn expression(&self) -> Option<&str> {
        match self {
            MetricKind::Physical => None,
            MetricKind::Virtual { expression } | MetricKind::Composite { expression } => {
                Some(expression)
            }
        }
    }
}

/// A metric (KPI) definition from the metadata collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub id: String,
    pub kind: MetricKind,
    pub agg_func: AggFunc,
    pub dim_combination_code: Option<String>,
}

impl MetricDefinition {
    pub fn physical(id: impl Into<String>, agg_func: AggFunc, dim_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Physical,
            agg_func,
            dim_combination_code: Some(dim_code.into()),
        }
    }

    pub fn composite(id: impl Into<String>, expression: impl Into<String>, agg_func: AggFunc) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Composite {
                expression: expression.into(),
            },
            agg_func,
            dim_combination_code: None,
        }
    }

    pub fn derived(id: impl Into<String>, expression: impl Into<String>, agg_func: AggFunc) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Virtual {
                expression: expression.into(),
            },
            agg_func,
            dim_combination_code: None,
        }
    }

    pub fn is_physical(&self) -> bool {
        matches!(self.kind, MetricKind::Physical)
    }
}

/// Binding from a source table to the metric model it feeds, used to turn
/// completion notifications into precise invalidations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBinding {
    pub model_id: String,
    pub metric_ids: Vec<String>,
}

/// Metadata lookup errors.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata lookup failed: {0}")]
    Lookup(String),
}

/// Metadata lookup collaborator. Implementations back onto whatever store
/// holds KPI and model definitions; the core only reads through this trait.
pub trait MetadataProvider: Send + Sync {
    fn find_metric_by_id(&self, id: &str) -> Result<Option<MetricDefinition>, MetadataError>;

    /// Source binding for a physical source table, if one is registered.
    fn find_source(&self, source_table: &str) -> Result<Option<SourceBinding>, MetadataError>;
}

/// In-memory metadata provider for embedding and tests.
#[derive(Default)]
pub struct MemoryMetadataProvider {
    metrics: RwLock<HashMap<String, MetricDefinition>>,
    sources: RwLock<HashMap<String, SourceBinding>>,
}

impl MemoryMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, definition: MetricDefinition) {
        self.metrics.write().insert(definition.id.clone(), definition);
    }

    pub fn with_metric(self, definition: MetricDefinition) -> Self {
        self.insert(definition);
        self
    }

    pub fn bind_source(&self, source_table: impl Into<String>, binding: SourceBinding) {
        self.sources.write().insert(source_table.into(), binding);
    }
}

impl MetadataProvider for MemoryMetadataProvider {
    fn find_metric_by_id(&self, id: &str) -> Result<Option<MetricDefinition>, MetadataError> {
        Ok(self.metrics.read().get(id).cloned())
    }

    fn find_source(&self, source_table: &str) -> Result<Option<SourceBinding>, MetadataError> {
        Ok(self.sources.read().get(source_table).cloned())
    }
}
