// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Metric dependency resolution
//!
//! Expands a metric definition at a time point into the set of physical
//! partitions transitively required to compute it, following
//! `${metricId[.modifier]}` formula references. Dependency traversal is
//! pure in-memory computation over an arena of definitions keyed by id;
//! the metadata lookup is the injected collaborator.

use crate::exec::QueryContext;
use crate::metadata::{MetadataError, MetadataProvider, MetricDefinition, MetricKind};
use crate::resolver::time_shift::{shift_time_point, TimeModifier};
use crate::storage::PhysicalTableRef;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

/// Maximum formula nesting before resolution is rejected. Protects
/// against malformed or malicious expressions recursing without bound.
pub const MAX_RESOLVE_DEPTH: usize = 50;

/// Dimension-combination code applied when a physical metric has none.
pub const DEFAULT_DIM_CODE: &str = "C00";

static METRIC_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\s*([A-Za-z][A-Za-z0-9_]*)(?:\.([A-Za-z][A-Za-z0-9_]*))?\s*\}")
        .expect("metric reference pattern")
});

/// Resolution failures. These indicate malformed metric definitions, not
/// transient conditions, and fail the whole query.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Circular dependency at {metric_id}@{time_point}")]
    CircularDependency {
        metric_id: String,
        time_point: String,
    },

    #[error("Expression nesting too deep resolving {metric_id}")]
    ExpressionTooComplex { metric_id: String },

    #[error("Referenced metric not found: {0}")]
    UnresolvedMetricReference(String),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// One `${metricId[.modifier]}` reference inside a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricReference {
    pub metric_id: String,
    pub modifier: TimeModifier,
}

/// Scan a formula for metric references, in order of appearance.
pub fn scan_references(expression: &str) -> Vec<MetricReference> {
    METRIC_REFERENCE
        .captures_iter(expression)
        .map(|caps| MetricReference {
            metric_id: caps[1].to_string(),
            modifier: caps
                .get(2)
                .map(|m| TimeModifier::parse(m.as_str()))
                .unwrap_or(TimeModifier::Current),
        })
        .collect()
}

/// Expands metric formulas into the physical partitions they require.
pub struct MetricDependencyResolver<'a> {
    metadata: &'a dyn MetadataProvider,
}

impl<'a> MetricDependencyResolver<'a> {
    pub fn new(metadata: &'a dyn MetadataProvider) -> Self {
        Self { metadata }
    }

    /// Add every physical partition transitively required to compute
    /// `metric` at `time_point` to the context.
    pub fn resolve(
        &self,
        metric: &MetricDefinition,
        time_point: &str,
        ctx: &mut QueryContext,
    ) -> Result<(), ResolveError> {
        self.resolve_branch(metric, time_point, ctx, &HashSet::new(), 0)
    }

    fn resolve_branch(
        &self,
        metric: &MetricDefinition,
        time_point: &str,
        ctx: &mut QueryContext,
        visited: &HashSet<(String, String)>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        if depth > MAX_RESOLVE_DEPTH {
            return Err(ResolveError::ExpressionTooComplex {
                metric_id: metric.id.clone(),
            });
        }
        let key = (metric.id.clone(), time_point.to_string());
        if visited.contains(&key) {
            return Err(ResolveError::CircularDependency {
                metric_id: key.0,
                time_point: key.1,
            });
        }

        match &metric.kind {
            MetricKind::Physical => {
                let dim_code = match &metric.dim_combination_code {
                    Some(code) => code.clone(),
                    None => {
                        warn!(
                            "Metric {} has no dimension combination code, using {}",
                            metric.id, DEFAULT_DIM_CODE
                        );
                        DEFAULT_DIM_CODE.to_string()
                    }
                };
                ctx.register_table(PhysicalTableRef::new(&metric.id, time_point, dim_code));
                Ok(())
            }
            MetricKind::Virtual { expression } | MetricKind::Composite { expression } => {
                // Each branch extends its own copy of the visited set, so
                // only ancestor keys count as cycles; sibling references
                // may legally revisit a shared dependency.
                let mut branch = visited.clone();
                branch.insert(key);
                for reference in scan_references(expression) {
                    let target_time = shift_time_point(time_point, reference.modifier);
                    let definition = self
                        .metadata
                        .find_metric_by_id(&reference.metric_id)?
                        .ok_or_else(|| {
                            ResolveError::UnresolvedMetricReference(reference.metric_id.clone())
                        })?;
                    self.resolve_branch(&definition, &target_time, ctx, &branch, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}
