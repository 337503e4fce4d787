// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement generation for resolved KPI queries
//!
//! Compiles a list of resolved metrics plus a query context into one
//! executable aggregation statement per time point. The base relation is
//! either a union over the individually attached partition tables or a
//! single pre-materialized staging relation; above the fan-out threshold
//! the union is abandoned because attaching many small file-backed tables
//! costs more than loading them once.

use crate::exec::QueryContext;
use crate::metadata::{AggFunc, MetadataProvider, MetricDefinition, MetricKind};
use crate::resolver::{scan_references, shift_time_point};
use crate::storage::{METRIC_ID_COLUMN, TIME_POINT_COLUMN, VALUE_COLUMN};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Relation describing dimension members, joined in for historical or
/// target comparisons.
pub const DIMENSION_DESC_RELATION: &str = "dim_description";
/// Relation holding target values per metric, dimension and time point.
pub const TARGET_VALUE_RELATION: &str = "metric_target";

/// Generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Partition fan-out above which the staging strategy replaces the
    /// direct-attach union.
    pub staging_threshold: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            staging_threshold: 8,
        }
    }
}

/// How a statement's base rows are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Attach each partition file individually and union them.
    DirectAttach,
    /// Load every partition into one staging relation first.
    Staging,
}

/// Where the generated statement reads its base rows from.
#[derive(Debug, Clone, Copy)]
pub enum BaseSource<'a> {
    /// Union over the individually attached partition tables.
    Attached,
    /// A staging relation the executor has already materialized.
    Staging(&'a str),
}

/// A dimension filter restricting the base rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub column: String,
    pub values: Vec<String>,
}

/// Compiles resolved metrics into executable aggregation statements.
#[derive(Clone)]
pub struct QueryGenerator {
    config: GeneratorConfig,
    metadata: Arc<dyn MetadataProvider>,
}

impl QueryGenerator {
    pub fn new(config: GeneratorConfig, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self { config, metadata }
    }

    /// Pick the execution strategy from the context's partition fan-out.
    pub fn select_strategy(&self, ctx: &QueryContext) -> ExecutionStrategy {
        if ctx.table_count() > self.config.staging_threshold {
            ExecutionStrategy::Staging
        } else {
            ExecutionStrategy::DirectAttach
        }
    }

    /// Compile one statement for one time point. Empty when the context
    /// requires no tables; the caller treats that as "no data", never as
    /// an error.
    pub fn generate(
        &self,
        metrics: &[MetricDefinition],
        ctx: &QueryContext,
        dims: &[String],
        filters: &[DimensionFilter],
        source: BaseSource<'_>,
    ) -> String {
        if ctx.table_count() == 0 {
            return String::new();
        }

        let base = self.base_relation(ctx, dims, source);

        let mut select_cols: Vec<String> = Vec::new();
        let mut group_cols: Vec<String> = Vec::new();
        for dim in dims {
            select_cols.push(format!("base.{}", dim));
            group_cols.push(format!("base.{}", dim));
        }

        let join_descriptions =
            !dims.is_empty() && (ctx.include_historical() || ctx.include_target());
        let join_targets = !dims.is_empty() && ctx.include_target();

        let mut joins = String::new();
        if join_descriptions {
            let on = dims
                .iter()
                .map(|dim| format!("base.{} = dd.{}", dim, dim))
                .collect::<Vec<_>>()
                .join(" AND ");
            joins.push_str(&format!(" LEFT JOIN {} dd ON {}", DIMENSION_DESC_RELATION, on));
            for dim in dims {
                select_cols.push(format!("dd.{}_name", dim));
                group_cols.push(format!("dd.{}_name", dim));
            }
        }
        if join_targets {
            let mut on = dims
                .iter()
                .map(|dim| format!("base.{} = tg.{}", dim, dim))
                .collect::<Vec<_>>();
            on.push(format!("tg.{} = '{}'", TIME_POINT_COLUMN, escape(ctx.time_point())));
            joins.push_str(&format!(
                " LEFT JOIN {} tg ON {}",
                TARGET_VALUE_RELATION,
                on.join(" AND ")
            ));
            select_cols.push("MAX(tg.target_value) AS target_value".to_string());
        }

        for metric in metrics {
            select_cols.push(format!(
                "{} AS {}",
                self.transpile(metric, ctx.time_point()),
                metric.id
            ));
        }

        let where_clause = if filters.is_empty() {
            String::new()
        } else {
            let conditions = filters
                .iter()
                .map(|filter| {
                    let values = filter
                        .values
                        .iter()
                        .map(|v| format!("'{}'", escape(v)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("base.{} IN ({})", filter.column, values)
                })
                .collect::<Vec<_>>()
                .join(" AND ");
            format!(" WHERE {}", conditions)
        };

        let group_clause = if group_cols.is_empty() {
            String::new()
        } else {
            format!(" GROUP BY {}", group_cols.join(", "))
        };

        format!(
            "WITH base AS ({}) SELECT {} FROM base{}{}{}",
            base,
            select_cols.join(", "),
            joins,
            where_clause,
            group_clause
        )
    }

    /// Base relation: one SELECT per attached partition unioned together,
    /// or a single scan of the staging relation.
    fn base_relation(&self, ctx: &QueryContext, dims: &[String], source: BaseSource<'_>) -> String {
        let mut cols: Vec<&str> = dims.iter().map(String::as_str).collect();
        cols.push(METRIC_ID_COLUMN);
        cols.push(TIME_POINT_COLUMN);
        cols.push(VALUE_COLUMN);
        let col_list = cols.join(", ");

        match source {
            BaseSource::Staging(relation) => format!("SELECT {} FROM {}", col_list, relation),
            BaseSource::Attached => ctx
                .aliased_tables()
                .map(|(table, alias)| {
                    format!("SELECT {} FROM {}.{}", col_list, alias, table.table_name())
                })
                .collect::<Vec<_>>()
                .join(" UNION ALL "),
        }
    }

    /// Transpile a requested metric into its aggregate select expression.
    ///
    /// Every formula reference becomes a conditional aggregate over the
    /// base rows; a physical metric is a single conditional aggregate
    /// over itself.
    fn transpile(&self, metric: &MetricDefinition, time_point: &str) -> String {
        match &metric.kind {
            MetricKind::Physical => {
                conditional_aggregate(metric.agg_func, &metric.id, time_point)
            }
            MetricKind::Virtual { expression } | MetricKind::Composite { expression } => {
                let mut transpiled = expression.clone();
                for reference in scan_references(expression) {
                    let shifted = shift_time_point(time_point, reference.modifier);
                    // The resolver has already validated every reference;
                    // a miss here can only mean metadata changed mid-query.
                    let agg_func = match self.metadata.find_metric_by_id(&reference.metric_id) {
                        Ok(Some(definition)) => definition.agg_func,
                        _ => {
                            warn!(
                                "Reference {} vanished during generation, using {} aggregation",
                                reference.metric_id,
                                metric.agg_func.as_sql()
                            );
                            metric.agg_func
                        }
                    };
                    let aggregate =
                        conditional_aggregate(agg_func, &reference.metric_id, &shifted);
                    transpiled = replace_reference(&transpiled, &reference.metric_id, &aggregate);
                }
                transpiled
            }
        }
    }
}

fn conditional_aggregate(agg_func: AggFunc, metric_id: &str, time_point: &str) -> String {
    format!(
        "{}(CASE WHEN {} = '{}' AND {} = '{}' THEN {} ELSE NULL END)",
        agg_func.as_sql(),
        METRIC_ID_COLUMN,
        escape(metric_id),
        TIME_POINT_COLUMN,
        escape(time_point),
        VALUE_COLUMN
    )
}

/// Replace the first remaining `${metric_id[...]}` occurrence with the
/// replacement text. Scanning left to right once per reference keeps
/// repeated references to one metric independently replaceable.
fn replace_reference(expression: &str, metric_id: &str, replacement: &str) -> String {
    let needle = format!("${{{}", metric_id);
    if let Some(start) = expression.find(&needle) {
        if let Some(end) = expression[start..].find('}') {
            let mut out = String::with_capacity(expression.len() + replacement.len());
            out.push_str(&expression[..start]);
            out.push_str(replacement);
            out.push_str(&expression[start + end + 1..]);
            return out;
        }
    }
    expression.to_string()
}

fn escape(raw: &str) -> String {
    raw.replace('\'', "''")
}
