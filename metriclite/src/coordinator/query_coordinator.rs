// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query Coordinator - orchestration for KPI query execution
//!
//! This is the main entry point. It handles:
//! - Cache consultation keyed by the canonical query fingerprint
//! - Metric definition loading
//! - Per-time-point resolution, generation and execution
//! - Result concatenation and cache population
//! - Completion notifications and cluster-wide invalidation

use crate::cache::{CacheFingerprint, CacheHierarchy, EntryKind, InvalidationBus};
use crate::exec::{
    ExecutionError, QueryContext, QueryExecutor, QueryResult, QueryStatus, Row, Value,
};
use crate::metadata::{MetadataError, MetadataProvider, MetricDefinition};
use crate::plan::{BaseSource, DimensionFilter, ExecutionStrategy, GeneratorConfig, QueryGenerator};
use crate::resolver::{MetricDependencyResolver, ResolveError};
use crate::storage::{AnalyticalEngine, PubSubError, TIME_POINT_COLUMN};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// A KPI query request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub metric_ids: Vec<String>,
    pub time_points: Vec<String>,
    #[serde(default)]
    pub dim_codes: Vec<String>,
    #[serde(default)]
    pub filters: Vec<DimensionFilter>,
    #[serde(default)]
    pub include_historical: bool,
    #[serde(default)]
    pub include_target: bool,
}

/// A KPI query response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status: QueryStatus,
    pub message: String,
    pub result: QueryResult,
}

impl QueryResponse {
    fn success(result: QueryResult) -> Self {
        Self {
            status: QueryStatus::Success,
            message: "ok".to_string(),
            result,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            status: QueryStatus::Failed,
            message,
            result: QueryResult::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

/// Failures that abort a query. Resolver and generator errors indicate
/// malformed metric definitions and fail the whole query; execution
/// failures are scoped to one time point but still surface here as the
/// first failure once all time points have finished.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Internal task failure: {0}")]
    Internal(String),
}

/// Query Coordinator - executes KPI queries against injected collaborators.
pub struct QueryCoordinator {
    metadata: Arc<dyn MetadataProvider>,
    generator: QueryGenerator,
    executor: Arc<QueryExecutor>,
    cache: Arc<CacheHierarchy>,
    bus: InvalidationBus,
}

impl QueryCoordinator {
    pub fn new(
        metadata: Arc<dyn MetadataProvider>,
        engine: Arc<dyn AnalyticalEngine>,
        cache: Arc<CacheHierarchy>,
        bus: InvalidationBus,
        generator_config: GeneratorConfig,
    ) -> Self {
        let executor = Arc::new(QueryExecutor::new(engine, cache.partitions()));
        let generator = QueryGenerator::new(generator_config, metadata.clone());
        Self {
            metadata,
            generator,
            executor,
            cache,
            bus,
        }
    }

    /// Subscribe this node to cluster-wide invalidation events.
    pub async fn start_invalidation_listener(&self) -> Result<JoinHandle<()>, PubSubError> {
        self.bus.start(self.cache.clone()).await
    }

    /// Execute a KPI query.
    ///
    /// Failures come back as a `Failed` response with a message; cache
    /// and invalidation trouble stays invisible to the caller.
    pub async fn process_query(&self, request: &QueryRequest) -> QueryResponse {
        let started = Instant::now();
        let fingerprint = CacheFingerprint::new(
            &request.metric_ids,
            &request.time_points,
            &request.dim_codes,
            request.include_historical,
            EntryKind::QueryResult,
        );

        if let Some(rows) = self.cache.get(&fingerprint).await {
            debug!("Query served from cache: {}", fingerprint);
            return QueryResponse::success(QueryResult {
                rows,
                columns: self.result_columns(request),
                execution_time_ms: started.elapsed().as_millis() as u64,
                warnings: Vec::new(),
            });
        }

        match self.compute(request).await {
            Ok(rows) => {
                self.cache.put(&fingerprint, rows.clone());
                QueryResponse::success(QueryResult {
                    rows,
                    columns: self.result_columns(request),
                    execution_time_ms: started.elapsed().as_millis() as u64,
                    warnings: Vec::new(),
                })
            }
            Err(e) => {
                warn!("Query failed: {}", e);
                QueryResponse::failed(e.to_string())
            }
        }
    }

    /// Handle a source-data completion notification: partitions produced
    /// from `source_table` for `batch_time_point` changed. Evicts the
    /// local tiers and broadcasts the same eviction cluster-wide.
    /// Returns the number of affected metrics.
    pub async fn handle_completion_notification(
        &self,
        source_table: &str,
        batch_time_point: &str,
    ) -> Result<usize, QueryError> {
        let Some(binding) = self.metadata.find_source(source_table)? else {
            warn!("No metrics registered for source table {}", source_table);
            return Ok(0);
        };
        for metric_id in &binding.metric_ids {
            self.cache.invalidate(metric_id, batch_time_point).await;
        }
        if let Err(e) = self
            .bus
            .publish(
                &binding.model_id,
                binding.metric_ids.clone(),
                vec![batch_time_point.to_string()],
            )
            .await
        {
            // Best-effort: remote nodes fall back to their TTLs.
            warn!(
                "Could not broadcast invalidation for {}: {}",
                source_table, e
            );
        }
        Ok(binding.metric_ids.len())
    }

    async fn compute(&self, request: &QueryRequest) -> Result<Vec<Row>, QueryError> {
        // Load each requested metric definition once.
        let mut metrics = Vec::with_capacity(request.metric_ids.len());
        for id in &request.metric_ids {
            let definition = self
                .metadata
                .find_metric_by_id(id)?
                .ok_or_else(|| QueryError::UnknownMetric(id.clone()))?;
            metrics.push(definition);
        }

        // Per-time-point processing is independent; run concurrently and
        // join in request order so the concatenation is deterministic.
        let mut handles = Vec::with_capacity(request.time_points.len());
        for time_point in &request.time_points {
            let metadata = self.metadata.clone();
            let generator = self.generator.clone();
            let executor = self.executor.clone();
            let metrics = metrics.clone();
            let time_point = time_point.clone();
            let dims = request.dim_codes.clone();
            let filters = request.filters.clone();
            let include_historical = request.include_historical;
            let include_target = request.include_target;
            handles.push(tokio::spawn(async move {
                process_time_point(
                    metadata,
                    generator,
                    executor,
                    metrics,
                    time_point,
                    dims,
                    filters,
                    include_historical,
                    include_target,
                )
                .await
            }));
        }

        let mut rows = Vec::new();
        let mut first_failure: Option<QueryError> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(mut time_point_rows)) => rows.append(&mut time_point_rows),
                Ok(Err(e)) => {
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
                Err(e) => {
                    if first_failure.is_none() {
                        first_failure = Some(QueryError::Internal(e.to_string()));
                    }
                }
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(rows),
        }
    }

    fn result_columns(&self, request: &QueryRequest) -> Vec<String> {
        let mut columns = request.dim_codes.clone();
        columns.extend(request.metric_ids.iter().cloned());
        columns.push(TIME_POINT_COLUMN.to_string());
        columns
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_time_point(
    metadata: Arc<dyn MetadataProvider>,
    generator: QueryGenerator,
    executor: Arc<QueryExecutor>,
    metrics: Vec<MetricDefinition>,
    time_point: String,
    dims: Vec<String>,
    filters: Vec<DimensionFilter>,
    include_historical: bool,
    include_target: bool,
) -> Result<Vec<Row>, QueryError> {
    let mut ctx = QueryContext::new(&time_point, include_historical, include_target, &dims);
    let resolver = MetricDependencyResolver::new(metadata.as_ref());
    for metric in &metrics {
        resolver.resolve(metric, &time_point, &mut ctx)?;
    }
    debug!(
        "Resolved {} partitions for {} metrics at {}",
        ctx.table_count(),
        metrics.len(),
        time_point
    );

    let rows = match generator.select_strategy(&ctx) {
        ExecutionStrategy::DirectAttach => {
            let statement =
                generator.generate(&metrics, &ctx, &dims, &filters, BaseSource::Attached);
            executor.execute(&ctx, &statement).await?
        }
        ExecutionStrategy::Staging => {
            executor
                .execute_with_staging(&ctx, |staging| {
                    generator.generate(&metrics, &ctx, &dims, &filters, BaseSource::Staging(staging))
                })
                .await?
        }
    };

    // Back-fill the time point so concatenated rows stay attributable.
    Ok(rows
        .into_iter()
        .map(|mut row| {
            row.set(TIME_POINT_COLUMN, Value::String(time_point.clone()));
            row
        })
        .collect())
}
