// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution against the embedded analytical engine
//!
//! Two paths: direct attach (one engine attachment per required
//! partition) and staging (all partitions pre-materialized into a single
//! relation). Strategy choice lives in the generator; this module only
//! carries each path out.

use crate::cache::PartitionFileCache;
use crate::exec::{ExecutionError, QueryContext, Row};
use crate::storage::AnalyticalEngine;
use log::{debug, warn};
use std::sync::Arc;
use uuid::Uuid;

/// Runs generated statements against the analytical engine, resolving
/// partition files through the partition cache.
pub struct QueryExecutor {
    engine: Arc<dyn AnalyticalEngine>,
    partitions: Arc<PartitionFileCache>,
}

impl QueryExecutor {
    pub fn new(engine: Arc<dyn AnalyticalEngine>, partitions: Arc<PartitionFileCache>) -> Self {
        Self { engine, partitions }
    }

    /// Direct-attach strategy: attach every required partition under its
    /// alias, run the statement, detach best-effort.
    ///
    /// An empty statement means the resolver required no tables; that is
    /// "no data", not an error.
    pub async fn execute(
        &self,
        ctx: &QueryContext,
        statement: &str,
    ) -> Result<Vec<Row>, ExecutionError> {
        if statement.is_empty() {
            debug!("Empty statement for {}, returning no rows", ctx.time_point());
            return Ok(Vec::new());
        }

        let mut attached: Vec<String> = Vec::new();
        let mut setup: Result<(), ExecutionError> = Ok(());
        for (table, alias) in ctx.aliased_tables() {
            let path = match self.partitions.get_or_download(table).await {
                Ok(path) => path,
                Err(e) => {
                    setup = Err(e.into());
                    break;
                }
            };
            match self.engine.attach(alias, &path).await {
                Ok(()) => attached.push(alias.to_string()),
                Err(e) => {
                    setup = Err(e.into());
                    break;
                }
            }
        }

        let result = match setup {
            Ok(()) => self.engine.query(statement).await.map_err(Into::into),
            Err(e) => Err(e),
        };

        for alias in attached {
            if let Err(e) = self.engine.detach(&alias).await {
                warn!("Failed to detach {}: {}", alias, e);
            }
        }

        result
    }

    /// Staging strategy: materialize all required partitions into one
    /// uniquely named staging relation, then build and run the final
    /// statement against it.
    pub async fn execute_with_staging<F>(
        &self,
        ctx: &QueryContext,
        build_statement: F,
    ) -> Result<Vec<Row>, ExecutionError>
    where
        F: FnOnce(&str) -> String,
    {
        let mut paths = Vec::with_capacity(ctx.table_count());
        for (table, _) in ctx.aliased_tables() {
            paths.push(self.partitions.get_or_download(table).await?);
        }
        if paths.is_empty() {
            debug!("No partitions to stage for {}", ctx.time_point());
            return Ok(Vec::new());
        }

        let staging = format!("staging_{}", Uuid::new_v4().simple());
        self.engine.load_staging(&staging, &paths).await?;

        let statement = build_statement(&staging);
        let result = if statement.is_empty() {
            Ok(Vec::new())
        } else {
            self.engine.query(&statement).await.map_err(Into::into)
        };

        if let Err(e) = self.engine.drop_staging(&staging).await {
            warn!("Failed to drop staging relation {}: {}", staging, e);
        }

        result
    }
}
