// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! MetricLite - A lightweight KPI query and cache engine
//!
//! MetricLite answers time-series KPI queries by resolving derived-metric
//! formulas into the physical data partitions they require, generating an
//! aggregation statement over those partitions, and caching results across
//! three tiers with cluster-wide precise invalidation.
//!
//! # Features
//!
//! - **Dependency Resolution**: Formula references with time-shift
//!   modifiers expand recursively, with cycle and depth protection
//! - **Two Execution Strategies**: Direct partition attachment, or a
//!   staging relation when the partition fan-out grows too large
//! - **Three-Tier Caching**: Process-local LRU, cluster-shared store, and
//!   local partition files, all independently toggleable
//! - **Precise Invalidation**: Cluster-wide eviction of exact
//!   (metric, time point) coordinates, never whole models
//!
//! # Usage
//!
//! Construct a [`QueryCoordinator`] from your collaborators (metadata
//! provider, analytical engine, key-value store, object store, pub/sub
//! channel) and feed it [`QueryRequest`]s:
//!
//! ```ignore
//! let cache = Arc::new(CacheHierarchy::new(CacheConfig::default(), kv, objects)?);
//! let bus = InvalidationBus::new(pubsub);
//! let coordinator = QueryCoordinator::new(metadata, engine, cache, bus, GeneratorConfig::default());
//! coordinator.start_invalidation_listener().await?;
//! let response = coordinator.process_query(&request).await;
//! ```

pub mod cache;
pub mod coordinator;
pub mod exec;
pub mod metadata;
pub mod plan;
pub mod resolver;
pub mod storage;

// Re-export the primary API surface.
pub use coordinator::{QueryCoordinator, QueryError, QueryRequest, QueryResponse};
pub use exec::{QueryResult, QueryStatus, Row, Value};

/// MetricLite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MetricLite crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
