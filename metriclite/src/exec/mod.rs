// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution: context, executor, and result types

pub mod context;
pub mod error;
pub mod executor;
pub mod result;

pub use context::QueryContext;
pub use error::ExecutionError;
pub use executor::QueryExecutor;
pub use result::{QueryResult, QueryStatus, Row, Value};
