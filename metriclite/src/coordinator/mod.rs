// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query coordination - the public entry point

pub mod query_coordinator;

pub use query_coordinator::{QueryCoordinator, QueryError, QueryRequest, QueryResponse};
