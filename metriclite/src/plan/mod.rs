// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement generation and execution strategy selection

pub mod generator;

pub use generator::{
    BaseSource, DimensionFilter, ExecutionStrategy, GeneratorConfig, QueryGenerator,
    DIMENSION_DESC_RELATION, TARGET_VALUE_RELATION,
};
