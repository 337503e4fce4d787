// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Metric dependency resolution and time-shift arithmetic

pub mod dependency_resolver;
pub mod time_shift;

pub use dependency_resolver::{
    scan_references, MetricDependencyResolver, MetricReference, ResolveError, DEFAULT_DIM_CODE,
    MAX_RESOLVE_DEPTH,
};
pub use time_shift::{shift_time_point, TimeModifier};
