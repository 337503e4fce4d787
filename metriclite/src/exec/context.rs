// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-time-point execution context

use crate::storage::PhysicalTableRef;
use std::collections::{HashMap, HashSet};

/// Accumulates, for one (query, time point) pair, the physical tables the
/// statement needs, their attach aliases, the active dimension codes, and
/// the query flags. Built at the start of per-time-point processing and
/// discarded after statement generation.
///
/// The dependency resolver is the only component that registers tables.
#[derive(Debug, Clone)]
pub struct QueryContext {
    time_point: String,
    include_historical: bool,
    include_target: bool,
    dim_codes: Vec<String>,
    /// Registration order; aliases are assigned on first registration.
    required_tables: Vec<PhysicalTableRef>,
    alias_map: HashMap<PhysicalTableRef, String>,
}

impl QueryContext {
    pub fn new(
        time_point: impl Into<String>,
        include_historical: bool,
        include_target: bool,
        dim_codes: &[String],
    ) -> Self {
        // Ordered, de-duplicated dimension codes.
        let mut seen = HashSet::new();
        let dim_codes = dim_codes
            .iter()
            .filter(|code| seen.insert(code.as_str()))
            .cloned()
            .collect();
        Self {
            time_point: time_point.into(),
            include_historical,
            include_target,
            dim_codes,
            required_tables: Vec::new(),
            alias_map: HashMap::new(),
        }
    }

    pub fn time_point(&self) -> &str {
        &self.time_point
    }

    pub fn include_historical(&self) -> bool {
        self.include_historical
    }

    pub fn include_target(&self) -> bool {
        self.include_target
    }

    pub fn dim_codes(&self) -> &[String] {
        &self.dim_codes
    }

    /// Register a required table; repeated registrations are no-ops.
    pub fn register_table(&mut self, table: PhysicalTableRef) {
        if !self.alias_map.contains_key(&table) {
            self.alias_map.insert(table.clone(), table.alias());
            self.required_tables.push(table);
        }
    }

    pub fn required_tables(&self) -> &[PhysicalTableRef] {
        &self.required_tables
    }

    /// Required tables paired with their aliases, in registration order.
    pub fn aliased_tables(&self) -> impl Iterator<Item = (&PhysicalTableRef, &str)> {
        self.required_tables
            .iter()
            .filter_map(|table| self.alias_map.get(table).map(|alias| (table, alias.as_str())))
    }

    pub fn table_count(&self) -> usize {
        self.required_tables.len()
    }
}
