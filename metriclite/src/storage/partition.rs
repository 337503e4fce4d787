// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Physical partition identity and storage-path derivation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column carrying the metric identifier in every partition table.
pub const METRIC_ID_COLUMN: &str = "metric_id";
/// Column carrying the time point in every partition table.
pub const TIME_POINT_COLUMN: &str = "time_point";
/// Column carrying the metric value in every partition table.
pub const VALUE_COLUMN: &str = "value";

/// Identifies one physical data partition: one metric's values for one
/// time point, organized by one dimension-combination code.
///
/// The triple uniquely determines both the table name inside the partition
/// file and the object-store key the file lives under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalTableRef {
    pub metric_id: String,
    pub time_point: String,
    pub dim_code: String,
}

impl PhysicalTableRef {
    pub fn new(
        metric_id: impl Into<String>,
        time_point: impl Into<String>,
        dim_code: impl Into<String>,
    ) -> Self {
        Self {
            metric_id: metric_id.into(),
            time_point: time_point.into(),
            dim_code: dim_code.into(),
        }
    }

    /// Table name of the partition inside its attached file.
    pub fn table_name(&self) -> String {
        format!("{}_{}_{}", self.metric_id, self.time_point, self.dim_code)
    }

    /// Object-store key (and relative local cache path) of the partition.
    pub fn storage_key(&self) -> String {
        format!(
            "{}/{}/{}",
            time_point_prefix(&self.time_point),
            self.dim_code,
            self.table_name()
        )
    }

    /// Deterministic attach alias, stable across processes and restarts.
    ///
    /// Partitions live in independently attachable files, so every node
    /// must derive the same alias for the same partition.
    pub fn alias(&self) -> String {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(self.metric_id.as_bytes());
        hasher.update(self.time_point.as_bytes());
        hasher.update(self.dim_code.as_bytes());
        format!("t_{:08x}", hasher.finalize())
    }
}

impl fmt::Display for PhysicalTableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}/{}",
            self.metric_id, self.time_point, self.dim_code
        )
    }
}

/// Directory prefix a time point's partitions are grouped under.
///
/// Eight-digit dates nest under year and year-month so a calendar range
/// maps to a directory subtree; other period identifiers use a flat layout.
pub fn time_point_prefix(time_point: &str) -> String {
    if is_eight_digit_date(time_point) {
        format!(
            "{}/{}/{}",
            &time_point[..4],
            &time_point[..6],
            time_point
        )
    } else {
        time_point.to_string()
    }
}

fn is_eight_digit_date(s: &str) -> bool {
    s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_nests_eight_digit_dates() {
        let table = PhysicalTableRef::new("KD1001", "20251201", "C01");
        assert_eq!(
            table.storage_key(),
            "2025/202512/20251201/C01/KD1001_20251201_C01"
        );
    }

    #[test]
    fn storage_key_flat_for_other_periods() {
        let table = PhysicalTableRef::new("KD1001", "2025Q4", "C01");
        assert_eq!(table.storage_key(), "2025Q4/C01/KD1001_2025Q4_C01");
    }

    #[test]
    fn alias_is_deterministic_and_distinct() {
        let a = PhysicalTableRef::new("KD1001", "20251201", "C01");
        let b = PhysicalTableRef::new("KD1001", "20251202", "C01");
        assert_eq!(a.alias(), PhysicalTableRef::new("KD1001", "20251201", "C01").alias());
        assert_ne!(a.alias(), b.alias());
        assert!(a.alias().starts_with("t_"));
    }
}
