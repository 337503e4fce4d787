// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Canonical, order-independent cache identity for a query

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a cached entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Aggregated query result rows.
    QueryResult,
    /// A local partition file path.
    FilePath,
}

impl EntryKind {
    fn tag(&self) -> &'static str {
        match self {
            EntryKind::QueryResult => "result",
            EntryKind::FilePath => "file",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "result" => Some(EntryKind::QueryResult),
            "file" => Some(EntryKind::FilePath),
            _ => None,
        }
    }
}

/// Canonical identity of a query. Metric ids, time points and dimension
/// codes are sorted and de-duplicated on construction, so equal logical
/// inputs in any order produce byte-identical canonical keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheFingerprint {
    metric_ids: Vec<String>,
    time_points: Vec<String>,
    dim_codes: Vec<String>,
    include_historical: bool,
    entry_kind: EntryKind,
}

impl CacheFingerprint {
    pub fn new(
        metric_ids: &[String],
        time_points: &[String],
        dim_codes: &[String],
        include_historical: bool,
        entry_kind: EntryKind,
    ) -> Self {
        Self {
            metric_ids: sorted_dedup(metric_ids),
            time_points: sorted_dedup(time_points),
            dim_codes: sorted_dedup(dim_codes),
            include_historical,
            entry_kind,
        }
    }

    /// Canonical string form, used verbatim as the L1/L2 cache key.
    pub fn canonical(&self) -> String {
        format!(
            "kpi:{}:m={}:t={}:d={}:h={}",
            self.entry_kind.tag(),
            self.metric_ids.join(","),
            self.time_points.join(","),
            self.dim_codes.join(","),
            u8::from(self.include_historical)
        )
    }

    /// Parse a canonical key back into a fingerprint. Returns `None` for
    /// keys this process did not produce.
    pub fn parse(key: &str) -> Option<Self> {
        let mut parts = key.split(':');
        if parts.next()? != "kpi" {
            return None;
        }
        let entry_kind = EntryKind::from_tag(parts.next()?)?;
        let metric_ids = split_list(parts.next()?.strip_prefix("m=")?);
        let time_points = split_list(parts.next()?.strip_prefix("t=")?);
        let dim_codes = split_list(parts.next()?.strip_prefix("d=")?);
        let include_historical = match parts.next()?.strip_prefix("h=")? {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            metric_ids,
            time_points,
            dim_codes,
            include_historical,
            entry_kind,
        })
    }

    /// True when the fingerprint references both the metric id and the
    /// time point; the exact coordinate invalidation targets.
    pub fn mentions(&self, metric_id: &str, time_point: &str) -> bool {
        self.metric_ids.iter().any(|m| m == metric_id)
            && self.time_points.iter().any(|t| t == time_point)
    }

    /// Shared-store scan pattern over-selecting entries that may mention
    /// the metric; candidates are confirmed with [`Self::mentions`].
    pub fn metric_scan_pattern(metric_id: &str) -> String {
        format!("kpi:*m=*{}*", metric_id)
    }

    pub fn metric_ids(&self) -> &[String] {
        &self.metric_ids
    }

    pub fn time_points(&self) -> &[String] {
        &self.time_points
    }
}

impl fmt::Display for CacheFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

fn sorted_dedup(items: &[String]) -> Vec<String> {
    let mut sorted = items.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn canonical_is_order_independent() {
        let a = CacheFingerprint::new(
            &strings(&["KD2", "KD1"]),
            &strings(&["20251202", "20251201"]),
            &strings(&["county", "city"]),
            true,
            EntryKind::QueryResult,
        );
        let b = CacheFingerprint::new(
            &strings(&["KD1", "KD2"]),
            &strings(&["20251201", "20251202"]),
            &strings(&["city", "county"]),
            true,
            EntryKind::QueryResult,
        );
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn canonical_round_trips_through_parse() {
        let fingerprint = CacheFingerprint::new(
            &strings(&["KD1001"]),
            &strings(&["20251201"]),
            &[],
            false,
            EntryKind::QueryResult,
        );
        let parsed = CacheFingerprint::parse(&fingerprint.canonical()).expect("parseable");
        assert_eq!(parsed, fingerprint);
    }

    #[test]
    fn mentions_requires_exact_membership() {
        let fingerprint = CacheFingerprint::new(
            &strings(&["KD1001"]),
            &strings(&["20251201", "20251202"]),
            &[],
            false,
            EntryKind::QueryResult,
        );
        assert!(fingerprint.mentions("KD1001", "20251201"));
        assert!(fingerprint.mentions("KD1001", "20251202"));
        // A prefix of a metric id is not a mention.
        assert!(!fingerprint.mentions("KD1", "20251201"));
        assert!(!fingerprint.mentions("KD1001", "20251203"));
    }

    #[test]
    fn foreign_keys_do_not_parse() {
        assert!(CacheFingerprint::parse("not-a-fingerprint").is_none());
        assert!(CacheFingerprint::parse("kpi:result:m=A:t=B").is_none());
    }
}
