// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Calendar arithmetic for time-shift modifiers

use chrono::{Datelike, NaiveDate};
use log::warn;

/// Time-shift modifier on a metric reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeModifier {
    /// The base time point, unshifted.
    Current,
    /// Same calendar day one year earlier.
    LastYear,
    /// One calendar month earlier (one reporting cycle back).
    LastCycle,
}

impl TimeModifier {
    /// Parse a modifier token. Unknown tokens warn and behave as
    /// `current` rather than failing; a mistyped modifier then queries
    /// the base period, visible only in the log.
    pub fn parse(token: &str) -> Self {
        match token {
            "current" => TimeModifier::Current,
            "lastYear" => TimeModifier::LastYear,
            "lastCycle" | "lastMonth" => TimeModifier::LastCycle,
            other => {
                warn!("Unknown time modifier '{}', treating as current", other);
                TimeModifier::Current
            }
        }
    }
}

/// Shift an 8-digit time point (`YYYYMMDD`) by the modifier. Time points
/// that are not 8-digit dates pass through unchanged with a warning.
pub fn shift_time_point(time_point: &str, modifier: TimeModifier) -> String {
    if modifier == TimeModifier::Current {
        return time_point.to_string();
    }
    let date = match NaiveDate::parse_from_str(time_point, "%Y%m%d") {
        Ok(date) => date,
        Err(_) => {
            warn!(
                "Time point '{}' is not an 8-digit date, cannot shift",
                time_point
            );
            return time_point.to_string();
        }
    };
    let (year, month) = match modifier {
        TimeModifier::Current => (date.year(), date.month()),
        TimeModifier::LastYear => (date.year() - 1, date.month()),
        TimeModifier::LastCycle => {
            if date.month() == 1 {
                (date.year() - 1, 12)
            } else {
                (date.year(), date.month() - 1)
            }
        }
    };
    // Clamp to the target month's length (Feb 29 -> Feb 28, Mar 31 -> Feb 28/29).
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or(date)
        .format("%Y%m%d")
        .to_string()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
