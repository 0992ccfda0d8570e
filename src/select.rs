//! Target selection
//!
//! Filters coverage records down to source files worth generating tests for
//! and ranks them worst-first. An empty result is the driver's signal that
//! every eligible file already meets the threshold.

use crate::lcov::CoverageRecord;
use std::collections::BTreeMap;

/// Boilerplate files that never get generated specs.
const SKIP_SUFFIXES: [&str; 2] = ["/main.ts", "/test.ts"];

fn is_eligible(record: &CoverageRecord, min_pct: f64) -> bool {
    let path = record.path.as_str();
    if !path.starts_with("src/") {
        return false;
    }
    if path.ends_with(".spec.ts") {
        return false;
    }
    if SKIP_SUFFIXES.iter().any(|s| path.ends_with(s)) {
        return false;
    }
    record.line_pct() < min_pct || record.branch_pct() < min_pct
}

/// Return under-covered source files, worst line coverage first, branch
/// coverage as tie-break. Ties beyond that keep the map's path order.
pub fn select<'a>(
    records: &'a BTreeMap<String, CoverageRecord>,
    min_pct: f64,
) -> Vec<&'a CoverageRecord> {
    let mut out: Vec<&CoverageRecord> = records
        .values()
        .filter(|r| is_eligible(r, min_pct))
        .collect();

    out.sort_by(|a, b| {
        (a.line_pct(), a.branch_pct())
            .partial_cmp(&(b.line_pct(), b.branch_pct()))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}
