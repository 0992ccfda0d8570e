//! Coverage report reader
//!
//! Minimal lcov parser covering the fields Angular's karma-coverage emits:
//! `SF:` (source file), `LH:`/`LF:` (lines hit/found), `BRH:`/`BRF:`
//! (branches hit/found), records terminated by `end_of_record`. Everything
//! else in the report is ignored.

use crate::error::CovgenError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Per-file tally of executed vs. total lines and branches from one test run.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRecord {
    pub path: String,
    pub lines_hit: u64,
    pub lines_found: u64,
    pub branches_hit: u64,
    pub branches_found: u64,
}

impl CoverageRecord {
    /// Percentage of lines executed; a file with no instrumentable lines
    /// counts as fully covered.
    pub fn line_pct(&self) -> f64 {
        if self.lines_found == 0 {
            100.0
        } else {
            self.lines_hit as f64 / self.lines_found as f64 * 100.0
        }
    }

    pub fn branch_pct(&self) -> f64 {
        if self.branches_found == 0 {
            100.0
        } else {
            self.branches_hit as f64 / self.branches_found as f64 * 100.0
        }
    }
}

/// Locate the lcov report under `<root>/coverage`.
///
/// Angular writes it to coverage/<projectName>/lcov.info; some setups drop it
/// at coverage/lcov.info directly. When several exist, the deepest-nested one
/// wins.
pub fn find_report(repo_root: &Path) -> Result<PathBuf, CovgenError> {
    let coverage_dir = repo_root.join("coverage");
    let mut matches: Vec<PathBuf> = WalkDir::new(&coverage_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name() == "lcov.info")
        .map(|entry| entry.into_path())
        .collect();

    if matches.is_empty() {
        return Err(CovgenError::ReportNotFound);
    }

    matches.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
    Ok(matches.remove(0))
}

/// Parse report text into a path-keyed map of records.
///
/// A record is committed only at its `end_of_record` marker, and only if the
/// source file and both line metrics were present. Missing branch metrics
/// default to zero. A later record for the same path overwrites the earlier
/// one. Unterminated trailing records are dropped.
pub fn parse(text: &str) -> BTreeMap<String, CoverageRecord> {
    let mut records = BTreeMap::new();

    let mut sf: Option<String> = None;
    let mut lh: Option<u64> = None;
    let mut lf: Option<u64> = None;
    let mut brh: Option<u64> = None;
    let mut brf: Option<u64> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if let Some(rest) = line.strip_prefix("SF:") {
            sf = Some(rest.trim().to_string());
            lh = None;
            lf = None;
            brh = None;
            brf = None;
        } else if let Some(rest) = line.strip_prefix("LH:") {
            lh = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("LF:") {
            lf = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("BRH:") {
            brh = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("BRF:") {
            brf = rest.trim().parse().ok();
        } else if line == "end_of_record" {
            if let (Some(path), Some(lines_hit), Some(lines_found)) = (sf.take(), lh, lf) {
                records.insert(
                    path.clone(),
                    CoverageRecord {
                        path,
                        lines_hit,
                        lines_found,
                        branches_hit: brh.unwrap_or(0),
                        branches_found: brf.unwrap_or(0),
                    },
                );
            }
            sf = None;
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn record(path: &str) -> String {
        format!("SF:{}\nLH:4\nLF:10\nBRH:1\nBRF:2\nend_of_record\n", path)
    }

    #[test]
    fn test_parse_complete_records() {
        let text = format!("{}{}", record("src/a.ts"), record("src/b.ts"));
        let records = parse(&text);
        assert_eq!(records.len(), 2);
        let a = &records["src/a.ts"];
        assert_eq!(a.lines_hit, 4);
        assert_eq!(a.lines_found, 10);
        assert!((a.line_pct() - 40.0).abs() < f64::EPSILON);
        assert!((a.branch_pct() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_missing_branches_default_to_zero() {
        let records = parse("SF:src/a.ts\nLH:5\nLF:5\nend_of_record\n");
        let a = &records["src/a.ts"];
        assert_eq!(a.branches_hit, 0);
        assert_eq!(a.branches_found, 0);
        // Zero branches found means the file cannot fail the branch threshold.
        assert_eq!(a.branch_pct(), 100.0);
    }

    #[test]
    fn test_parse_zero_lines_found_is_fully_covered() {
        let records = parse("SF:src/empty.ts\nLH:0\nLF:0\nend_of_record\n");
        assert_eq!(records["src/empty.ts"].line_pct(), 100.0);
    }

    #[test]
    fn test_parse_drops_record_without_line_metrics() {
        let records = parse("SF:src/a.ts\nBRH:1\nBRF:2\nend_of_record\n");
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_drops_unterminated_trailing_record() {
        let text = format!("{}SF:src/b.ts\nLH:1\nLF:2\n", record("src/a.ts"));
        let records = parse(&text);
        assert_eq!(records.len(), 1);
        assert!(records.contains_key("src/a.ts"));
    }

    #[test]
    fn test_parse_last_writer_wins_per_path() {
        let text = "SF:src/a.ts\nLH:1\nLF:10\nend_of_record\n\
                    SF:src/a.ts\nLH:9\nLF:10\nend_of_record\n";
        let records = parse(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records["src/a.ts"].lines_hit, 9);
    }

    #[test]
    fn test_parse_ignores_unrecognized_lines() {
        let text = "TN:\nSF:src/a.ts\nFN:3,foo\nDA:1,1\nLH:2\nLF:4\nend_of_record\n";
        let records = parse(text);
        assert_eq!(records["src/a.ts"].lines_found, 4);
    }

    fn temp_root(tag: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("covgen_{}_{}", tag, nanos));
        fs::create_dir_all(&root).unwrap();
        root
    }

    #[test]
    fn test_find_report_prefers_deepest_match() {
        let root = temp_root("lcov_depth");
        fs::create_dir_all(root.join("coverage/my-app")).unwrap();
        fs::write(root.join("coverage/lcov.info"), "").unwrap();
        fs::write(root.join("coverage/my-app/lcov.info"), "").unwrap();

        let found = find_report(&root).unwrap();
        assert!(found.ends_with("coverage/my-app/lcov.info"));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_find_report_missing_is_not_found() {
        let root = temp_root("lcov_missing");
        assert!(matches!(
            find_report(&root),
            Err(CovgenError::ReportNotFound)
        ));
        let _ = fs::remove_dir_all(&root);
    }
}
