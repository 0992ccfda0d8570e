//! Machine-readable run summary
//!
//! Written once at the end of a run when `--summary-json` is given, so CI
//! jobs can inspect what the tool did without scraping stdout.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub min_pct: f64,
    pub model: String,
    pub iterations: Vec<IterationOutcome>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IterationOutcome {
    pub iteration: u32,
    pub target: String,
    pub line_pct: f64,
    pub branch_pct: f64,
    pub result: IterationResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IterationResult {
    /// Spec updated and the fast run passed.
    Updated { attempts: u32 },
    /// Source file listed in the report but missing on disk.
    SkippedMissingSource,
    /// Attempt budget consumed without a dynamic pass.
    Exhausted { last_error: String },
}

impl RunSummary {
    pub fn new(min_pct: f64, model: &str) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            min_pct,
            model: model.to_string(),
            iterations: Vec::new(),
            exit_code: None,
        }
    }

    pub fn record(&mut self, outcome: IterationOutcome) {
        self.iterations.push(outcome);
    }

    pub fn finish(&mut self, exit_code: i32) {
        self.finished_at = Some(Utc::now());
        self.exit_code = Some(exit_code);
    }

    /// Best-effort write; a failed summary must not change the exit code.
    pub fn write(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(err) = fs::write(path, json) {
                    eprintln!("Warning: could not write summary {}: {}", path.display(), err);
                }
            }
            Err(err) => eprintln!("Warning: could not serialize summary: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_outcomes() {
        let mut summary = RunSummary::new(90.0, "test-model");
        summary.record(IterationOutcome {
            iteration: 1,
            target: "src/app/foo.ts".to_string(),
            line_pct: 40.0,
            branch_pct: 50.0,
            result: IterationResult::Updated { attempts: 2 },
        });
        summary.finish(0);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"kind\":\"updated\""));
        assert!(json.contains("\"attempts\":2"));
        assert!(json.contains("\"exit_code\":0"));
    }
}
