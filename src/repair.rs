//! Repair loop controller
//!
//! Turns the free-form generator into a bounded producer of compiling spec
//! files: Generate -> StaticCheck -> Write -> DynamicCheck, with failure text
//! from any stage fed into the next round's prompt, and strict
//! write-or-revert on the spec file. The file on disk is always either the
//! last known-good content or a candidate currently mid-validation, never a
//! rejected leftover.

use crate::analyze::SourceInfo;
use crate::backend::Generator;
use crate::config::Config;
use crate::error::CovgenError;
use crate::lcov::CoverageRecord;
use crate::prompt::{self, PromptContext};
use crate::runner::TestSuite;
use crate::validate::{validate_and_repair, Outcome};
use std::fs;
use std::path::Path;

/// State of one generation-validation round.
#[derive(Debug, Clone)]
pub struct RepairAttempt {
    /// 1-based round number.
    pub round: u32,
    /// Failure text from the previous round; None on the first.
    pub feedback: Option<String>,
}

impl RepairAttempt {
    fn first() -> Self {
        Self {
            round: 1,
            feedback: None,
        }
    }

    fn next(self, feedback: String) -> Self {
        Self {
            round: self.round + 1,
            feedback: Some(feedback),
        }
    }
}

/// Spec path for a source file: `foo.component.ts` -> `foo.component.spec.ts`.
pub fn spec_path_for(source_path: &str) -> String {
    match source_path.strip_suffix(".ts") {
        Some(stem) => format!("{}.spec.ts", stem),
        None => format!("{}.spec.ts", source_path),
    }
}

/// Run the bounded generate/validate/write/check loop for one target.
///
/// Returns the number of attempts used on success. On `AttemptsExhausted`
/// the spec file on disk is guaranteed to match its pre-loop state.
pub fn repair_loop(
    config: &Config,
    backend: &dyn Generator,
    suite: &dyn TestSuite,
    target: &CoverageRecord,
) -> Result<u32, CovgenError> {
    let source_abs = config.repo_root.join(&target.path);
    let spec_rel = spec_path_for(&target.path);
    let spec_abs = config.repo_root.join(&spec_rel);

    let source_text = fs::read_to_string(&source_abs)?;
    let info = SourceInfo::from_source(&source_text);

    // Rollback value: the spec as it was before any attempt, or absent.
    let original_spec = fs::read_to_string(&spec_abs).ok();
    let spec_text = original_spec.clone().unwrap_or_default();

    let mut attempt = RepairAttempt::first();
    while attempt.round <= config.max_attempts {
        println!(
            "  Attempt {}/{}{}",
            attempt.round,
            config.max_attempts,
            if attempt.feedback.is_some() {
                " (with repair feedback)"
            } else {
                ""
            }
        );

        let prompt = prompt::build(&PromptContext {
            source_path: &target.path,
            spec_path: &spec_rel,
            source_text: &source_text,
            spec_text: &spec_text,
            min_pct: config.min_pct,
            line_pct: target.line_pct(),
            branch_pct: target.branch_pct(),
            info: &info,
            feedback: attempt.feedback.as_deref(),
        });

        let raw = match backend.generate(&config.model, &prompt) {
            Ok(raw) => raw,
            Err(err) => {
                let reason = err.to_string();
                eprintln!("  Backend error: {}", first_line(&reason));
                attempt = attempt.next(reason);
                continue;
            }
        };

        let candidate = match validate_and_repair(&raw, &info) {
            Outcome::Accepted(text) => text,
            Outcome::Rejected(rejection) => {
                let reason = rejection.to_string();
                println!("  Static check rejected: {}", first_line(&reason));
                attempt = attempt.next(reason);
                continue;
            }
        };

        write_spec(&spec_abs, &candidate)?;

        match suite.run_fast() {
            Ok(()) => {
                println!("  Dynamic check passed");
                return Ok(attempt.round);
            }
            Err(err) => {
                restore_spec(&spec_abs, original_spec.as_deref())?;
                let reason = err.to_string();
                println!("  Dynamic check failed, reverted {}", spec_rel);
                attempt = attempt.next(reason);
            }
        }
    }

    Err(CovgenError::AttemptsExhausted {
        attempts: config.max_attempts,
        last_error: attempt
            .feedback
            .unwrap_or_else(|| "no attempt recorded".to_string()),
    })
}

fn write_spec(spec_abs: &Path, candidate: &str) -> Result<(), CovgenError> {
    if let Some(parent) = spec_abs.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(spec_abs, candidate)?;
    Ok(())
}

fn restore_spec(spec_abs: &Path, original: Option<&str>) -> Result<(), CovgenError> {
    match original {
        Some(content) => fs::write(spec_abs, content)?,
        None => {
            if spec_abs.exists() {
                fs::remove_file(spec_abs)?;
            }
        }
    }
    Ok(())
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or(s)
}
