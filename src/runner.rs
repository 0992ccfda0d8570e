//! Test runner invocation
//!
//! Two invocation modes of the same suite: a coverage-instrumented run that
//! produces the lcov report, and a fast uninstrumented run used as the
//! dynamic check inside the repair loop. Non-zero exit is a hard failure of
//! that call, never a partial result.

use crate::error::CovgenError;
use crate::util::{combine_output, truncate_output};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Output kept in diagnostics; karma logs get long fast.
const MAX_DIAGNOSTIC_CHARS: usize = 4000;

pub trait TestSuite {
    /// Full run with coverage instrumentation; deposits the lcov report.
    fn run_with_coverage(&self) -> Result<(), CovgenError>;
    /// Cheap compile-and-run pass with no instrumentation.
    fn run_fast(&self) -> Result<(), CovgenError>;
}

/// Drives `ng test` through npx so no global Angular CLI is required.
#[derive(Debug, Clone)]
pub struct NgTestSuite {
    repo_root: PathBuf,
}

impl NgTestSuite {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<(), CovgenError> {
        let command = format!("npx {}", args.join(" "));
        let out = Command::new("npx")
            .current_dir(&self.repo_root)
            .args(args)
            .output()
            .map_err(|source| CovgenError::Spawn {
                command: command.clone(),
                source,
            })?;

        if out.status.success() {
            Ok(())
        } else {
            Err(CovgenError::CommandFailed {
                command,
                output: truncate_output(&combine_output(&out), MAX_DIAGNOSTIC_CHARS),
            })
        }
    }
}

impl TestSuite for NgTestSuite {
    fn run_with_coverage(&self) -> Result<(), CovgenError> {
        self.run(&["ng", "test", "--watch=false", "--code-coverage"])
    }

    fn run_fast(&self) -> Result<(), CovgenError> {
        self.run(&["ng", "test", "--watch=false"])
    }
}
