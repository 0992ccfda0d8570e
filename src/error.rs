//! Error taxonomy for the generation run
//!
//! Only conditions that cross a module boundary get a variant here. Static
//! rejections and dynamic test failures stay inside the repair loop as
//! feedback text; they surface as `AttemptsExhausted` once the budget is gone.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CovgenError {
    /// No lcov.info was found under the coverage output directory.
    #[error("could not find coverage/**/lcov.info — did `ng test --code-coverage` run?")]
    ReportNotFound,

    /// The generative backend process exited non-zero.
    #[error("backend failed:\n{stderr}")]
    Backend { stderr: String },

    /// An external command (test runner) exited non-zero.
    #[error("command failed: {command}\n{output}")]
    CommandFailed { command: String, output: String },

    /// An external command could not be spawned at all.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Every generation round was consumed without a dynamic pass.
    #[error("gave up after {attempts} attempts; last error:\n{last_error}")]
    AttemptsExhausted { attempts: u32, last_error: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
