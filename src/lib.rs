//! covgen library crate
//!
//! Exposes the pipeline modules so integration tests and external tooling
//! can exercise them without going through CLI startup.

pub mod analyze;
pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod lcov;
pub mod prompt;
pub mod repair;
pub mod runner;
pub mod select;
pub mod summary;
pub mod util;
pub mod validate;
