//! Outer iteration driver
//!
//! One target per iteration: measure coverage, pick the worst eligible file,
//! run the repair loop on it, re-measure on the next pass. Ends with a final
//! verification run that decides the exit code.

use crate::backend::Generator;
use crate::config::Config;
use crate::error::CovgenError;
use crate::lcov::{self, CoverageRecord};
use crate::repair;
use crate::runner::TestSuite;
use crate::select;
use crate::summary::{IterationOutcome, IterationResult, RunSummary};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;

pub const EXIT_OK: i32 = 0;
pub const EXIT_UNDER_THRESHOLD: i32 = 2;
pub const EXIT_VERIFICATION_ERROR: i32 = 3;

/// Run the whole improvement loop; returns the process exit code.
pub fn run(config: &Config, backend: &dyn Generator, suite: &dyn TestSuite) -> Result<i32> {
    let mut summary = RunSummary::new(config.min_pct, &config.model);

    let mut exit_code = None;
    for iteration in 1..=config.max_iters {
        println!("\n=== Iteration {}/{} ===", iteration, config.max_iters);

        let records = measure(config, suite)?;
        let targets = select::select(&records, config.min_pct);

        let Some(target) = targets.first().copied() else {
            println!(
                "OK: all files meet >= {:.0}% lines and branches",
                config.min_pct
            );
            exit_code = Some(EXIT_OK);
            break;
        };

        println!(
            "Target: {} | lines {}/{} ({:.2}%) | branches {}/{} ({:.2}%)",
            target.path,
            target.lines_hit,
            target.lines_found,
            target.line_pct(),
            target.branches_hit,
            target.branches_found,
            target.branch_pct()
        );

        let source_abs = config.repo_root.join(&target.path);
        if !source_abs.exists() {
            // The next measurement round re-evaluates; if the report keeps
            // listing this file the loop may keep landing on it until the
            // iteration budget runs out.
            println!("Skip: source not found on disk: {}", target.path);
            summary.record(outcome(iteration, target, IterationResult::SkippedMissingSource));
            continue;
        }

        match repair::repair_loop(config, backend, suite, target) {
            Ok(attempts) => {
                println!("Updated: {}", repair::spec_path_for(&target.path));
                summary.record(outcome(iteration, target, IterationResult::Updated { attempts }));
            }
            Err(CovgenError::AttemptsExhausted {
                attempts,
                last_error,
            }) => {
                eprintln!(
                    "Giving up on {} after {} attempts:\n{}",
                    target.path, attempts, last_error
                );
                summary.record(outcome(
                    iteration,
                    target,
                    IterationResult::Exhausted { last_error },
                ));
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    // Final check after exhausting iterations (or giving up on a target).
    let exit_code = match exit_code {
        Some(code) => code,
        None => final_verification(config, suite),
    };

    summary.finish(exit_code);
    if let Some(path) = &config.summary_json {
        summary.write(path);
    }
    Ok(exit_code)
}

fn measure(
    config: &Config,
    suite: &dyn TestSuite,
) -> Result<BTreeMap<String, CoverageRecord>, CovgenError> {
    suite.run_with_coverage()?;
    let report = lcov::find_report(&config.repo_root)?;
    let text = fs::read_to_string(&report)?;
    Ok(lcov::parse(&text))
}

fn final_verification(config: &Config, suite: &dyn TestSuite) -> i32 {
    match measure(config, suite) {
        Ok(records) => {
            let targets = select::select(&records, config.min_pct);
            if targets.is_empty() {
                println!(
                    "OK: all files meet >= {:.0}% lines and branches",
                    config.min_pct
                );
                EXIT_OK
            } else {
                println!(
                    "Still under-covered after max iterations ({}):",
                    config.max_iters
                );
                for target in targets.iter().take(10) {
                    println!(
                        "- {}: lines {:.2}%, branches {:.2}%",
                        target.path,
                        target.line_pct(),
                        target.branch_pct()
                    );
                }
                EXIT_UNDER_THRESHOLD
            }
        }
        Err(err) => {
            println!("{}", err);
            EXIT_VERIFICATION_ERROR
        }
    }
}

fn outcome(iteration: u32, target: &CoverageRecord, result: IterationResult) -> IterationOutcome {
    IterationOutcome {
        iteration,
        target: target.path.clone(),
        line_pct: target.line_pct(),
        branch_pct: target.branch_pct(),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SOURCE: &str = "import { Component } from '@angular/core';\n\
                          @Component({ selector: 'app-foo', template: '<p></p>' })\n\
                          export class FooComponent {}\n";

    const GOOD_SPEC: &str = "import { TestBed } from '@angular/core/testing';\n\
                             import { FooComponent } from './foo.component';\n\
                             describe('FooComponent', () => {\n\
                             \x20 it('should create', () => {\n\
                             \x20   TestBed.configureTestingModule({ imports: [FooComponent] });\n\
                             \x20   expect(TestBed.createComponent(FooComponent)).toBeTruthy();\n\
                             \x20 });\n\
                             });\n";

    const BAD_LCOV: &str = "SF:src/app/foo.component.ts\nLH:40\nLF:100\nBRH:0\nBRF:0\nend_of_record\n";
    const GOOD_LCOV: &str = "SF:src/app/foo.component.ts\nLH:100\nLF:100\nBRH:0\nBRF:0\nend_of_record\n";

    struct StubBackend;

    impl Generator for StubBackend {
        fn generate(&self, _model: &str, _prompt: &str) -> Result<String, CovgenError> {
            Ok(GOOD_SPEC.to_string())
        }
    }

    /// Deposits the next queued lcov body on every coverage run; the last
    /// one repeats. The fast run always passes.
    struct StubSuite {
        repo_root: std::path::PathBuf,
        reports: RefCell<VecDeque<&'static str>>,
        last: RefCell<&'static str>,
    }

    impl StubSuite {
        fn new(repo_root: &std::path::Path, reports: Vec<&'static str>) -> Self {
            Self {
                repo_root: repo_root.to_path_buf(),
                reports: RefCell::new(reports.into()),
                last: RefCell::new(""),
            }
        }
    }

    impl TestSuite for StubSuite {
        fn run_with_coverage(&self) -> Result<(), CovgenError> {
            let body = self
                .reports
                .borrow_mut()
                .pop_front()
                .unwrap_or(*self.last.borrow());
            *self.last.borrow_mut() = body;
            let dir = self.repo_root.join("coverage/app");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("lcov.info"), body).unwrap();
            Ok(())
        }

        fn run_fast(&self) -> Result<(), CovgenError> {
            Ok(())
        }
    }

    fn setup_repo(tag: &str) -> Config {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("covgen_driver_{}_{}", tag, nanos));
        fs::create_dir_all(root.join("src/app")).unwrap();
        fs::write(root.join("src/app/foo.component.ts"), SOURCE).unwrap();
        Config {
            repo_root: root,
            max_iters: 3,
            ..Config::default()
        }
    }

    fn teardown(config: &Config) {
        let _ = fs::remove_dir_all(&config.repo_root);
    }

    #[test]
    fn test_run_converges_and_exits_zero() {
        let config = setup_repo("converges");
        let suite = StubSuite::new(&config.repo_root, vec![BAD_LCOV, GOOD_LCOV]);

        let code = run(&config, &StubBackend, &suite).unwrap();
        assert_eq!(code, EXIT_OK);

        let spec = fs::read_to_string(config.repo_root.join("src/app/foo.component.spec.ts"))
            .unwrap();
        assert_eq!(spec, GOOD_SPEC);
        teardown(&config);
    }

    #[test]
    fn test_run_already_green_exits_zero_without_generating() {
        let config = setup_repo("green");
        let suite = StubSuite::new(&config.repo_root, vec![GOOD_LCOV]);

        let code = run(&config, &StubBackend, &suite).unwrap();
        assert_eq!(code, EXIT_OK);
        assert!(!config
            .repo_root
            .join("src/app/foo.component.spec.ts")
            .exists());
        teardown(&config);
    }

    #[test]
    fn test_missing_source_skips_until_budget_then_exit_two() {
        let config = setup_repo("missing");
        let lcov = "SF:src/app/gone.component.ts\nLH:0\nLF:10\nend_of_record\n";
        let suite = StubSuite::new(&config.repo_root, vec![lcov]);

        let code = run(&config, &StubBackend, &suite).unwrap();
        assert_eq!(code, EXIT_UNDER_THRESHOLD);
        teardown(&config);
    }

    #[test]
    fn test_exhausted_target_ends_run_with_exit_two() {
        struct BadBackend;
        impl Generator for BadBackend {
            fn generate(&self, _model: &str, _prompt: &str) -> Result<String, CovgenError> {
                Ok("not a spec at all".to_string())
            }
        }

        let config = setup_repo("exhausted");
        let suite = StubSuite::new(&config.repo_root, vec![BAD_LCOV]);

        let code = run(&config, &BadBackend, &suite).unwrap();
        assert_eq!(code, EXIT_UNDER_THRESHOLD);
        // Nothing may be left behind for the target.
        assert!(!config
            .repo_root
            .join("src/app/foo.component.spec.ts")
            .exists());
        teardown(&config);
    }

    #[test]
    fn test_summary_json_written_when_requested() {
        let mut config = setup_repo("summary");
        let summary_path = config.repo_root.join("run.json");
        config.summary_json = Some(summary_path.clone());
        let suite = StubSuite::new(&config.repo_root, vec![BAD_LCOV, GOOD_LCOV]);

        let code = run(&config, &StubBackend, &suite).unwrap();
        assert_eq!(code, EXIT_OK);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(json["exit_code"], 0);
        assert_eq!(json["iterations"][0]["target"], "src/app/foo.component.ts");
        assert_eq!(json["iterations"][0]["result"]["kind"], "updated");
        teardown(&config);
    }

    #[test]
    fn test_missing_report_is_fatal() {
        struct NoReportSuite;
        impl TestSuite for NoReportSuite {
            fn run_with_coverage(&self) -> Result<(), CovgenError> {
                Ok(())
            }
            fn run_fast(&self) -> Result<(), CovgenError> {
                Ok(())
            }
        }

        let config = setup_repo("no_report");
        let err = run(&config, &StubBackend, &NoReportSuite).unwrap_err();
        assert!(err.to_string().contains("lcov.info"));
        teardown(&config);
    }
}
