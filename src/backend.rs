//! Generative backend adapter
//!
//! One blocking call per generation round: the prompt goes down the child's
//! stdin, the full response comes back on stdout. No retry here; the repair
//! loop owns that policy.

use crate::error::CovgenError;
use crate::util::truncate_output;
use std::io::Write;
use std::process::{Command, Stdio};

/// Anything that can turn a prompt into candidate spec text.
pub trait Generator {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, CovgenError>;
}

/// Runs a local `ollama run <model>` process per request.
#[derive(Debug, Default)]
pub struct OllamaBackend;

impl Generator for OllamaBackend {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, CovgenError> {
        let mut child = Command::new("ollama")
            .args(["run", model])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CovgenError::Spawn {
                command: format!("ollama run {}", model),
                source,
            })?;

        // Scope the handle so stdin closes before we wait; ollama reads
        // until EOF.
        {
            let mut stdin = child.stdin.take().ok_or_else(|| CovgenError::Backend {
                stderr: "could not open ollama stdin".to_string(),
            })?;
            stdin.write_all(prompt.as_bytes())?;
        }

        let out = child.wait_with_output()?;
        if !out.status.success() {
            return Err(CovgenError::Backend {
                stderr: truncate_output(&String::from_utf8_lossy(&out.stderr), 4000),
            });
        }

        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }
}
