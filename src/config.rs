//! Run configuration
//!
//! One value built from CLI args at startup and passed by reference into the
//! driver and repair loop. No ambient/global settings.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum required percentage for both lines and branches.
    pub min_pct: f64,
    /// Maximum outer iterations (one file fixed per iteration).
    pub max_iters: u32,
    /// Generation attempts per target before giving up.
    pub max_attempts: u32,
    /// Ollama model tag.
    pub model: String,
    /// Repository root the tool operates in.
    pub repo_root: PathBuf,
    /// Optional path for a machine-readable run summary.
    pub summary_json: Option<PathBuf>,
}

impl Config {
    pub const DEFAULT_MIN_PCT: f64 = 90.0;
    pub const DEFAULT_MAX_ITERS: u32 = 10;
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_MODEL: &'static str = "qwen2.5-coder:7b-instruct";
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_pct: Self::DEFAULT_MIN_PCT,
            max_iters: Self::DEFAULT_MAX_ITERS,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            model: Self::DEFAULT_MODEL.to_string(),
            repo_root: PathBuf::from("."),
            summary_json: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.min_pct, 90.0);
        assert_eq!(config.max_iters, 10);
        assert_eq!(config.max_attempts, 3);
        assert!(config.summary_json.is_none());
    }
}
