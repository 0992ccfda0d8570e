use anyhow::Result;
use clap::Parser;
use covgen::backend::OllamaBackend;
use covgen::config::Config;
use covgen::driver;
use covgen::runner::NgTestSuite;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "covgen",
    about = "Iteratively generate/update Angular unit tests to meet per-file coverage",
    version
)]
struct Args {
    /// Path to the Angular project (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Minimum required percentage for lines and branches
    #[arg(long, default_value_t = Config::DEFAULT_MIN_PCT)]
    min: f64,

    /// Maximum iterations (one file fixed per iteration)
    #[arg(long, default_value_t = Config::DEFAULT_MAX_ITERS)]
    max_iters: u32,

    /// Generation attempts per file before giving up
    #[arg(long, default_value_t = Config::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Ollama model tag
    #[arg(long, default_value = Config::DEFAULT_MODEL)]
    model: String,

    /// Write a machine-readable run summary to this path
    #[arg(long, value_name = "PATH")]
    summary_json: Option<PathBuf>,
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let args = Args::parse();
    let repo_root = args.path.canonicalize()?;

    let config = Config {
        min_pct: args.min,
        max_iters: args.max_iters,
        max_attempts: args.max_attempts,
        model: args.model,
        repo_root: repo_root.clone(),
        summary_json: args.summary_json,
    };

    let backend = OllamaBackend;
    let suite = NgTestSuite::new(&repo_root);
    driver::run(&config, &backend, &suite)
}
