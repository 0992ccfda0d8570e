//! Generation request builder
//!
//! Key principle: give the model everything it needs in one payload — the
//! coverage numbers, the full source, the current spec, the names it must
//! not reference — plus, on retries, exactly what went wrong last round.

use crate::analyze::SourceInfo;
use std::fmt::Write;

/// Inputs for one generation round.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub source_path: &'a str,
    pub spec_path: &'a str,
    pub source_text: &'a str,
    /// Current spec content; empty when no spec exists yet.
    pub spec_text: &'a str,
    pub min_pct: f64,
    pub line_pct: f64,
    pub branch_pct: f64,
    pub info: &'a SourceInfo,
    /// Failure text from the previous round, if any.
    pub feedback: Option<&'a str>,
}

const SYSTEM_RULES: &str = "You are a senior Angular engineer. \
Output ONLY TypeScript code (no markdown). \
Do NOT delete existing tests; only add/adjust minimal tests to raise coverage. \
Use Angular TestBed; for standalone components prefer imports: [Component]. \
Add at least one DOM assertion when a template exists. \
Keep changes small and focused.";

/// Build the full prompt for one round.
pub fn build(ctx: &PromptContext<'_>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "SYSTEM:\n{}\n", SYSTEM_RULES);

    let _ = writeln!(out, "CONTEXT:");
    let _ = writeln!(
        out,
        "We enforce >= {:.0}% line AND branch coverage per file.",
        ctx.min_pct
    );
    let _ = writeln!(
        out,
        "Current: lines={:.2}%, branches={:.2}%.",
        ctx.line_pct, ctx.branch_pct
    );
    if let Some(class_name) = ctx.info.class_name.as_deref() {
        let _ = writeln!(
            out,
            "Class under test: {}{}.",
            class_name,
            if ctx.info.standalone {
                " (standalone component)"
            } else {
                ""
            }
        );
    }
    if !ctx.info.forbidden_identifiers.is_empty() {
        let _ = writeln!(
            out,
            "Do NOT reference these non-exported local types: {}.",
            ctx.info.forbidden_identifiers.join(", ")
        );
    }

    let _ = writeln!(out, "\nSOURCE FILE ({}):\n{}", ctx.source_path, ctx.source_text);
    let _ = writeln!(out, "CURRENT SPEC ({}):\n{}", ctx.spec_path, ctx.spec_text);

    if let Some(feedback) = ctx.feedback {
        let _ = writeln!(
            out,
            "PREVIOUS ATTEMPT FAILED. Fix the following before anything else:\n{}\n",
            feedback
        );
    }

    let _ = write!(
        out,
        "TASK:\nReturn the COMPLETE updated spec file for {}.\n",
        file_name(ctx.spec_path)
    );
    out
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
