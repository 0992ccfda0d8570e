use std::process::Output;

/// Truncate command output for diagnostics, unicode-safe.
pub fn truncate_output(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    let char_count = trimmed.chars().count();
    if char_count <= max {
        trimmed.to_string()
    } else {
        let snippet: String = trimmed.chars().take(max).collect();
        format!("{}\n… (truncated)", snippet)
    }
}

/// Combine stdout and stderr of a finished command into one diagnostic blob.
pub fn combine_output(out: &Output) -> String {
    let mut combined = String::new();
    if !out.stdout.is_empty() {
        combined.push_str(&String::from_utf8_lossy(&out.stdout));
    }
    if !out.stderr.is_empty() {
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&String::from_utf8_lossy(&out.stderr));
    }
    combined
}
