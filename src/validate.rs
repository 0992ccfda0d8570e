//! Static validation and repair of generated spec files
//!
//! The model's raw output is free-form text. Before anything touches the
//! karma compile, the candidate goes through this pipeline: a fixed sequence
//! of deterministic rewrites (steps 1-4) followed by gating checks (steps
//! 5-12). Rewrites always run; the first failing gate short-circuits with a
//! reason specific enough to feed back into the next generation round. This
//! never calls the backend and never touches disk.

use crate::analyze::SourceInfo;
use regex::Regex;
use std::fmt;

/// Result of one pipeline pass over a raw candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Cleaned text, safe to write and compile.
    Accepted(String),
    Rejected(Rejection),
}

/// One variant per gating check, each with a distinct repair instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Commentary,
    MissingDescribe,
    MissingIt,
    MissingExpect,
    NoTestBed,
    LooseTyping,
    StartsWithQuote,
    NoLeadingImport,
    DeclarationsRemain,
    StandaloneImportsMissing { class_name: String },
    WrongComponentCreated { expected: String, found: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Commentary => write!(
                f,
                "output contained commentary/markdown; return ONLY the raw TypeScript spec file, no code fences, no prose"
            ),
            Rejection::MissingDescribe => {
                write!(f, "output is missing a describe(...) block")
            }
            Rejection::MissingIt => write!(f, "output is missing an it(...) test case"),
            Rejection::MissingExpect => {
                write!(f, "output is missing an expect(...) assertion")
            }
            Rejection::NoTestBed => write!(
                f,
                "output never references TestBed; configure the test module with TestBed.configureTestingModule"
            ),
            Rejection::LooseTyping => write!(
                f,
                "output uses an open string-indexed type ({{ [key: string]: ... }} or Record<string, ...>); \
                 derive literal test data from the instantiated component's own fields and use \
                 {{ ...base, field: override }} copies instead of inventing ad hoc typed literals"
            ),
            Rejection::StartsWithQuote => write!(
                f,
                "output begins with a quote character; the file must start with real code"
            ),
            Rejection::NoLeadingImport => write!(
                f,
                "the first non-empty line must be an import statement"
            ),
            Rejection::DeclarationsRemain => write!(
                f,
                "use imports: [...] instead of declarations: [...] in TestBed.configureTestingModule"
            ),
            Rejection::StandaloneImportsMissing { class_name } => write!(
                f,
                "{} is a standalone component; it must appear in the imports: [...] array of TestBed.configureTestingModule",
                class_name
            ),
            Rejection::WrongComponentCreated { expected, found } => write!(
                f,
                "TestBed.createComponent must create {} (the component under test), not {}",
                expected, found
            ),
        }
    }
}

/// Run the full pipeline: clean, then judge.
pub fn validate_and_repair(raw: &str, info: &SourceInfo) -> Outcome {
    let text = unwrap_string_literal(raw);
    let text = normalize_whitespace(&text);
    let text = rewrite_declarations_to_imports(&text);
    let text = strip_forbidden_identifiers(&text, &info.forbidden_identifiers);

    if let Some(rejection) = check_gates(&text, info) {
        Outcome::Rejected(rejection)
    } else {
        Outcome::Accepted(text)
    }
}

fn check_gates(text: &str, info: &SourceInfo) -> Option<Rejection> {
    if is_commentary(text) {
        return Some(Rejection::Commentary);
    }
    if !text.contains("describe(") {
        return Some(Rejection::MissingDescribe);
    }
    if !text.contains("it(") {
        return Some(Rejection::MissingIt);
    }
    if !text.contains("expect(") {
        return Some(Rejection::MissingExpect);
    }
    if !text.contains("TestBed") {
        return Some(Rejection::NoTestBed);
    }
    if has_loose_typing(text) {
        return Some(Rejection::LooseTyping);
    }
    if starts_with_quote(text) {
        return Some(Rejection::StartsWithQuote);
    }
    if !first_line_is_import(text) {
        return Some(Rejection::NoLeadingImport);
    }
    if has_declarations_keyword(text) {
        return Some(Rejection::DeclarationsRemain);
    }
    if info.standalone {
        if let Some(class_name) = info.class_name.as_deref() {
            if let Some(rejection) = check_standalone_consistency(text, class_name) {
                return Some(rejection);
            }
        }
    }
    None
}

/// Step 1: models sometimes return the whole file as one quoted string
/// literal. If the output is bounded by a matching quote pair, decode it and
/// adopt the decoded text when it still looks like a spec file.
pub fn unwrap_string_literal(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let (first, last) = match (chars.next(), trimmed.chars().last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return raw.to_string(),
    };
    if trimmed.chars().count() < 2 || first != last || !matches!(first, '\'' | '"' | '`') {
        return raw.to_string();
    }

    let inner: String = trimmed
        .chars()
        .skip(1)
        .take(trimmed.chars().count() - 2)
        .collect();
    let decoded = match unescape(&inner, first) {
        Some(d) => d,
        None => return raw.to_string(),
    };

    if decoded.contains("describe(") || decoded.contains("import ") {
        decoded
    } else {
        raw.to_string()
    }
}

fn unescape(s: &str, quote: char) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == quote {
            // An unescaped closing quote in the middle means this was never
            // one single literal.
            return None;
        }
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '`' => out.push('`'),
            '0' => out.push('\0'),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Some(out)
}

/// Step 2: drop BOM/zero-width prefixes, remove uniform over-indentation,
/// end with exactly one newline.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.trim_start_matches(['\u{feff}', '\u{200b}', '\u{200c}', '\u{200d}']);

    let common_indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let dedented: Vec<&str> = text
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                &line[common_indent..]
            }
        })
        .collect();

    let mut out = dedented.join("\n");
    while out.ends_with(['\n', ' ', '\t', '\r']) {
        out.pop();
    }
    out.push('\n');
    out
}

/// Step 3: legacy TestBed config listed components under `declarations:`;
/// standalone-era specs use `imports:`. Best-effort keyword rewrite, only
/// when the text actually configures a testing module.
pub fn rewrite_declarations_to_imports(text: &str) -> String {
    if !text.contains("TestBed.configureTestingModule") {
        return text.to_string();
    }
    let re = Regex::new(r"\bdeclarations(\s*):").unwrap();
    if !re.is_match(text) {
        return text.to_string();
    }
    re.replace_all(text, "imports$1:").into_owned()
}

/// Step 4: remove `: Name` annotations, `as Name` casts and `<Name>` generic
/// arguments for every locally declared type the spec cannot import.
pub fn strip_forbidden_identifiers(text: &str, forbidden: &[String]) -> String {
    let mut out = text.to_string();
    for name in forbidden {
        let escaped = regex::escape(name);
        let annotation = Regex::new(&format!(r"\s*:\s*{}\b(\[\])?", escaped)).unwrap();
        out = annotation.replace_all(&out, "").into_owned();
        let cast = Regex::new(&format!(r"\s+as\s+{}\b(\[\])?", escaped)).unwrap();
        out = cast.replace_all(&out, "").into_owned();
        let generic = Regex::new(&format!(r"<{}\b(\[\])?>", escaped)).unwrap();
        out = generic.replace_all(&out, "").into_owned();
    }
    out
}

const LEAD_INS: [&str; 8] = [
    "sure",
    "here",
    "certainly",
    "of course",
    "okay",
    "below is",
    "i've",
    "i have",
];

fn is_commentary(text: &str) -> bool {
    if text.contains("```") {
        return true;
    }
    if text.to_lowercase().contains("markdown") {
        return true;
    }
    let lead = text.trim_start().to_lowercase();
    LEAD_INS.iter().any(|prefix| lead.starts_with(prefix))
}

fn has_loose_typing(text: &str) -> bool {
    let index_signature = Regex::new(r"\[\s*\w+\s*:\s*string\s*\]\s*:").unwrap();
    let string_record = Regex::new(r"\bRecord\s*<\s*string\s*,").unwrap();
    index_signature.is_match(text) || string_record.is_match(text)
}

fn starts_with_quote(text: &str) -> bool {
    matches!(
        text.trim_start().chars().next(),
        Some('\'') | Some('"') | Some('`')
    )
}

fn first_line_is_import(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.starts_with("import"))
        .unwrap_or(false)
}

fn has_declarations_keyword(text: &str) -> bool {
    Regex::new(r"\bdeclarations\s*:").unwrap().is_match(text)
}

/// Step 12: a standalone component must be listed in the testing module's
/// imports array, and if the spec creates a component explicitly it must
/// create the component under test.
fn check_standalone_consistency(text: &str, class_name: &str) -> Option<Rejection> {
    let imports_re = Regex::new(r"\bimports\s*:\s*\[([^\]]*)\]").unwrap();
    let word = Regex::new(&format!(r"\b{}\b", regex::escape(class_name))).unwrap();
    let listed = imports_re
        .captures_iter(text)
        .any(|caps| word.is_match(&caps[1]));
    if !listed {
        return Some(Rejection::StandaloneImportsMissing {
            class_name: class_name.to_string(),
        });
    }

    let create_re = Regex::new(r"TestBed\.createComponent\s*\(\s*([A-Za-z_$][\w$]*)").unwrap();
    for caps in create_re.captures_iter(text) {
        let found = caps[1].to_string();
        if found != class_name {
            return Some(Rejection::WrongComponentCreated {
                expected: class_name.to_string(),
                found,
            });
        }
    }
    None
}
