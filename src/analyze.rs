//! Source-file text analysis
//!
//! Small regex predicates over the TypeScript source under test. Deliberately
//! not a parser: each function has a narrow input-pattern contract and is
//! testable on its own. Good enough for the Angular conventions this tool
//! targets (one exported class per file, decorator metadata near the top).

use regex::Regex;

/// What the generator and validator need to know about the file under test.
#[derive(Debug, Clone, Default)]
pub struct SourceInfo {
    /// Main exported class name, e.g. `UserListComponent`.
    pub class_name: Option<String>,
    /// True when the component declares its own imports (standalone).
    pub standalone: bool,
    /// Locally declared type names a separate spec file cannot import.
    pub forbidden_identifiers: Vec<String>,
}

impl SourceInfo {
    pub fn from_source(src: &str) -> Self {
        let class_name = exported_class_name(src);
        let forbidden_identifiers = forbidden_identifiers(src, class_name.as_deref());
        Self {
            class_name,
            standalone: is_standalone_component(src),
            forbidden_identifiers,
        }
    }
}

/// First `export class Name` in the file.
pub fn exported_class_name(src: &str) -> Option<String> {
    let re = Regex::new(r"export\s+(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)").unwrap();
    re.captures(src).map(|caps| caps[1].to_string())
}

/// Heuristic standalone detection: the file carries a component decorator
/// and its metadata declares an explicit imports list.
pub fn is_standalone_component(src: &str) -> bool {
    let component = Regex::new(r"@Component\s*\(").unwrap();
    let imports = Regex::new(r"\bimports\s*:\s*\[").unwrap();
    component.is_match(src) && imports.is_match(src)
}

/// Type-ish names declared in the source file, excluding the main exported
/// class. A generated spec must not reference these: they are usually not
/// exported, so a separately compiled spec file cannot resolve them.
pub fn forbidden_identifiers(src: &str, class_name: Option<&str>) -> Vec<String> {
    let re = Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:declare\s+)?(?:interface|enum|type|class)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap();

    let mut out: Vec<String> = Vec::new();
    for caps in re.captures_iter(src) {
        let name = caps[1].to_string();
        if Some(name.as_str()) == class_name {
            continue;
        }
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
