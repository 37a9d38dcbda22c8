//! Identifier helpers.

use std::sync::OnceLock;

use regex::Regex;

fn boundary() -> Option<&'static Regex> {
    static BOUNDARY: OnceLock<Option<Regex>> = OnceLock::new();
    BOUNDARY
        .get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])|([A-Z])([A-Z][a-z])").ok())
        .as_ref()
}

/// Convert `CamelCase`, `kebab-case` or spaced names to `snake_case`.
pub fn to_snake_case(name: &str) -> String {
    let spaced = match boundary() {
        Some(re) => re.replace_all(name, "${1}${3}_${2}${4}").into_owned(),
        None => name.to_string(),
    };
    let mut out = String::with_capacity(spaced.len());
    for ch in spaced.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}
