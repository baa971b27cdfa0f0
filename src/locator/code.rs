//! Structured-code fast path.
//!
//! Descriptions such as `"COMP3702"` or `"[DECO 3801]"` name a course by
//! code. Those are matched against attributes before any text similarity.

use crate::driver::Selector;
use regex::Regex;

/// Card / list-item containers scanned when no attribute probe hits.
pub const CONTAINER_SELECTOR: &str =
    r#".course-card, [class*="course-node"], .course-item, .course-list-item"#;

/// Normalized code embedded in the description: two or more letters then
/// three or more digits, optionally bracketed and with a trailing letter.
/// Returned uppercase with brackets and spaces stripped.
pub fn extract_code(description: &str, min_len: usize) -> Option<String> {
    let re = Regex::new(r"\[?[A-Z]{2,}\s?\d{3,}[A-Z]?\]?").ok()?;
    let upper = description.to_uppercase();
    let m = re.find(&upper)?;
    let code: String = m
        .as_str()
        .chars()
        .filter(|c| !matches!(c, '[' | ']') && !c.is_whitespace())
        .collect();
    (code.len() >= min_len).then_some(code)
}

/// Split `COMP3702` into `("COMP", "3702")`.
fn split_code(code: &str) -> (&str, &str) {
    let at = code
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(code.len());
    code.split_at(at)
}

/// Probes in the order they are tried.
pub fn probe_selectors(code: &str) -> Vec<Selector> {
    let lower = code.to_lowercase();
    let (letters, digits) = split_code(code);
    vec![
        Selector::css(format!(r#"[title*="{}"]"#, code)),
        Selector::css(format!(r#"[aria-label*="{}"]"#, code)),
        Selector::css(format!(r#"[data-course-id*="{}"]"#, code)),
        Selector::css(format!(r#"[id*="{}" i]"#, lower)),
        Selector::css(format!(r#"[class*="course-{}"]"#, lower)),
        Selector::css(format!(r#"[href*="{}" i]"#, lower)),
        Selector::text_regex(format!(".*{}.*", regex::escape(code))),
        Selector::text_regex(format!(
            r".*{}\s*{}.*",
            regex::escape(letters),
            regex::escape(digits)
        )),
    ]
}

/// Text with whitespace removed, uppercased, for code containment checks.
pub fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}
