//! Inline Markdown formatting removal.
//!
//! The engine draws every run in a single face, so emphasis, code spans and
//! links are reduced to their visible text before measuring. The rules run
//! in a fixed order; each is non-greedy and never spans a newline.

use once_cell::sync::Lazy;
use regex::Regex;

static RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\*\*(.+?)\*\*",
        r"\*(.+?)\*",
        r"__(.+?)__",
        r"_(.+?)_",
        r"`(.+?)`",
        r"\[(.+?)\]\(.+?\)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Strip bold, italic, inline code and link markup, keeping the inner text.
///
/// Pure and total: any input produces output, and text with no markup comes
/// back unchanged. Underscores inside identifiers are treated as emphasis
/// (`snake_case_name` becomes `snakecasename`).
pub fn strip_inline_formatting(text: &str) -> String {
    let mut out = text.to_string();
    for rule in RULES.iter() {
        if rule.is_match(&out) {
            out = rule.replace_all(&out, "$1").into_owned();
        }
    }
    out
}
