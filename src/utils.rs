use std::{borrow::Cow, sync::OnceLock};

use regex::Regex;

pub fn make_single_line(s: &str) -> Cow<str> {
    if s.contains('\n') {
        Cow::Owned(s.replace('\n', "↵"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Collapses every run of whitespace into a single space and trims the ends
pub fn normalize_whitespace(s: &str) -> String {
    static CELL: OnceLock<Regex> = OnceLock::new();
    let re = CELL.get_or_init(|| Regex::new(r"\s+").expect("failed to compile regex"));
    re.replace_all(s, " ").trim().to_string()
}

/// Keeps at most `max_chars` characters (not bytes)
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Single line version of `s` cut down for log output, with "..." when cut
pub fn preview(s: &str, max_chars: usize) -> String {
    let line = make_single_line(s);
    let cut = truncate_chars(&line, max_chars);
    if cut.len() < line.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}
