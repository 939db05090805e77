//! Small text helpers shared by the directive dispatcher, the expander, and the
//! line assembler. Nothing here is specific to directives or macros; it is the
//! vocabulary the rest of the crate is built out of.

/// Directive-style prefixes that must survive a continuation join verbatim,
/// e.g. `!DIR$ ATTRIBUTES ALIGN : 64 :: x`.
const SENTINEL_PREFIXES: [&str; 5] = ["!DIR$", "!$OMP", "!DEC$", "!GCC$", "!ACC$"];

/// Case-insensitive ASCII uppercase fold, used for directive-keyword matching.
/// Non-ASCII bytes are left untouched (the dialect is ASCII-only per spec).
pub fn fold_upper(s: &str) -> String {
    s.chars().map(|c| c.to_ascii_uppercase()).collect()
}

/// True if `haystack`, compared case-insensitively, starts with `needle`.
pub fn starts_with_fold(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if haystack.len() < needle.len() {
        return false;
    }
    haystack
        .iter()
        .zip(needle.iter())
        .all(|(a, b)| a.to_ascii_uppercase() == b.to_ascii_uppercase())
}

/// Splits `s` at the first occurrence of any ASCII whitespace, returning
/// `(head, tail)` with `tail` having its leading whitespace trimmed. If there
/// is no whitespace, `tail` is empty.
pub fn head_tail(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Returns the leading run of non-whitespace characters.
pub fn head(s: &str) -> &str {
    head_tail(s).0
}

/// Returns everything after the leading non-whitespace run, trimmed of
/// leading whitespace.
pub fn tail(s: &str) -> &str {
    head_tail(s).1
}

fn sentinel_prefix(s: &str) -> Option<&'static str> {
    SENTINEL_PREFIXES
        .iter()
        .find(|p| starts_with_fold(s.trim_start(), p))
        .copied()
}

/// Joins two partial logical lines at a Fortran `&` continuation point.
///
/// - A trailing `&` on `first` is dropped.
/// - A leading `&` on `second` (after trimming leading whitespace) is dropped.
/// - Duplicate spaces at the join are collapsed to one.
/// - If `second` carries a sentinel directive prefix (`!DIR$`, `!$OMP`, ...),
///   it is preserved verbatim instead of being treated as continuation text.
pub fn concat(first: &str, second: &str) -> String {
    let first_trimmed = first.strip_suffix('&').unwrap_or(first).trim_end();

    let second_trimmed = second.trim_start();
    if sentinel_prefix(second_trimmed).is_some() {
        if first_trimmed.is_empty() {
            return second_trimmed.to_string();
        }
        return format!("{first_trimmed} {second_trimmed}");
    }

    let second_trimmed = second_trimmed.strip_prefix('&').unwrap_or(second_trimmed);
    let second_trimmed = second_trimmed.trim_start();

    if first_trimmed.is_empty() {
        second_trimmed.to_string()
    } else if second_trimmed.is_empty() {
        first_trimmed.to_string()
    } else {
        format!("{first_trimmed} {second_trimmed}")
    }
}

/// True if the trimmed line's last character is `&`.
pub fn ends_with_continuation(s: &str) -> bool {
    s.trim_end().ends_with('&')
}
