//! The macro expander (component F): the recursive line-rewrite engine that
//! drives the macro table and the per-expansion dependency graph, and -- via
//! [`expand_all`] -- substitutes the built-in tokens.

use crate::clock::Clock;
use crate::config::Config;
use crate::diag::Diagnostics;
use crate::graph::DependencyGraph;
use crate::macros::MacroTable;
use crate::paths::PathResolver;

/// Characters that make a match a valid macro-name boundary on either side.
const BOUNDARY_CHARS: &str = " ()[]<>&;.,^~!/*-+\\=\"'\t";

fn is_boundary(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => BOUNDARY_CHARS.contains(c),
    }
}

/// Rewrites user-defined macros in `line`. Returns `(expanded, stitch_flag)`
/// where `stitch_flag` is true when the final non-blank character of the
/// result is `&` (an unterminated Fortran continuation).
pub fn expand_macros(line: &str, macros: &MacroTable, cfg: &Config, diag: &dyn Diagnostics) -> (String, bool) {
    expand_macros_impl(line, macros, cfg, diag, true)
}

/// Same rewrite as [`expand_macros`], but for a macro name expanded from
/// *inside* an already-continued context (the expression evaluator's
/// identifier lookup, gated by `Config::implicit_continuation`): there is
/// no next physical line to stitch a trailing `&` with, so the line-level
/// `&`/comment normalization is skipped and the macro body is returned
/// exactly as substituted.
pub fn expand_macros_within_continuation(
    line: &str,
    macros: &MacroTable,
    cfg: &Config,
    diag: &dyn Diagnostics,
) -> (String, bool) {
    expand_macros_impl(line, macros, cfg, diag, false)
}

fn expand_macros_impl(
    line: &str,
    macros: &MacroTable,
    cfg: &Config,
    diag: &dyn Diagnostics,
    normalize_continuation: bool,
) -> (String, bool) {
    let mut graph = DependencyGraph::new(macros.size());
    let mut depth = 0usize;
    let mut expanded = expand_pass(line, macros, &mut graph, None, &mut depth, cfg, diag);
    if normalize_continuation {
        normalize_inline_comment_after_continuation(&mut expanded);
    }
    let stitch = expanded.trim_end().ends_with('&');
    (expanded, stitch)
}

/// `expand_macros` (skipped when `cfg.expand_macros` is `false`, the
/// `--expand-macros=false` master switch) followed by built-in token
/// substitution.
#[allow(clippy::too_many_arguments)]
pub fn expand_all(
    line: &str,
    macros: &MacroTable,
    cfg: &Config,
    diag: &dyn Diagnostics,
    clock: &dyn Clock,
    paths: &dyn PathResolver,
    file_path: &str,
    line_number: usize,
    has_extra: bool,
) -> (String, bool) {
    let mut text = if cfg.expand_macros {
        let (expanded, _) = expand_macros(line, macros, cfg, diag);
        expanded
    } else {
        line.to_string()
    };

    text = text.replace("__FILE__", &quote(file_path));
    text = text.replace("__LINE__", &line_number.to_string());

    let now = clock.now();
    text = text.replace("__DATE__", &quote(&now.format("MMM-dd-yyyy")));
    text = text.replace("__TIME__", &quote(&now.format("HH:mm:ss")));

    if has_extra {
        let filename = paths.basename(file_path, true);
        text = text.replace("__FILENAME__", &quote(&filename));
        text = text.replace("__TIMESTAMP__", &quote(&now.format("ddd MM yyyy HH:mm:ss")));
    }

    let stitch = text.trim_end().ends_with('&');
    (text, stitch)
}

fn quote(s: &str) -> String {
    format!("\"{s}\"")
}

fn normalize_inline_comment_after_continuation(line: &mut String) {
    if let Some(amp) = find_lone_ampersand(line) {
        if line[amp + 1..].contains('!') {
            line.truncate(amp + 1);
        }
    }
}

fn find_lone_ampersand(line: &str) -> Option<usize> {
    // A "lone &" is a standalone continuation marker, not the `&&` operator
    // that can appear inside an already-evaluated expression remnant.
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'&' {
            let prev_amp = i > 0 && bytes[i - 1] == b'&';
            let next_amp = i + 1 < bytes.len() && bytes[i + 1] == b'&';
            if !prev_amp && !next_amp {
                return Some(i);
            }
        }
    }
    None
}

/// One left-to-right pass of the whole macro table over `text`. `source` is
/// `Some(i)` when `text` is itself the (partially substituted) replacement
/// body of macro `i`; it is `None` for a top-level input line. Recursion
/// into a match's own replacement text reuses the same `graph` and
/// increments `depth`, bounded by `cfg.max_recursion`.
fn expand_pass(
    text: &str,
    macros: &MacroTable,
    graph: &mut DependencyGraph,
    source: Option<usize>,
    depth: &mut usize,
    cfg: &Config,
    diag: &dyn Diagnostics,
) -> String {
    let mut current = text.to_string();
    for i in 0..macros.size() {
        current = expand_one_macro(&current, macros, i, graph, source, depth, cfg, diag);
    }
    current
}

#[allow(clippy::too_many_arguments)]
fn expand_one_macro(
    text: &str,
    macros: &MacroTable,
    i: usize,
    graph: &mut DependencyGraph,
    source: Option<usize>,
    depth: &mut usize,
    cfg: &Config,
    diag: &dyn Diagnostics,
) -> String {
    let entry = match macros.get(i) {
        Some(e) => e,
        None => return text.to_string(),
    };
    let name = entry.name.clone();

    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut idx = 0usize;
    let mut quote: Option<char> = None;

    while idx < chars.len() {
        let c = chars[idx];

        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            idx += 1;
            continue;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
            out.push(c);
            idx += 1;
            continue;
        }

        if matches_name_at(&chars, idx, &name) {
            let prev = if idx == 0 { None } else { Some(chars[idx - 1]) };
            let after = idx + name.chars().count();
            let next = chars.get(after).copied();
            if is_boundary(prev) && is_boundary(next) {
                if entry.is_function_like() {
                    if let Some((args, call_end)) =
                        try_collect_call(&chars, after, diag, cfg.verbose)
                    {
                        let raw = build_function_replacement(entry, &args, diag, cfg.verbose);
                        match apply_cycle_guard(entry, i, macros, source, graph, depth, cfg, diag, &raw) {
                            Some(expanded) => out.push_str(&expanded),
                            None => out.push_str(&raw),
                        }
                        idx = call_end;
                        continue;
                    }
                    // Next non-space char after the name was not `(`: not a call, leave literal.
                    out.push(c);
                    idx += 1;
                    continue;
                }

                match apply_cycle_guard(entry, i, macros, source, graph, depth, cfg, diag, &entry.value) {
                    Some(expanded) => {
                        out.push_str(&expanded);
                        idx = after;
                        continue;
                    }
                    None => {
                        out.push(c);
                        idx += 1;
                        continue;
                    }
                }
            }
        }

        out.push(c);
        idx += 1;
    }

    out
}

fn matches_name_at(chars: &[char], idx: usize, name: &str) -> bool {
    let name_chars: Vec<char> = name.chars().collect();
    if idx + name_chars.len() > chars.len() {
        return false;
    }
    chars[idx..idx + name_chars.len()] == name_chars[..]
}

/// Records the `source -> i` dependency edge (when expanding inside another
/// macro's body) and decides whether `raw` may be recursively re-expanded.
/// Returns `None` when the occurrence must be left unexpanded (direct
/// self-reference, a detected cycle, or the recursion-depth guard).
#[allow(clippy::too_many_arguments)]
fn apply_cycle_guard(
    entry: &crate::macros::MacroEntry,
    i: usize,
    macros: &MacroTable,
    source: Option<usize>,
    graph: &mut DependencyGraph,
    depth: &mut usize,
    cfg: &Config,
    diag: &dyn Diagnostics,
    raw: &str,
) -> Option<String> {
    if entry.is_cyclic {
        if cfg.verbose {
            diag.warn(&format!("macro '{}' skipped: cyclic self-reference", entry.name));
        }
        return None;
    }
    if let Some(src) = source {
        graph.add_edge(src, i);
        if graph.has_cycle_reachable_from(i) {
            if cfg.verbose {
                diag.warn(&format!("macro '{}' skipped: expansion cycle detected", entry.name));
            }
            return None;
        }
    }
    if *depth >= cfg.max_recursion {
        if cfg.verbose {
            diag.warn("macro expansion recursion limit reached");
        }
        return None;
    }
    *depth += 1;
    let result = expand_pass(raw, macros, graph, Some(i), depth, cfg, diag);
    *depth -= 1;
    Some(result)
}

/// Returns `(args, index_just_after_closing_paren)` if the text at `after`
/// (which must be whitespace then `(`) forms a complete, balanced call.
fn try_collect_call(
    chars: &[char],
    after: usize,
    diag: &dyn Diagnostics,
    verbose: bool,
) -> Option<(Vec<String>, usize)> {
    let mut j = after;
    while matches!(chars.get(j), Some(c) if c.is_whitespace()) {
        j += 1;
    }
    if chars.get(j) != Some(&'(') {
        return None;
    }
    let start = j + 1;
    let mut depth = 1i32;
    let mut quote: Option<char> = None;
    let mut args = Vec::new();
    let mut arg_start = start;
    let mut k = start;
    while k < chars.len() {
        let c = chars[k];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            k += 1;
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let arg: String = chars[arg_start..k].iter().collect();
                    push_arg_if_any(&mut args, arg);
                    return Some((args, k + 1));
                }
            }
            ',' if depth == 1 => {
                let arg: String = chars[arg_start..k].iter().collect();
                args.push(arg.trim().to_string());
                arg_start = k + 1;
            }
            _ => {}
        }
        k += 1;
    }
    if verbose {
        diag.warn("unbalanced '(' in macro call");
    }
    None
}

fn push_arg_if_any(args: &mut Vec<String>, arg: String) {
    let trimmed = arg.trim().to_string();
    if !(args.is_empty() && trimmed.is_empty()) {
        args.push(trimmed);
    }
}

fn build_function_replacement(
    entry: &crate::macros::MacroEntry,
    args: &[String],
    diag: &dyn Diagnostics,
    verbose: bool,
) -> String {
    let n_formal = entry.params.len();
    let n_actual = args.len();

    if entry.variadic {
        if n_actual < n_formal {
            if verbose {
                diag.warn(&format!(
                    "macro '{}' called with too few arguments ({} < {})",
                    entry.name, n_actual, n_formal
                ));
            }
            return format!("{}({})", entry.name, args.join(", "));
        }
    } else if n_actual != n_formal {
        if verbose {
            diag.warn(&format!(
                "macro '{}' expects {} argument(s), got {}",
                entry.name, n_formal, n_actual
            ));
        }
        return format!("{}({})", entry.name, args.join(", "));
    }

    let va_args = if entry.variadic {
        args[n_formal.min(n_actual)..].join(", ")
    } else {
        String::new()
    };

    let mut body = substitute_parameters(&entry.value, &entry.params, args);
    body = paste_tokens(&body);
    if entry.variadic {
        body = substitute_variadic(&body, &va_args);
    }
    collapse_substitution_whitespace(&body)
}

/// The spec's non-goals exempt the implementation from preserving original
/// whitespace exactly; parameter/variadic substitution can leave behind
/// double spaces or a stray space before `)`/`,` when an argument or
/// `__VA_OPT__` group was empty. This tidies that up without touching
/// anything inside quoted string literals.
fn collapse_substitution_whitespace(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut quote: Option<char> = None;
    let mut last_was_space = false;
    for c in body.chars() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            last_was_space = false;
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
                last_was_space = false;
            }
            ' ' => {
                if !last_was_space && out.chars().last() != Some('(') {
                    out.push(c);
                }
                last_was_space = true;
            }
            ')' | ',' => {
                if last_was_space {
                    out.pop();
                }
                out.push(c);
                last_was_space = false;
            }
            '(' => {
                out.push(c);
                last_was_space = false;
            }
            _ => {
                out.push(c);
                last_was_space = false;
            }
        }
    }
    out
}

/// Step 1 of replacement construction: substitutes each formal parameter at
/// its boundary-matched occurrences, stringifying when preceded by a single
/// `#` (not `##`).
fn substitute_parameters(body: &str, params: &[String], args: &[String]) -> String {
    let mut result = body.to_string();
    for (j, param) in params.iter().enumerate() {
        let Some(value) = args.get(j) else { continue };
        result = substitute_one_parameter(&result, param, value);
    }
    result
}

fn substitute_one_parameter(body: &str, param: &str, value: &str) -> String {
    let chars: Vec<char> = body.chars().collect();
    let pchars: Vec<char> = param.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut i = 0usize;

    while i < chars.len() {
        if i + pchars.len() <= chars.len() && chars[i..i + pchars.len()] == pchars[..] {
            let prev = if i == 0 { None } else { Some(chars[i - 1]) };
            let next = chars.get(i + pchars.len()).copied();
            let boundary_ok = is_boundary_ext(prev) && is_boundary_ext(next);
            if boundary_ok {
                let stringify = prev == Some('#')
                    && !(i >= 2 && chars[i - 2] == '#');
                if stringify {
                    // Drop the single `#` already pushed to `out`.
                    out.pop();
                    out.push_str(&stringify_arg(value));
                } else {
                    out.push_str(value);
                }
                i += pchars.len();
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn is_boundary_ext(c: Option<char>) -> bool {
    match c {
        None => true,
        Some('#') => true,
        Some(c) => BOUNDARY_CHARS.contains(c),
    }
}

fn stringify_arg(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Step 2: repeatedly collapses `left ## right` into a single pasted token,
/// preserving whitespace outside the immediate token boundary.
fn paste_tokens(body: &str) -> String {
    let mut text = body.to_string();
    while let Some(pos) = text.find("##") {
        let before = &text[..pos];
        let after = &text[pos + 2..];

        let left_trim_end = before.trim_end();
        let left_ws = &before[left_trim_end.len()..];
        let left_token_start = token_run_start(left_trim_end);
        let prefix = &left_trim_end[..left_token_start];
        let left_token = &left_trim_end[left_token_start..];

        let after_trim_start = after.trim_start();
        let right_ws = &after[..after.len() - after_trim_start.len()];
        let right_token_end = token_run_end(after_trim_start);
        let right_token = &after_trim_start[..right_token_end];
        let suffix = &after_trim_start[right_token_end..];

        text = format!("{prefix}{left_ws}{left_token}{right_token}{right_ws}{suffix}");
    }
    text
}

fn token_run_start(s: &str) -> usize {
    let chars: Vec<char> = s.chars().collect();
    let mut i = chars.len();
    while i > 0 && !chars[i - 1].is_whitespace() {
        i -= 1;
    }
    char_index_to_byte(s, i)
}

fn token_run_end(s: &str) -> usize {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() && !chars[i].is_whitespace() {
        i += 1;
    }
    char_index_to_byte(s, i)
}

fn char_index_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(b, _)| b)
}

/// Step 3: substitutes `__VA_ARGS__` and resolves `__VA_OPT__(x)`.
fn substitute_variadic(body: &str, va_args: &str) -> String {
    let mut text = resolve_va_opt(body, va_args);
    text = text.replace("__VA_ARGS__", va_args);
    text
}

fn resolve_va_opt(body: &str, va_args: &str) -> String {
    let marker = "__VA_OPT__";
    let mut result = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(pos) = rest.find(marker) {
        result.push_str(&rest[..pos]);
        let after_marker = &rest[pos + marker.len()..];
        if let Some(stripped) = after_marker.strip_prefix('(') {
            if let Some((inner, consumed)) = take_balanced_parens(stripped) {
                if !va_args.is_empty() {
                    result.push_str(inner);
                }
                rest = &after_marker[consumed + 2..];
                continue;
            }
        }
        // Malformed `__VA_OPT__` with no following group: leave it literal.
        result.push_str(marker);
        rest = after_marker;
    }
    result.push_str(rest);
    result
}

/// Given text starting just past an opening `(`, returns `(inner, consumed)`
/// where `consumed` is the byte length of `inner` plus its closing `)`.
fn take_balanced_parens(s: &str) -> Option<(&str, usize)> {
    let mut depth = 1i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[..i], i));
                }
            }
            _ => {}
        }
    }
    None
}
