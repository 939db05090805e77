//! Directive dispatch (component G): one handler per recognised keyword,
//! consulted by [`crate::driver::Driver`] for any line whose first non-blank
//! character is `#`.

use crate::conditional::ConditionalStack;
use crate::diag::Diagnostics;
use crate::error::{PpError, PpResult};
use crate::expr::parser::evaluate;
use crate::macros::{MacroEntry, MacroTable};
use crate::paths::IncludeKind;
use crate::text::{fold_upper, head_tail, starts_with_fold};
use crate::Config;

/// Outcome of dispatching one directive line, reported back to the driver.
pub enum DirectiveOutcome {
    /// Handled; nothing further to emit for this line.
    Handled,
    /// `#pragma` produced a line that belongs in the preprocessed output.
    Emit(String),
    /// `#warning` produced a message for standard output, not the
    /// preprocessed-output sink.
    Warn(String),
    /// `#include` requests the driver recurse into `path`, using the
    /// search order the quoting form (`"f"` vs `<f>`) calls for.
    Include(String, IncludeKind),
    /// Not a recognised directive keyword at all.
    Unrecognized,
}

const KEYWORDS: [&str; 13] = [
    "DEFINE", "UNDEF", "IF", "IFDEF", "IFNDEF", "ELIF", "ELIFDEF", "ELIFNDEF", "ELSE", "ENDIF",
    "INCLUDE", "WARNING", "ERROR", // keep count in sync with KEYWORDS.len()
];
const PRAGMA_KEYWORD: &str = "PRAGMA";

/// True if `line` (already trimmed of leading whitespace) opens with `#`
/// followed by a recognised keyword.
pub fn is_directive_line(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('#') else { return false };
    let (keyword, _) = head_tail(rest.trim_start());
    let keyword = fold_upper(keyword);
    KEYWORDS.contains(&keyword.as_str()) || keyword == PRAGMA_KEYWORD
}

/// Dispatches one directive line. `active` reflects the conditional stack's
/// state *before* this line is processed: state-mutating directives are
/// only honored when `active` is true, but `#if`/`#elif*`/`#else`/`#endif`
/// themselves always run so nesting tracks correctly inside a dead branch.
#[allow(clippy::too_many_arguments)]
pub fn dispatch(
    line: &str,
    macros: &mut MacroTable,
    cond: &mut ConditionalStack,
    cfg: &Config,
    diag: &dyn Diagnostics,
    active: bool,
) -> PpResult<DirectiveOutcome> {
    let Some(rest) = line.trim_start().strip_prefix('#') else {
        return Ok(DirectiveOutcome::Unrecognized);
    };
    let (keyword_raw, body) = head_tail(rest.trim_start());
    let keyword = fold_upper(keyword_raw);

    match keyword.as_str() {
        "IF" => {
            let result = evaluate(body, macros, cfg, diag);
            report_cond_error(cond.push_if(result.ok), diag);
            Ok(DirectiveOutcome::Handled)
        }
        "IFDEF" => {
            report_cond_error(cond.push_if(macros.contains(body.trim())), diag);
            Ok(DirectiveOutcome::Handled)
        }
        "IFNDEF" => {
            report_cond_error(cond.push_if(!macros.contains(body.trim())), diag);
            Ok(DirectiveOutcome::Handled)
        }
        "ELIF" => {
            let result = evaluate(body, macros, cfg, diag);
            report_cond_error(cond.elif(result.ok), diag);
            Ok(DirectiveOutcome::Handled)
        }
        "ELIFDEF" => {
            report_cond_error(cond.elif(macros.contains(body.trim())), diag);
            Ok(DirectiveOutcome::Handled)
        }
        "ELIFNDEF" => {
            report_cond_error(cond.elif(!macros.contains(body.trim())), diag);
            Ok(DirectiveOutcome::Handled)
        }
        "ELSE" => {
            report_cond_error(cond.else_branch(), diag);
            Ok(DirectiveOutcome::Handled)
        }
        "ENDIF" => {
            report_cond_error(cond.endif(), diag);
            Ok(DirectiveOutcome::Handled)
        }
        "DEFINE" if active => {
            handle_define(body, macros, diag, cfg.verbose);
            Ok(DirectiveOutcome::Handled)
        }
        "UNDEF" if active => {
            macros.undef(body.trim());
            Ok(DirectiveOutcome::Handled)
        }
        "INCLUDE" if active => {
            let (target, kind) = parse_include_target(body);
            Ok(DirectiveOutcome::Include(target, kind))
        }
        "WARNING" if active => Ok(DirectiveOutcome::Warn(body.trim().to_string())),
        "ERROR" if active => Err(PpError::Fatal(body.trim().to_string())),
        "PRAGMA" if active => Ok(DirectiveOutcome::Emit(line.trim_start().to_string())),
        "DEFINE" | "UNDEF" | "INCLUDE" | "WARNING" | "ERROR" | "PRAGMA" => {
            // Inside an inactive branch: already dropped by the caller's
            // active check in the line assembler; reaching here means the
            // state-mutating directive is simply skipped.
            Ok(DirectiveOutcome::Handled)
        }
        _ => Ok(DirectiveOutcome::Unrecognized),
    }
}

fn report_cond_error(result: Result<(), crate::conditional::ConditionalError>, diag: &dyn Diagnostics) {
    if let Err(e) = result {
        diag.warn(&e.to_string());
    }
}

fn parse_include_target(body: &str) -> (String, IncludeKind) {
    let body = body.trim();
    if let Some(rest) = body.strip_prefix('"') {
        (rest.split('"').next().unwrap_or("").to_string(), IncludeKind::Quoted)
    } else if let Some(rest) = body.strip_prefix('<') {
        (rest.split('>').next().unwrap_or("").to_string(), IncludeKind::Angle)
    } else {
        (body.to_string(), IncludeKind::Quoted)
    }
}

/// `#define NAME value`, `#define NAME` (empty value), or
/// `#define NAME(p1, p2, ...) value` (function-like, optionally variadic).
fn handle_define(body: &str, macros: &mut MacroTable, diag: &dyn Diagnostics, verbose: bool) {
    let body = body.trim_start();
    let name_end = body
        .find(|c: char| c == '(' || c.is_whitespace())
        .unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() {
        return;
    }
    let rest = &body[name_end..];

    if let Some(after_paren) = rest.strip_prefix('(') {
        if let Some(close) = after_paren.find(')') {
            let param_list = &after_paren[..close];
            let value = after_paren[close + 1..].trim_start().to_string();
            let (mut params, variadic) = parse_params(param_list);
            if params.len() > crate::config::MAX_PARAMS {
                if verbose {
                    diag.warn(&format!("macro '{name}' truncated to {} parameters", crate::config::MAX_PARAMS));
                }
                params.truncate(crate::config::MAX_PARAMS);
            }
            macros.add(MacroEntry::function_like(name, value, params, variadic));
            return;
        }
    }

    let value = rest.trim_start().to_string();
    macros.add_object(name, value);
}

fn parse_params(param_list: &str) -> (Vec<String>, bool) {
    let mut params = Vec::new();
    let mut variadic = false;
    for part in param_list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part == "..." {
            variadic = true;
        } else {
            params.push(part.to_string());
        }
    }
    (params, variadic)
}

/// True if `haystack` begins (after whitespace) with the directive
/// introducer `#` followed by `keyword`, used by callers that need to peek
/// without fully dispatching.
pub fn starts_with_directive(line: &str, keyword: &str) -> bool {
    match line.trim_start().strip_prefix('#') {
        Some(rest) => starts_with_fold(rest.trim_start(), keyword),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::NullDiagnostics;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn define_object_like() {
        let mut macros = MacroTable::new();
        let mut cond = ConditionalStack::new();
        dispatch("#define FOO 42", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert_eq!(macros.lookup_entry("FOO").unwrap().value, "42");
    }

    #[test]
    fn define_function_like_variadic() {
        let mut macros = MacroTable::new();
        let mut cond = ConditionalStack::new();
        dispatch(
            "#define DBG(fmt, ...) f(fmt, __VA_ARGS__)",
            &mut macros,
            &mut cond,
            &cfg(),
            &NullDiagnostics,
            true,
        )
        .unwrap();
        let entry = macros.lookup_entry("DBG").unwrap();
        assert_eq!(entry.params, vec!["fmt".to_string()]);
        assert!(entry.variadic);
    }

    #[test]
    fn undef_removes_macro() {
        let mut macros = MacroTable::new();
        macros.add_object("FOO", "1");
        let mut cond = ConditionalStack::new();
        dispatch("#undef FOO", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert!(!macros.contains("FOO"));
    }

    #[test]
    fn error_directive_is_fatal() {
        let mut macros = MacroTable::new();
        let mut cond = ConditionalStack::new();
        let result = dispatch("#error boom", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true);
        assert!(matches!(result, Err(PpError::Fatal(ref m)) if m == "boom"));
    }

    #[test]
    fn include_target_strips_quotes_and_angles() {
        assert_eq!(parse_include_target(r#""foo.inc""#), ("foo.inc".to_string(), IncludeKind::Quoted));
        assert_eq!(parse_include_target("<foo.inc>"), ("foo.inc".to_string(), IncludeKind::Angle));
    }

    #[test]
    fn if_elif_else_drive_conditional_stack() {
        let mut macros = MacroTable::new();
        let mut cond = ConditionalStack::new();
        dispatch("#if 0", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert!(!cond.is_active());
        dispatch("#elif 1", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert!(cond.is_active());
        dispatch("#else", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert!(!cond.is_active());
        dispatch("#endif", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert!(cond.is_active());
    }

    #[test]
    fn warning_is_kept_separate_from_pragma_emit() {
        let mut macros = MacroTable::new();
        let mut cond = ConditionalStack::new();
        let outcome =
            dispatch("#warning heads up", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert!(matches!(outcome, DirectiveOutcome::Warn(ref m) if m == "heads up"));

        let outcome =
            dispatch("#pragma once", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert!(matches!(outcome, DirectiveOutcome::Emit(ref m) if m == "#pragma once"));
    }

    #[test]
    fn include_dispatch_reports_the_delimiter_kind() {
        let mut macros = MacroTable::new();
        let mut cond = ConditionalStack::new();
        let outcome =
            dispatch("#include <foo.inc>", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert!(matches!(outcome, DirectiveOutcome::Include(ref t, IncludeKind::Angle) if t == "foo.inc"));

        let outcome =
            dispatch("#include \"foo.inc\"", &mut macros, &mut cond, &cfg(), &NullDiagnostics, true).unwrap();
        assert!(matches!(outcome, DirectiveOutcome::Include(ref t, IncludeKind::Quoted) if t == "foo.inc"));
    }

    #[test]
    fn is_directive_line_recognizes_keywords_case_insensitively() {
        assert!(is_directive_line("#Define FOO 1"));
        assert!(is_directive_line("#PRAGMA once"));
        assert!(!is_directive_line("not a directive"));
    }
}
