//! The line assembler / top-level driver (component I): reads physical
//! lines, joins continuations, dispatches directives, expands macros, and
//! recurses into `#include`d files.

use std::io::{BufRead, BufReader, Read, Write};

use crate::clock::Clock;
use crate::conditional::ConditionalStack;
use crate::config::Config;
use crate::diag::Diagnostics;
use crate::directive::{dispatch, is_directive_line, DirectiveOutcome};
use crate::error::{PpError, PpResult};
use crate::expand::expand_all;
use crate::macros::MacroTable;
use crate::paths::{resolve_include, IncludeKind, PathResolver};
use crate::text::concat;

/// Owns the macro table and conditional stack for one top-level run; both
/// are threaded by mutable reference into `#include` recursion so a nested
/// file sees (and can mutate) exactly the same state as its includer.
pub struct Driver<'a> {
    macros: MacroTable,
    cond: ConditionalStack,
    cfg: Config,
    diag: &'a dyn Diagnostics,
    clock: &'a dyn Clock,
    paths: &'a dyn PathResolver,
}

/// Persistent state that must survive across physical lines within one
/// logical-output accumulation: the "is a block comment open" flag and the
/// Fortran `&`-stitch accumulator.
#[derive(Default)]
struct AssemblyState {
    in_block_comment: bool,
    pending: Option<String>,
    pending_is_comment: bool,
}

impl<'a> Driver<'a> {
    pub fn new(cfg: Config, diag: &'a dyn Diagnostics, clock: &'a dyn Clock, paths: &'a dyn PathResolver) -> Self {
        let mut macros = MacroTable::new();
        seed_builtins(&mut macros, paths);
        for entry in &cfg.predefined {
            let (name, value) = split_define_arg(entry);
            macros.add_object(name, value);
        }
        for name in &cfg.undef {
            macros.undef(name);
        }
        Self { macros, cond: ConditionalStack::new(), cfg, diag, clock, paths }
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Preprocesses `input` (named `file_path`, for `__FILE__`/`__LINE__`
    /// and relative `#include` resolution), writing the result to `out`.
    /// `#warning` messages go to `warn_out` instead: §4.6 calls for them on
    /// standard output specifically, not wherever `out` happens to be
    /// pointed (e.g. an `-o` file).
    pub fn run(
        &mut self,
        input: impl Read,
        file_path: &str,
        out: &mut impl Write,
        warn_out: &mut impl Write,
    ) -> PpResult<()> {
        let reader = BufReader::new(input);
        let mut state = AssemblyState::default();
        let mut line_number = 0usize;
        let mut raw_buffer = String::new();
        let mut c_continuing = false;

        for line in reader.lines() {
            let raw = line?;
            line_number += 1;

            if c_continuing {
                raw_buffer.push_str(raw.trim_start());
            } else {
                raw_buffer = raw;
            }

            if raw_buffer.len() > crate::config::MAX_LINE_LEN {
                self.diag.warn(&format!("line {line_number} exceeds the maximum line length, truncating"));
                raw_buffer.truncate(crate::config::MAX_LINE_LEN);
            }

            if let Some(body) = raw_buffer.strip_suffix("\\\\") {
                if self.cfg.line_break {
                    raw_buffer = format!("{body}\n");
                } else {
                    raw_buffer.truncate(raw_buffer.len() - 2);
                }
                c_continuing = true;
                continue;
            }
            if let Some(body) = raw_buffer.strip_suffix('\\') {
                raw_buffer = body.to_string();
                c_continuing = true;
                continue;
            }
            c_continuing = false;

            let complete = std::mem::take(&mut raw_buffer);
            self.process_logical_line(&complete, file_path, line_number, &mut state, out, warn_out)?;
        }

        self.flush_pending(&mut state, file_path, line_number, out)?;

        if self.cond.depth() != 0 {
            self.diag.warn("unterminated conditional at end of input");
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn process_logical_line(
        &mut self,
        raw: &str,
        file_path: &str,
        line_number: usize,
        state: &mut AssemblyState,
        out: &mut impl Write,
        warn_out: &mut impl Write,
    ) -> PpResult<()> {
        let stripped = if self.cfg.exclude_comments {
            let Some(stripped) = self.strip_block_comments(raw, state) else {
                return Ok(());
            };
            stripped
        } else {
            raw.to_string()
        };

        let trimmed = stripped.trim_start();
        let active = self.cond.is_active();

        if is_directive_line(trimmed) {
            match dispatch(trimmed, &mut self.macros, &mut self.cond, &self.cfg, self.diag, active)? {
                DirectiveOutcome::Handled | DirectiveOutcome::Unrecognized => Ok(()),
                DirectiveOutcome::Emit(text) => {
                    self.flush_pending(state, file_path, line_number, out)?;
                    writeln!(out, "{text}")?;
                    Ok(())
                }
                DirectiveOutcome::Warn(text) => {
                    self.flush_pending(state, file_path, line_number, out)?;
                    writeln!(warn_out, "{text}")?;
                    Ok(())
                }
                DirectiveOutcome::Include(target, kind) => {
                    self.flush_pending(state, file_path, line_number, out)?;
                    self.handle_include(&target, kind, file_path, out, warn_out)
                }
            }
        } else if active {
            self.accumulate(&stripped, file_path, line_number, state, out)
        } else {
            Ok(())
        }
    }

    fn strip_block_comments(&self, raw: &str, state: &mut AssemblyState) -> Option<String> {
        if state.in_block_comment {
            if let Some(end) = raw.find("*/") {
                state.in_block_comment = false;
                return self.strip_block_comments_inner(&raw[end + 2..], state);
            }
            return None;
        }
        self.strip_block_comments_inner(raw, state)
    }

    fn strip_block_comments_inner(&self, raw: &str, state: &mut AssemblyState) -> Option<String> {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        loop {
            match rest.find("/*") {
                None => {
                    out.push_str(rest);
                    break;
                }
                Some(start) => {
                    out.push_str(&rest[..start]);
                    match rest[start..].find("*/") {
                        Some(end) => rest = &rest[start + end + 2..],
                        None => {
                            state.in_block_comment = true;
                            return Some(out);
                        }
                    }
                }
            }
        }
        Some(out)
    }

    fn accumulate(
        &mut self,
        stripped_line: &str,
        file_path: &str,
        line_number: usize,
        state: &mut AssemblyState,
        out: &mut impl Write,
    ) -> PpResult<()> {
        let (expanded, stitch) = expand_all(
            stripped_line,
            &self.macros,
            &self.cfg,
            self.diag,
            self.clock,
            self.paths,
            file_path,
            line_number,
            self.cfg.extra_macros,
        );
        let is_comment = expanded.trim_start().starts_with('!');

        if let Some(pending) = state.pending.take() {
            if is_comment != state.pending_is_comment {
                // A comment line never joins a non-comment continuation and
                // vice versa: flush what we had, then treat `expanded` as a
                // fresh unit.
                writeln!(out, "{pending}")?;
            } else {
                let joined = concat(&pending, &expanded);
                if stitch {
                    state.pending = Some(joined);
                    state.pending_is_comment = is_comment;
                    return Ok(());
                }
                let (reexpanded, _) =
                    expand_all(&joined, &self.macros, &self.cfg, self.diag, self.clock, self.paths, file_path, line_number, self.cfg.extra_macros);
                writeln!(out, "{reexpanded}")?;
                return Ok(());
            }
        }

        if stitch {
            state.pending = Some(expanded);
            state.pending_is_comment = is_comment;
        } else {
            writeln!(out, "{expanded}")?;
        }
        Ok(())
    }

    fn flush_pending(
        &mut self,
        state: &mut AssemblyState,
        _file_path: &str,
        _line_number: usize,
        out: &mut impl Write,
    ) -> PpResult<()> {
        if let Some(pending) = state.pending.take() {
            writeln!(out, "{pending}")?;
        }
        Ok(())
    }

    fn handle_include(
        &mut self,
        target: &str,
        kind: IncludeKind,
        file_path: &str,
        out: &mut impl Write,
        warn_out: &mut impl Write,
    ) -> PpResult<()> {
        let current_dir = self.paths.dirname(file_path);
        let include_dirs: Vec<String> =
            self.cfg.include_dirs.iter().map(|p| p.to_string_lossy().to_string()).collect();

        match resolve_include(self.paths, target, kind, &current_dir, &include_dirs) {
            Some(resolved) => match std::fs::File::open(&resolved) {
                Ok(file) => self.run(file, &resolved, out, warn_out),
                Err(e) => {
                    self.diag.warn(&format!("could not open include '{resolved}': {e}"));
                    Ok(())
                }
            },
            None => {
                self.diag.warn(&format!("include target '{target}' could not be resolved"));
                Ok(())
            }
        }
    }
}

fn split_define_arg(entry: &str) -> (&str, &str) {
    match entry.split_once('=') {
        Some((name, value)) => (name, value),
        None => (entry, "1"),
    }
}

/// Seeds the two built-ins the core itself is responsible for; platform
/// macros (`_WIN32`/`_WIN64`) are an ambient concern supplied by the caller
/// through `Config::predefined` (see `fpx::platform`).
fn seed_builtins(macros: &mut MacroTable, paths: &dyn PathResolver) {
    macros.add_object("__STDF__", "1");
    macros.add_object("__FPX__", "1");
    let _ = paths;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::diag::NullDiagnostics;
    use std::collections::HashSet;

    struct FakeResolver {
        existing: HashSet<String>,
    }
    impl PathResolver for FakeResolver {
        fn dirname(&self, path: &str) -> String {
            match path.rfind('/') {
                Some(i) => path[..i].to_string(),
                None => String::new(),
            }
        }
        fn basename(&self, path: &str, keep_ext: bool) -> String {
            let base = path.rsplit('/').next().unwrap_or(path);
            if keep_ext {
                base.to_string()
            } else {
                match base.rfind('.') {
                    Some(i) => base[..i].to_string(),
                    None => base.to_string(),
                }
            }
        }
        fn join(&self, a: &str, b: &str) -> String {
            if a.is_empty() {
                b.to_string()
            } else {
                format!("{}/{}", a.trim_end_matches('/'), b)
            }
        }
        fn is_rooted(&self, path: &str) -> bool {
            path.starts_with('/')
        }
        fn cwd(&self) -> String {
            "/work".to_string()
        }
        fn exists(&self, path: &str) -> bool {
            self.existing.contains(path)
        }
    }

    fn run_text(input: &str) -> String {
        let cfg = Config::default();
        let diag = NullDiagnostics;
        let clock = FixedClock(crate::clock::DateRecord {
            year: 2026,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            weekday: 0,
        });
        let paths = FakeResolver { existing: HashSet::new() };
        let mut driver = Driver::new(cfg, &diag, &clock, &paths);
        let mut out = Vec::new();
        let mut warn_out = Vec::new();
        driver.run(input.as_bytes(), "main.f", &mut out, &mut warn_out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn s1_object_like_define() {
        assert_eq!(run_text("#define FOO 42\nFOO\n"), "42\n");
    }

    #[test]
    fn s2_function_like_define() {
        assert_eq!(run_text("#define ADD(a,b) (a+b)\nADD(1,2)\n"), "(1+2)\n");
    }

    #[test]
    fn s3_conditional_with_defined() {
        assert_eq!(
            run_text("#if defined(X) && 0\nhidden\n#else\nshown\n#endif\n"),
            "shown\n"
        );
    }

    #[test]
    fn s4_mutual_cycle_leaves_token() {
        assert_eq!(run_text("#define A B\n#define B A\nA\n"), "A\n");
    }

    #[test]
    fn s5_elifdef_chain() {
        assert_eq!(
            run_text("#ifdef FEATURE_A\nprint A\n#elifdef FEATURE_B\nprint B\n#else\nnone\n#endif\n"),
            "none\n"
        );
    }

    #[test]
    fn s6_token_pasting() {
        assert_eq!(run_text("#define GLUE(a,b) a##b\nGLUE(var_,42)\n"), "var_42\n");
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        assert_eq!(run_text("hello world\n"), "hello world\n");
    }

    #[test]
    fn error_directive_is_fatal() {
        let result = run_text_result("#error boom\n");
        assert!(matches!(result, Err(PpError::Fatal(ref m)) if m == "boom"));
    }

    #[test]
    fn warning_goes_to_its_own_stream_not_the_output_sink() {
        let cfg = Config::default();
        let diag = NullDiagnostics;
        let clock = FixedClock(crate::clock::DateRecord {
            year: 2026,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            weekday: 0,
        });
        let paths = FakeResolver { existing: HashSet::new() };
        let mut driver = Driver::new(cfg, &diag, &clock, &paths);
        let mut out = Vec::new();
        let mut warn_out = Vec::new();
        driver
            .run("#warning heads up\nkept\n".as_bytes(), "main.f", &mut out, &mut warn_out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "kept\n");
        assert_eq!(String::from_utf8(warn_out).unwrap(), "heads up\n");
    }

    #[test]
    fn pragma_still_passes_through_the_output_sink() {
        assert_eq!(run_text("#pragma once\nkept\n"), "#pragma once\nkept\n");
    }

    fn run_text_result(input: &str) -> PpResult<String> {
        let cfg = Config::default();
        let diag = NullDiagnostics;
        let clock = FixedClock(crate::clock::DateRecord {
            year: 2026,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            weekday: 0,
        });
        let paths = FakeResolver { existing: HashSet::new() };
        let mut driver = Driver::new(cfg, &diag, &clock, &paths);
        let mut out = Vec::new();
        let mut warn_out = Vec::new();
        driver.run(input.as_bytes(), "main.f", &mut out, &mut warn_out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn fortran_continuation_is_stitched_before_reexpansion() {
        assert_eq!(
            run_text("#define FOO 42\ncall sub(FOO, &\nbar)\n"),
            "call sub(42, bar)\n"
        );
    }

    fn run_text_with_cfg(cfg: Config, input: &str) -> String {
        let diag = NullDiagnostics;
        let clock = FixedClock(crate::clock::DateRecord {
            year: 2026,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            weekday: 0,
        });
        let paths = FakeResolver { existing: HashSet::new() };
        let mut driver = Driver::new(cfg, &diag, &clock, &paths);
        let mut out = Vec::new();
        let mut warn_out = Vec::new();
        driver.run(input.as_bytes(), "main.f", &mut out, &mut warn_out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn expand_macros_false_leaves_non_directive_lines_unexpanded() {
        let cfg = Config { expand_macros: false, ..Config::default() };
        assert_eq!(
            run_text_with_cfg(cfg, "#define FOO 42\nFOO\n"),
            "FOO\n"
        );
    }

    #[test]
    fn expand_macros_false_still_processes_directives() {
        let cfg = Config { expand_macros: false, ..Config::default() };
        assert_eq!(
            run_text_with_cfg(cfg, "#if 0\nhidden\n#else\nshown\n#endif\n"),
            "shown\n"
        );
    }
}
