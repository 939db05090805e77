//! Process-scoped configuration, threaded explicitly through the [`crate::driver::Driver`]
//! rather than held as global mutable state (see SPEC_FULL.md §9, "Global state").

use std::path::PathBuf;

/// Upper bound on a single physical/logical line (spec requires an explicit cap).
pub const MAX_LINE_LEN: usize = 65536;

/// Upper bound on macro-table growth per chunk; the table itself is an
/// unbounded `Vec`, but callers that care about a fixed-chunk allocation
/// strategy can use this as the initial capacity hint.
pub const MACRO_TABLE_CHUNK: usize = 64;

/// Upper bound on formal parameters accepted by a function-like macro.
pub const MAX_PARAMS: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    /// `NAME` or `NAME=value` entries from `-D`, applied before the first line is read.
    pub predefined: Vec<String>,
    /// Names to `#undef` immediately after predefined macros are applied.
    pub undef: Vec<String>,
    /// Directories searched (in order) for `#include <...>` / unresolved `#include "..."`.
    pub include_dirs: Vec<PathBuf>,
    /// Master switch for macro expansion of non-directive lines.
    pub expand_macros: bool,
    /// Strip `/* ... */` comments from the output.
    pub exclude_comments: bool,
    /// Whether expression-evaluation identifier substitution treats the
    /// expansion as an implicit continuation (see §4.4).
    pub implicit_continuation: bool,
    /// Enables recognizing a trailing `\\` as a hard line break rather than
    /// a plain continuation marker.
    pub line_break: bool,
    /// Enables `__FILENAME__` and `__TIMESTAMP__` built-ins.
    pub extra_macros: bool,
    /// Extra recursion-depth guard beyond the per-expansion cycle graph
    /// (design knob called out in spec.md §9).
    pub max_recursion: usize,
    /// Emit diagnostics (non-fatal ones are otherwise silent).
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            predefined: Vec::new(),
            undef: Vec::new(),
            include_dirs: Vec::new(),
            expand_macros: true,
            exclude_comments: false,
            implicit_continuation: false,
            line_break: false,
            extra_macros: false,
            max_recursion: 256,
            verbose: false,
        }
    }
}
